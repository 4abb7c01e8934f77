use std::future::Future;

use axum::extract::State;
use axum::response::IntoResponse;

use super::dto::{PayOrderRequest, PlaceOrderRequest, SellerMessageRequest};
use super::extract::{IdPath, Seller, ValidatedJson};
use super::response::ApiResponse;
use super::AppState;
use crate::domain::aggregates::Actor;
use crate::domain::value_objects::PaymentMethod;
use crate::error::{Error, Result};
use crate::identity::Caller;
use crate::services::OrderView;

/// Runs a stock-moving operation on its own task so a dropped connection cannot
/// abandon it between steps.
async fn detached<T, F>(operation: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation).await.map_err(|e| Error::Internal(format!("order task failed: {e}")))?
}

pub async fn place_order(State(state): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<PlaceOrderRequest>) -> Result<impl IntoResponse> {
    let payment_method: PaymentMethod = body.payment_method.parse()?;
    let engine = state.orders.clone();
    let orders = detached(async move { engine.place_order(caller.id, body.shipping_address, payment_method).await }).await?;
    Ok(ApiResponse::created("Orders created", orders.iter().map(OrderView::from).collect::<Vec<_>>()))
}

pub async fn list_orders(State(state): State<AppState>, caller: Caller) -> Result<impl IntoResponse> {
    let orders = state.orders.list_for_customer(caller.id).await?;
    Ok(ApiResponse::ok("Orders fetched", orders.iter().map(OrderView::from).collect::<Vec<_>>()))
}

pub async fn get_order(State(state): State<AppState>, caller: Caller, IdPath(id): IdPath) -> Result<impl IntoResponse> {
    let order = state.orders.get_order(Actor::Customer(caller.id), id).await?;
    Ok(ApiResponse::ok("Order fetched", OrderView::from(order)))
}

pub async fn cancel_order(State(state): State<AppState>, caller: Caller, IdPath(id): IdPath) -> Result<impl IntoResponse> {
    let engine = state.orders.clone();
    let order = detached(async move { engine.cancel_order(Actor::Customer(caller.id), id, None).await }).await?;
    Ok(ApiResponse::ok("Order cancelled", OrderView::from(order)))
}

pub async fn pay_order(State(state): State<AppState>, caller: Caller, IdPath(id): IdPath, ValidatedJson(body): ValidatedJson<PayOrderRequest>) -> Result<impl IntoResponse> {
    let order = state.orders.pay_order(caller.id, id, body.into()).await?;
    Ok(ApiResponse::ok("Order paid", OrderView::from(order)))
}

pub async fn list_seller_orders(State(state): State<AppState>, Seller(seller): Seller) -> Result<impl IntoResponse> {
    let orders = state.orders.list_for_seller(seller.id).await?;
    Ok(ApiResponse::ok("Orders fetched", orders.iter().map(OrderView::from).collect::<Vec<_>>()))
}

pub async fn get_seller_order(State(state): State<AppState>, Seller(seller): Seller, IdPath(id): IdPath) -> Result<impl IntoResponse> {
    let order = state.orders.get_order(Actor::Seller(seller.id), id).await?;
    Ok(ApiResponse::ok("Order fetched", OrderView::from(order)))
}

pub async fn add_update_message(
    State(state): State<AppState>,
    Seller(seller): Seller,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<SellerMessageRequest>,
) -> Result<impl IntoResponse> {
    let order = state.orders.add_update_message(seller.id, id, &body.message).await?;
    Ok(ApiResponse::ok("Message added successfully", OrderView::from(order)))
}

pub async fn seller_cancel_order(
    State(state): State<AppState>,
    Seller(seller): Seller,
    IdPath(id): IdPath,
    ValidatedJson(body): ValidatedJson<SellerMessageRequest>,
) -> Result<impl IntoResponse> {
    let engine = state.orders.clone();
    let order = detached(async move { engine.cancel_order(Actor::Seller(seller.id), id, Some(body.message)).await }).await?;
    Ok(ApiResponse::ok("Order cancelled by seller", OrderView::from(order)))
}

pub async fn mark_delivered(State(state): State<AppState>, Seller(seller): Seller, IdPath(id): IdPath) -> Result<impl IntoResponse> {
    let order = state.orders.mark_delivered(seller.id, id).await?;
    Ok(ApiResponse::ok("Order delivered", OrderView::from(order)))
}
