use axum::extract::State;
use axum::response::IntoResponse;

use super::dto::{AddLineRequest, RemoveLineRequest, UpdateLineRequest};
use super::extract::ValidatedJson;
use super::response::ApiResponse;
use super::AppState;
use crate::error::Result;
use crate::identity::Caller;

pub async fn get_cart(State(state): State<AppState>, caller: Caller) -> Result<impl IntoResponse> {
    let cart = state.carts.get_cart(caller.id).await?;
    let message = if cart.is_empty() { "Cart is empty" } else { "Cart fetched" };
    Ok(ApiResponse::ok(message, cart))
}

pub async fn add_line(State(state): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<AddLineRequest>) -> Result<impl IntoResponse> {
    let cart = state.carts.add_line(caller.id, body.product, body.quantity).await?;
    Ok(ApiResponse::created("Added to cart", cart))
}

pub async fn update_line(State(state): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<UpdateLineRequest>) -> Result<impl IntoResponse> {
    let cart = state.carts.update_line(caller.id, body.product, body.quantity).await?;
    Ok(ApiResponse::ok("Cart updated", cart))
}

pub async fn remove_line(State(state): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<RemoveLineRequest>) -> Result<impl IntoResponse> {
    let cart = state.carts.remove_line(caller.id, body.product).await?;
    Ok(ApiResponse::ok("Removed from cart", cart))
}
