//! HTTP surface, mounted under `/api/v1`.

pub mod cart;
pub mod dto;
pub mod extract;
pub mod orders;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::identity::IdentityProvider;
use crate::services::{CartEngine, OrderEngine};

const BODY_LIMIT_BYTES: usize = 50 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<CartEngine>,
    pub orders: Arc<OrderEngine>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/cart", get(cart::get_cart).post(cart::add_line).put(cart::update_line).delete(cart::remove_line))
        .route("/orders", get(orders::list_orders).post(orders::place_order))
        .route("/orders/seller", get(orders::list_seller_orders))
        .route("/orders/seller/deliver/:id", post(orders::mark_delivered))
        .route("/orders/seller/:id", get(orders::get_seller_order).post(orders::add_update_message).delete(orders::seller_cancel_order))
        .route("/orders/pay/:id", post(orders::pay_order))
        .route("/orders/:id", get(orders::get_order).delete(orders::cancel_order));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") }))
}
