use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use marketplace_orders::api::{router, AppState};
use marketplace_orders::domain::aggregates::Product;
use marketplace_orders::domain::pricing::PricingPolicy;
use marketplace_orders::identity::{Caller, JwtIdentityProvider, Role};
use marketplace_orders::publisher::LogPublisher;
use marketplace_orders::repository::InMemoryStore;
use marketplace_orders::services::{CartEngine, OrderEngine, SplitPolicy};

const SECRET: &str = "integration-test-secret-integration-test";

struct TestApp {
    app: Router,
    store: InMemoryStore,
    jwt: JwtIdentityProvider,
}

impl TestApp {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let shared = Arc::new(store.clone());
        let jwt = JwtIdentityProvider::new(SECRET);
        let state = AppState {
            carts: Arc::new(CartEngine::new(shared.clone(), shared.clone(), PricingPolicy::default())),
            orders: Arc::new(OrderEngine::new(shared.clone(), shared.clone(), shared, Arc::new(LogPublisher), PricingPolicy::default(), SplitPolicy::PerSeller)),
            identity: Arc::new(jwt.clone()),
        };
        Self { app: router(state, Duration::from_secs(5)), store, jwt }
    }

    fn token(&self, id: Uuid, role: Role) -> String {
        self.jwt.issue_token(Caller { id, role }, chrono::Duration::minutes(10)).unwrap()
    }

    fn product(&self, price: i64, stock: u32, seller: Uuid) -> Product {
        let p = Product::new("Chair", Decimal::new(price, 0), stock, seller);
        self.store.upsert_product(p.clone()).unwrap();
        p
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())).unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = self.app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }
}

fn address() -> Value {
    json!({ "house": "12", "city": "Pune", "state": "MH", "country": "IN", "zipcode": "411001" })
}

#[tokio::test]
async fn health_needs_no_token() {
    let t = TestApp::new();
    let (status, body) = t.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn routes_require_a_valid_token() {
    let t = TestApp::new();
    let (status, body) = t.call(Method::GET, "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = t.call(Method::GET, "/api/v1/cart", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cookie_token_is_accepted() {
    let t = TestApp::new();
    let token = t.token(Uuid::new_v4(), Role::Customer);
    let req = Request::builder()
        .uri("/api/v1/cart")
        .header(header::COOKIE, format!("accessToken={token}"))
        .body(Body::empty())
        .unwrap();
    let res = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn checkout_flow_over_http() {
    let t = TestApp::new();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();
    let buyer = t.token(customer, Role::Customer);
    let seller_token = t.token(seller, Role::Seller);
    let p = t.product(600, 10, seller);

    let (status, body) = t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 1 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["totalPrice"].as_f64(), Some(708.0));

    let (status, body) = t.call(Method::POST, "/api/v1/orders", Some(&buyer), Some(json!({ "shippingAddress": address(), "paymentMethod": "COD" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["itemsPrice"].as_f64(), Some(600.0));
    assert_eq!(orders[0]["taxPrice"].as_f64(), Some(108.0));
    assert_eq!(orders[0]["shippingPrice"].as_f64(), Some(0.0));
    assert_eq!(orders[0]["totalPrice"].as_f64(), Some(708.0));
    assert_eq!(orders[0]["isPaid"], false);
    assert_eq!(orders[0]["isDelivered"], false);
    assert_eq!(orders[0]["isCancelled"], false);
    assert!(orders[0]["cancelMessage"].is_null());
    assert!(orders[0]["deliveredAt"].is_null());
    let id = orders[0]["id"].as_str().unwrap().to_string();
    assert_eq!(t.store.stock_of(p.id), Some(9));

    let (_, cart) = t.call(Method::GET, "/api/v1/cart", Some(&buyer), None).await;
    assert!(cart["data"]["items"].as_array().unwrap().is_empty());

    let (status, list) = t.call(Method::GET, "/api/v1/orders/seller", Some(&seller_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let (status, _) = t.call(Method::POST, &format!("/api/v1/orders/seller/{id}"), Some(&seller_token), Some(json!({ "message": "Packed" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t.call(Method::POST, &format!("/api/v1/orders/seller/deliver/{id}"), Some(&seller_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "delivered");
    assert_eq!(body["data"]["isDelivered"], true);
    assert!(body["data"]["deliveredAt"].is_string());
    assert_eq!(body["data"]["updates"][0]["message"], "Packed");

    let (status, body) = t.call(Method::DELETE, &format!("/api/v1/orders/{id}"), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
}

#[tokio::test]
async fn cancel_restores_stock_once() {
    let t = TestApp::new();
    let customer = Uuid::new_v4();
    let buyer = t.token(customer, Role::Customer);
    let p = t.product(40, 10, Uuid::new_v4());

    t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 3 }))).await;
    let (_, body) = t.call(Method::POST, "/api/v1/orders", Some(&buyer), Some(json!({ "shippingAddress": address(), "paymentMethod": "COD" }))).await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(t.store.stock_of(p.id), Some(7));

    let (status, body) = t.call(Method::DELETE, &format!("/api/v1/orders/{id}"), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["isCancelled"], true);
    assert_eq!(body["data"]["cancelledBy"], "customer");
    assert!(body["data"]["cancelMessage"].is_null());
    assert_eq!(t.store.stock_of(p.id), Some(10));

    let (status, _) = t.call(Method::DELETE, &format!("/api/v1/orders/{id}"), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(t.store.stock_of(p.id), Some(10));
}

#[tokio::test]
async fn seller_routes_check_role_and_ownership() {
    let t = TestApp::new();
    let seller = Uuid::new_v4();
    let customer = Uuid::new_v4();
    let buyer = t.token(customer, Role::Customer);
    let p = t.product(100, 5, seller);
    t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 1 }))).await;
    let (_, body) = t.call(Method::POST, "/api/v1/orders", Some(&buyer), Some(json!({ "shippingAddress": address(), "paymentMethod": "Card" }))).await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = t.call(Method::GET, "/api/v1/orders/seller", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let other_seller = t.token(Uuid::new_v4(), Role::Seller);
    let (status, body) = t.call(Method::GET, &format!("/api/v1/orders/seller/{id}"), Some(&other_seller), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "This order doesn't belong to you");

    let stranger = t.token(Uuid::new_v4(), Role::Customer);
    let (status, _) = t.call(Method::GET, &format!("/api/v1/orders/{id}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = t.token(seller, Role::Seller);
    let (status, _) = t.call(Method::DELETE, &format!("/api/v1/orders/seller/{id}"), Some(&owner), Some(json!({ "message": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = t.call(Method::DELETE, &format!("/api/v1/orders/seller/{id}"), Some(&owner), Some(json!({ "message": "Out of stock at warehouse" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCancelled"], true);
    assert_eq!(body["data"]["cancelledBy"], "seller");
    assert_eq!(body["data"]["cancelMessage"], "Out of stock at warehouse");
    assert_eq!(body["data"]["totalPrice"].as_f64(), Some(218.0));
    assert_eq!(t.store.stock_of(p.id), Some(5));
}

#[tokio::test]
async fn bad_input_is_a_validation_error() {
    let t = TestApp::new();
    let buyer = t.token(Uuid::new_v4(), Role::Customer);
    let p = t.product(100, 5, Uuid::new_v4());

    let (status, body) = t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], 400);

    let (status, _) = t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": "not-a-uuid", "quantity": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 2_147_483_648u64 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t.call(Method::POST, "/api/v1/orders", Some(&buyer), Some(json!({ "shippingAddress": address(), "paymentMethod": "COD" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty. Cannot create order");

    t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 1 }))).await;
    let (status, _) = t.call(Method::POST, "/api/v1/orders", Some(&buyer), Some(json!({ "shippingAddress": address(), "paymentMethod": "Bitcoin" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = t.call(Method::GET, "/api/v1/orders/not-a-uuid", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = t.call(Method::GET, &format!("/api/v1/orders/{}", Uuid::new_v4()), Some(&buyer), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(t.store.stock_of(p.id), Some(5));
}

#[tokio::test]
async fn out_of_stock_checkout_is_a_conflict() {
    let t = TestApp::new();
    let buyer = t.token(Uuid::new_v4(), Role::Customer);
    let p = t.product(50, 1, Uuid::new_v4());
    t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 2 }))).await;

    let (status, body) = t.call(Method::POST, "/api/v1/orders", Some(&buyer), Some(json!({ "shippingAddress": address(), "paymentMethod": "COD" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Insufficient stock for Chair");
    assert_eq!(t.store.order_count(), 0);
    let (_, cart) = t.call(Method::GET, "/api/v1/cart", Some(&buyer), None).await;
    assert_eq!(cart["data"]["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn payment_is_recorded_once() {
    let t = TestApp::new();
    let customer = Uuid::new_v4();
    let buyer = t.token(customer, Role::Customer);
    let p = t.product(20, 5, Uuid::new_v4());
    t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": p.id, "quantity": 1 }))).await;
    let (_, body) = t.call(Method::POST, "/api/v1/orders", Some(&buyer), Some(json!({ "shippingAddress": address(), "paymentMethod": "Card" }))).await;
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let receipt = json!({ "id": "pi_123", "status": "succeeded", "email": "buyer@example.com" });
    let (status, body) = t.call(Method::POST, &format!("/api/v1/orders/pay/{id}"), Some(&buyer), Some(receipt.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["paymentResult"]["id"], "pi_123");
    assert_eq!(body["data"]["isPaid"], true);
    assert!(body["data"]["paidAt"].is_string());

    let (status, _) = t.call(Method::POST, &format!("/api/v1/orders/pay/{id}"), Some(&buyer), Some(receipt)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let t = TestApp::new();
    let buyer = t.token(Uuid::new_v4(), Role::Customer);
    let huge = "x".repeat(60 * 1024);
    let (status, _) = t.call(Method::POST, "/api/v1/cart", Some(&buyer), Some(json!({ "product": Uuid::new_v4(), "quantity": 1, "pad": huge }))).await;
    assert!(status == StatusCode::PAYLOAD_TOO_LARGE || status == StatusCode::BAD_REQUEST, "{status}");
}
