use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use marketplace_orders::domain::aggregates::{Actor, Product};
use marketplace_orders::domain::pricing::PricingPolicy;
use marketplace_orders::domain::value_objects::{PaymentMethod, ShippingAddress};
use marketplace_orders::publisher::LogPublisher;
use marketplace_orders::repository::InMemoryStore;
use marketplace_orders::services::{CartEngine, OrderEngine, SplitPolicy};
use marketplace_orders::Error;

fn engines(store: &InMemoryStore) -> (Arc<CartEngine>, Arc<OrderEngine>) {
    let shared = Arc::new(store.clone());
    let carts = CartEngine::new(shared.clone(), shared.clone(), PricingPolicy::default());
    let orders = OrderEngine::new(shared.clone(), shared.clone(), shared, Arc::new(LogPublisher), PricingPolicy::default(), SplitPolicy::PerSeller);
    (Arc::new(carts), Arc::new(orders))
}

fn address() -> ShippingAddress {
    ShippingAddress { house: "7".into(), city: "Lyon".into(), state: "ARA".into(), country: "FR".into(), zipcode: "69001".into() }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_never_oversell() {
    let store = InMemoryStore::new();
    let product = Product::new("Limited print", Decimal::new(250, 0), 5, Uuid::new_v4());
    store.upsert_product(product.clone()).unwrap();
    let (carts, orders) = engines(&store);

    let customers: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();
    for customer in &customers {
        carts.add_line(*customer, product.id, 1).await.unwrap();
    }

    let handles: Vec<_> = customers
        .iter()
        .map(|customer| {
            let orders = orders.clone();
            let customer = *customer;
            tokio::spawn(async move { orders.place_order(customer, address(), PaymentMethod::Cod).await })
        })
        .collect();

    let mut placed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(list) => placed += list.len(),
            Err(Error::Conflict(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(rejected, 15);
    assert_eq!(store.stock_of(product.id), Some(0));
    assert_eq!(store.order_count(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_customer_double_submit_places_once() {
    let store = InMemoryStore::new();
    let product = Product::new("Lamp", Decimal::new(30, 0), 100, Uuid::new_v4());
    store.upsert_product(product.clone()).unwrap();
    let (carts, orders) = engines(&store);
    let customer = Uuid::new_v4();
    carts.add_line(customer, product.id, 2).await.unwrap();

    let a = tokio::spawn({
        let orders = orders.clone();
        async move { orders.place_order(customer, address(), PaymentMethod::Cod).await }
    });
    let b = tokio::spawn({
        let orders = orders.clone();
        async move { orders.place_order(customer, address(), PaymentMethod::Cod).await }
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(store.order_count(), 1);
    assert_eq!(store.stock_of(product.id), Some(98));
    assert!(carts.get_cart(customer).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cancels_restore_stock_once() {
    let store = InMemoryStore::new();
    let product = Product::new("Mirror", Decimal::new(80, 0), 10, Uuid::new_v4());
    store.upsert_product(product.clone()).unwrap();
    let (carts, orders) = engines(&store);
    let customer = Uuid::new_v4();
    carts.add_line(customer, product.id, 4).await.unwrap();
    let order = orders.place_order(customer, address(), PaymentMethod::Cod).await.unwrap().remove(0);
    assert_eq!(store.stock_of(product.id), Some(6));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let orders = orders.clone();
            let id = order.id();
            tokio::spawn(async move { orders.cancel_order(Actor::Customer(customer), id, None).await })
        })
        .collect();
    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert!(matches!(e, Error::Conflict(_)), "{e}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(store.stock_of(product.id), Some(10));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_to_one_cart_are_all_kept() {
    let store = InMemoryStore::new();
    let product = Product::new("Tea", Decimal::new(3, 0), 10, Uuid::new_v4());
    let other = Product::new("Cup", Decimal::new(8, 0), 10, Uuid::new_v4());
    store.upsert_product(product.clone()).unwrap();
    store.upsert_product(other.clone()).unwrap();
    let (carts, _) = engines(&store);
    let customer = Uuid::new_v4();

    let quantities: Vec<u32> = (1..=50).collect();
    let handles: Vec<_> = quantities
        .iter()
        .map(|&qty| {
            let carts = carts.clone();
            let id = if qty % 10 == 0 { other.id } else { product.id };
            tokio::spawn(async move { carts.add_line(customer, id, qty).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let cart = carts.get_cart(customer).await.unwrap();
    assert_eq!(cart.items.len(), 2);
    let total_of = |id: Uuid| cart.items.iter().find(|l| l.product_id == id).map(|l| l.quantity);
    let expected_other: u32 = quantities.iter().filter(|q| *q % 10 == 0).sum();
    let expected_product: u32 = quantities.iter().sum::<u32>() - expected_other;
    assert_eq!(total_of(product.id), Some(expected_product));
    assert_eq!(total_of(other.id), Some(expected_other));
    assert_eq!(store.stock_of(product.id), Some(10));
}
