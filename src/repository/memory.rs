//! In-process store implementing every repository trait.
//!
//! Each collection sits behind its own lock; every trait call takes the lock once,
//! so compare-and-decrement and cart mutations are atomic with respect to each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{CartMutation, CartRepository, OrderRepository, ProductRepository};
use crate::domain::aggregates::{Cart, Order, Product};
use crate::domain::value_objects::{CustomerId, OrderId, ProductId, SellerId};
use crate::error::{Error, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    carts: Arc<Mutex<HashMap<CustomerId, Cart>>>,
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or replaces a catalog entry.
    pub fn upsert_product(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().map_err(|_| RepositoryError::LockPoisoned("products"))?;
        products.insert(product.id, product);
        Ok(())
    }

    pub fn set_price(&self, id: ProductId, price: Decimal) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().map_err(|_| RepositoryError::LockPoisoned("products"))?;
        Ok(products.get_mut(&id).map(|p| p.price = price).is_some())
    }

    pub fn remove_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().map_err(|_| RepositoryError::LockPoisoned("products"))?;
        Ok(products.remove(&id).is_some())
    }

    pub fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.products.read().ok()?.get(&id).map(|p| p.stock)
    }

    pub fn order_count(&self) -> usize {
        self.orders.read().map(|o| o.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().map_err(|_| RepositoryError::LockPoisoned("products"))?;
        Ok(products.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().map_err(|_| RepositoryError::LockPoisoned("products"))?;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn decrement_stock(&self, id: ProductId, qty: u32) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().map_err(|_| RepositoryError::LockPoisoned("products"))?;
        Ok(products.get_mut(&id).is_some_and(|p| p.take_stock(qty)))
    }

    async fn restore_stock(&self, id: ProductId, qty: u32) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().map_err(|_| RepositoryError::LockPoisoned("products"))?;
        match products.get_mut(&id) {
            Some(p) => { p.put_back_stock(qty); Ok(true) }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CartRepository for InMemoryStore {
    async fn find(&self, customer: CustomerId) -> Result<Option<Cart>, RepositoryError> {
        let carts = self.carts.lock().map_err(|_| RepositoryError::LockPoisoned("carts"))?;
        Ok(carts.get(&customer).cloned())
    }

    async fn modify(&self, customer: CustomerId, create: bool, mutation: CartMutation) -> Result<Option<Cart>, Error> {
        let mut carts = self.carts.lock().map_err(|_| RepositoryError::LockPoisoned("carts"))?;
        let mut cart = match carts.get(&customer) {
            Some(cart) => cart.clone(),
            None if create => Cart::new(customer),
            None => return Ok(None),
        };
        mutation(&mut cart)?;
        carts.insert(customer, cart.clone());
        Ok(Some(cart))
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().map_err(|_| RepositoryError::LockPoisoned("orders"))?;
        orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().map_err(|_| RepositoryError::LockPoisoned("orders"))?;
        Ok(orders.remove(&id).is_some())
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().map_err(|_| RepositoryError::LockPoisoned("orders"))?;
        Ok(orders.get(&id).cloned())
    }

    async fn list_by_customer(&self, customer: CustomerId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().map_err(|_| RepositoryError::LockPoisoned("orders"))?;
        Ok(newest_first(orders.values().filter(|o| o.customer_id() == customer)))
    }

    async fn list_by_seller(&self, seller: SellerId) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().map_err(|_| RepositoryError::LockPoisoned("orders"))?;
        Ok(newest_first(orders.values().filter(|o| o.seller_id() == seller)))
    }

    async fn replace(&self, order: &Order, expected_version: u64) -> Result<bool, RepositoryError> {
        let mut orders = self.orders.write().map_err(|_| RepositoryError::LockPoisoned("orders"))?;
        match orders.get_mut(&order.id()) {
            Some(stored) if stored.version() == expected_version => { *stored = order.clone(); Ok(true) }
            _ => Ok(false),
        }
    }
}

fn newest_first<'a>(orders: impl Iterator<Item = &'a Order>) -> Vec<Order> {
    let mut list: Vec<Order> = orders.cloned().collect();
    list.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then_with(|| b.id().cmp(&a.id())));
    list
}
