//! Storage seams for the engines.
//!
//! The engines depend on these traits only. [`memory`] backs tests and local runs,
//! [`postgres`] backs production.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::aggregates::{Cart, Order, Product};
use crate::domain::value_objects::{CustomerId, OrderId, ProductId, SellerId};
use crate::error::{Error, RepositoryError};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Mutation applied to a cart while the store holds it exclusively.
pub type CartMutation = Box<dyn FnOnce(&mut Cart) -> Result<(), Error> + Send>;

/// Read side of the catalog plus the two stock adjustments this core may make.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products that exist among `ids`, in no particular order.
    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Atomic compare-and-decrement: `false` when fewer than `qty` units remain
    /// (or the product is gone), in which case nothing changed.
    async fn decrement_stock(&self, id: ProductId, qty: u32) -> Result<bool, RepositoryError>;

    /// Unconditional increment. `false` when the product no longer exists.
    async fn restore_stock(&self, id: ProductId, qty: u32) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find(&self, customer: CustomerId) -> Result<Option<Cart>, RepositoryError>;

    /// Runs `mutation` on the customer's cart with writes to that cart serialized,
    /// then persists the result. A missing cart is created first when `create` is set;
    /// otherwise `Ok(None)` is returned without calling `mutation`. An error from
    /// `mutation` leaves the stored cart untouched.
    async fn modify(&self, customer: CustomerId, create: bool, mutation: CartMutation) -> Result<Option<Cart>, Error>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Used only to compensate a failed checkout.
    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError>;

    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Newest first.
    async fn list_by_customer(&self, customer: CustomerId) -> Result<Vec<Order>, RepositoryError>;

    /// Newest first.
    async fn list_by_seller(&self, seller: SellerId) -> Result<Vec<Order>, RepositoryError>;

    /// Optimistic write: stores `order` only if the stored version still equals
    /// `expected_version`. Returns whether the write happened.
    async fn replace(&self, order: &Order, expected_version: u64) -> Result<bool, RepositoryError>;
}
