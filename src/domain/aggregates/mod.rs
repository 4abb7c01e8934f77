//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::Product;
pub use order::{Actor, CancelledBy, Order, OrderError, OrderLine, OrderStatus, OrderUpdate, PaymentResult};
pub use cart::{Cart, CartError, CartLine};
