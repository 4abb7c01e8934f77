//! Application services: the cart engine, the order engine and the stock
//! reconciler they share.

pub mod cart;
pub mod order;
pub mod stock;

pub use cart::{CartEngine, CartLineView, CartView, ProductSummary};
pub use order::{OrderEngine, OrderView, SplitPolicy};
pub use stock::StockReconciler;
