//! Marketplace Orders
//!
//! Cart and order consistency core for a multi-seller marketplace.
//!
//! ## Features
//! - Per-customer carts with live pricing
//! - Checkout split into one order per seller (or per line)
//! - Stock reserved and restored without overselling
//! - Order lifecycle: placement, cancellation, delivery, seller updates, payment
//! - Order events on NATS

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod identity;
pub mod publisher;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{Error, Result};
