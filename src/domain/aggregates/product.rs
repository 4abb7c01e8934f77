//! Product as seen by the order core
//!
//! The catalog owns products; this core reads them and adjusts stock through
//! [`crate::repository::ProductRepository`] only.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{ProductId, SellerId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
    pub seller_id: SellerId,
    pub rating: Decimal,
    pub num_reviews: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal, stock: u32, seller_id: SellerId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: name.into(), price, stock, seller_id,
            rating: Decimal::ZERO, num_reviews: 0, created_at: now, updated_at: now,
        }
    }

    /// Compare-and-decrement on the in-memory record. Returns `false` and leaves the
    /// stock untouched when fewer than `qty` units remain.
    pub fn take_stock(&mut self, qty: u32) -> bool {
        match self.stock.checked_sub(qty) {
            Some(left) => { self.stock = left; self.touch(); true }
            None => false,
        }
    }

    pub fn put_back_stock(&mut self, qty: u32) {
        self.stock = self.stock.saturating_add(qty);
        self.touch();
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
