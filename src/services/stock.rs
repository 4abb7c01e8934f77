//! Stock reconciliation for checkout and cancellation.
//!
//! Every multi-line adjustment is all-or-nothing: when one line fails, the lines
//! already applied are reversed before the error is returned. Nothing here retries;
//! a caller must not reserve or release the same lines twice for one event.

use std::sync::Arc;

use crate::domain::aggregates::OrderLine;
use crate::error::{Error, Result};
use crate::repository::ProductRepository;

#[derive(Clone)]
pub struct StockReconciler {
    products: Arc<dyn ProductRepository>,
}

impl StockReconciler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    /// Compare-and-decrement every line. Fails with a conflict naming the first
    /// product that ran short.
    pub async fn reserve(&self, lines: &[OrderLine]) -> Result<()> {
        let mut taken: Vec<&OrderLine> = Vec::with_capacity(lines.len());
        for line in lines {
            match self.products.decrement_stock(line.product, line.quantity.value()).await {
                Ok(true) => taken.push(line),
                Ok(false) => {
                    tracing::debug!(product_id = %line.product, quantity = line.quantity.value(), "stock check failed");
                    self.put_back(taken).await;
                    return Err(Error::conflict(format!("Insufficient stock for {}", line.name)));
                }
                Err(e) => {
                    self.put_back(taken).await;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Restore every line. A product that no longer exists makes the whole release fail.
    pub async fn release(&self, lines: &[OrderLine]) -> Result<()> {
        let mut restored: Vec<&OrderLine> = Vec::with_capacity(lines.len());
        for line in lines {
            match self.products.restore_stock(line.product, line.quantity.value()).await {
                Ok(true) => restored.push(line),
                Ok(false) => {
                    self.take_back(restored).await;
                    return Err(Error::conflict(format!("Product {} no longer exists, stock cannot be restored", line.name)));
                }
                Err(e) => {
                    self.take_back(restored).await;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Reverse a successful [`reserve`](Self::reserve) after a later checkout step failed.
    pub async fn unreserve(&self, lines: &[OrderLine]) {
        self.put_back(lines.iter().collect()).await;
    }

    async fn put_back(&self, lines: Vec<&OrderLine>) {
        for line in lines {
            match self.products.restore_stock(line.product, line.quantity.value()).await {
                Ok(true) => {}
                Ok(false) => tracing::error!(product_id = %line.product, quantity = line.quantity.value(), "compensation failed: product vanished"),
                Err(e) => tracing::error!(error = %e, product_id = %line.product, quantity = line.quantity.value(), "compensation failed"),
            }
        }
    }

    async fn take_back(&self, lines: Vec<&OrderLine>) {
        for line in lines {
            match self.products.decrement_stock(line.product, line.quantity.value()).await {
                Ok(true) => {}
                Ok(false) => tracing::error!(product_id = %line.product, quantity = line.quantity.value(), "compensation failed: restored stock already sold"),
                Err(e) => tracing::error!(error = %e, product_id = %line.product, quantity = line.quantity.value(), "compensation failed"),
            }
        }
    }
}
