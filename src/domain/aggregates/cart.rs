//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{CustomerId, ProductId, Quantity, QuantityError};
use crate::error::Error;

/// A customer's cart. At most one line per product; lines keep insertion order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    customer_id: CustomerId,
    items: Vec<CartLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: ProductId,
    pub quantity: Quantity,
}

impl Cart {
    pub fn new(customer_id: CustomerId) -> Self {
        let now = Utc::now();
        Self { customer_id, items: vec![], created_at: now, updated_at: now }
    }

    /// Rebuild a stored cart. Duplicate product rows are merged.
    pub fn from_parts(customer_id: CustomerId, lines: impl IntoIterator<Item = CartLine>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Result<Self, CartError> {
        let mut cart = Self { customer_id, items: vec![], created_at, updated_at };
        for line in lines { cart.merge(line.product, line.quantity)?; }
        Ok(cart)
    }

    pub fn customer_id(&self) -> CustomerId { self.customer_id }
    pub fn items(&self) -> &[CartLine] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn line(&self, product: ProductId) -> Option<&CartLine> { self.items.iter().find(|i| i.product == product) }

    /// Adds to an existing line's quantity or appends a new line. A sum past
    /// [`Quantity::MAX`] leaves the cart unchanged.
    pub fn add_line(&mut self, product: ProductId, quantity: Quantity) -> Result<(), CartError> {
        self.merge(product, quantity)?;
        self.touch();
        Ok(())
    }

    /// Replaces a line's quantity. Zero removes the line.
    pub fn update_line(&mut self, product: ProductId, quantity: u32) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product == product).ok_or(CartError::ItemNotFound)?;
        match Quantity::new(quantity) {
            Ok(q) => item.quantity = q,
            Err(QuantityError::Zero) => self.items.retain(|i| i.product != product),
            Err(e) => return Err(CartError::Quantity(e)),
        }
        self.touch();
        Ok(())
    }

    pub fn remove_line(&mut self, product: ProductId) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product != product);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    /// Removes checked-out quantities. A line that grew after checkout read the cart
    /// keeps the difference; everything else disappears.
    pub fn settle(&mut self, checked_out: &[CartLine]) {
        for done in checked_out {
            if let Some(pos) = self.items.iter().position(|i| i.product == done.product) {
                match self.items[pos].quantity.subtract(done.quantity) {
                    Some(left) => self.items[pos].quantity = left,
                    None => { self.items.remove(pos); }
                }
            }
        }
        self.touch();
    }

    /// Whether every line in `lines` is still present with at least that quantity.
    pub fn covers(&self, lines: &[CartLine]) -> bool {
        lines.iter().all(|want| self.line(want.product).is_some_and(|have| have.quantity >= want.quantity))
    }

    fn merge(&mut self, product: ProductId, quantity: Quantity) -> Result<(), CartError> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product == product) {
            existing.quantity = existing.quantity.add(quantity).map_err(CartError::Quantity)?;
        } else {
            self.items.push(CartLine { product, quantity });
        }
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, Quantity(QuantityError) }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item doesn't exist in cart"),
            Self::Quantity(e) => write!(f, "{e}"),
        }
    }
}

impl From<CartError> for Error {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Error::NotFound(e.to_string()),
            CartError::Quantity(q) => q.into(),
        }
    }
}
