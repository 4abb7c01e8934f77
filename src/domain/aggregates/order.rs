//! Order Aggregate
//!
//! An order is created once at checkout with frozen lines and prices, then only
//! moves through the transitions below:
//!
//! ```text
//! Placed ──deliver()──▶ Delivered
//!    └────cancel()────▶ Cancelled
//! ```
//!
//! Both targets are terminal. Payment is tracked next to the status and is refused
//! once the order is cancelled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::events::OrderEvent;
use crate::domain::pricing::Pricing;
use crate::domain::value_objects::{CustomerId, OrderId, PaymentMethod, ProductId, Quantity, SellerId, ShippingAddress};
use crate::error::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    customer_id: CustomerId,
    seller_id: SellerId,
    items: Vec<OrderLine>,
    shipping_address: ShippingAddress,
    payment_method: PaymentMethod,
    pricing: Pricing,
    status: OrderStatus,
    payment_result: Option<PaymentResult>,
    paid_at: Option<DateTime<Utc>>,
    updates: Vec<OrderUpdate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    #[serde(skip)]
    events: Vec<OrderEvent>,
}

/// Line frozen at checkout; never re-derived from the live product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: Quantity,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate { pub date: DateTime<Utc>, pub message: String }

/// Payment confirmation reported by the external payment provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult { pub id: String, pub status: String, pub email: String }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum OrderStatus {
    Placed,
    #[serde(rename_all = "camelCase")]
    Delivered { delivered_at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Cancelled { by: CancelledBy, message: Option<String>, cancelled_at: DateTime<Utc> },
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Placed => "placed", Self::Delivered { .. } => "delivered", Self::Cancelled { .. } => "cancelled" }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancelledBy { Customer, Seller }

/// Who is acting on an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor { Customer(CustomerId), Seller(SellerId) }

impl Order {
    pub fn place(
        customer_id: CustomerId,
        seller_id: SellerId,
        items: Vec<OrderLine>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        pricing: Pricing,
    ) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), customer_id, seller_id, items, shipping_address, payment_method, pricing,
            status: OrderStatus::Placed, payment_result: None, paid_at: None, updates: vec![],
            created_at: now, updated_at: now, version: 0, events: vec![],
        };
        order.raise_event(OrderEvent::Placed { order_id: order.id, customer_id, seller_id, total: order.pricing.total_price, at: now });
        Ok(order)
    }

    pub fn id(&self) -> OrderId { self.id }
    pub fn customer_id(&self) -> CustomerId { self.customer_id }
    pub fn seller_id(&self) -> SellerId { self.seller_id }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn shipping_address(&self) -> &ShippingAddress { &self.shipping_address }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn pricing(&self) -> &Pricing { &self.pricing }
    pub fn status(&self) -> &OrderStatus { &self.status }
    pub fn payment_result(&self) -> Option<&PaymentResult> { self.payment_result.as_ref() }
    pub fn paid_at(&self) -> Option<DateTime<Utc>> { self.paid_at }
    pub fn updates(&self) -> &[OrderUpdate] { &self.updates }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn version(&self) -> u64 { self.version }

    pub fn is_paid(&self) -> bool { self.paid_at.is_some() }
    pub fn is_delivered(&self) -> bool { matches!(self.status, OrderStatus::Delivered { .. }) }
    pub fn is_cancelled(&self) -> bool { matches!(self.status, OrderStatus::Cancelled { .. }) }

    pub fn delivered_at(&self) -> Option<DateTime<Utc>> {
        match self.status { OrderStatus::Delivered { delivered_at } => Some(delivered_at), _ => None }
    }

    pub fn cancel_message(&self) -> Option<&str> {
        match &self.status { OrderStatus::Cancelled { message, .. } => message.as_deref(), _ => None }
    }

    /// The buyer may act as customer, the seller as seller. Nobody else.
    pub fn authorize(&self, actor: Actor) -> Result<(), OrderError> {
        match actor {
            Actor::Customer(id) if id == self.customer_id => Ok(()),
            Actor::Seller(id) if id == self.seller_id => Ok(()),
            _ => Err(OrderError::NotOwner),
        }
    }

    /// Customers cancel without a reason; sellers must give one.
    pub fn cancel(&mut self, actor: Actor, reason: Option<String>) -> Result<(), OrderError> {
        self.authorize(actor)?;
        self.ensure_placed()?;
        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let by = match actor {
            Actor::Customer(_) => CancelledBy::Customer,
            Actor::Seller(_) => {
                if reason.is_none() { return Err(OrderError::MessageRequired); }
                CancelledBy::Seller
            }
        };
        let now = Utc::now();
        self.status = OrderStatus::Cancelled { by, message: reason.clone(), cancelled_at: now };
        self.touch(now);
        self.raise_event(OrderEvent::Cancelled { order_id: self.id, by, reason, at: now });
        Ok(())
    }

    pub fn deliver(&mut self, seller: SellerId) -> Result<(), OrderError> {
        self.authorize(Actor::Seller(seller))?;
        self.ensure_placed()?;
        let now = Utc::now();
        self.status = OrderStatus::Delivered { delivered_at: now };
        self.touch(now);
        self.raise_event(OrderEvent::Delivered { order_id: self.id, at: now });
        Ok(())
    }

    pub fn add_update(&mut self, seller: SellerId, message: &str) -> Result<(), OrderError> {
        self.authorize(Actor::Seller(seller))?;
        let message = message.trim();
        if message.is_empty() { return Err(OrderError::MessageRequired); }
        if self.is_cancelled() { return Err(OrderError::AlreadyCancelled); }
        let now = Utc::now();
        self.updates.push(OrderUpdate { date: now, message: message.to_string() });
        self.touch(now);
        self.raise_event(OrderEvent::Updated { order_id: self.id, message: message.to_string(), at: now });
        Ok(())
    }

    pub fn mark_paid(&mut self, customer: CustomerId, result: PaymentResult) -> Result<(), OrderError> {
        self.authorize(Actor::Customer(customer))?;
        if self.is_cancelled() { return Err(OrderError::AlreadyCancelled); }
        if self.is_paid() { return Err(OrderError::AlreadyPaid); }
        let now = Utc::now();
        self.payment_result = Some(result);
        self.paid_at = Some(now);
        self.touch(now);
        self.raise_event(OrderEvent::Paid { order_id: self.id, at: now });
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<OrderEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: OrderEvent) { self.events.push(e); }

    fn ensure_placed(&self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Placed => Ok(()),
            OrderStatus::Delivered { .. } => Err(OrderError::AlreadyDelivered),
            OrderStatus::Cancelled { .. } => Err(OrderError::AlreadyCancelled),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; self.version += 1; }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, NotOwner, AlreadyCancelled, AlreadyDelivered, AlreadyPaid, MessageRequired }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "Order has no items"),
            Self::NotOwner => write!(f, "This order doesn't belong to you"),
            Self::AlreadyCancelled => write!(f, "Order is already cancelled"),
            Self::AlreadyDelivered => write!(f, "Order is already delivered"),
            Self::AlreadyPaid => write!(f, "Order is already paid"),
            Self::MessageRequired => write!(f, "Message is required"),
        }
    }
}

impl From<OrderError> for Error {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems | OrderError::MessageRequired => Error::Validation(e.to_string()),
            OrderError::NotOwner => Error::Authorization(e.to_string()),
            OrderError::AlreadyCancelled | OrderError::AlreadyDelivered | OrderError::AlreadyPaid => Error::Conflict(e.to_string()),
        }
    }
}
