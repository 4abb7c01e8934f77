//! Order engine: checkout and the order lifecycle.
//!
//! Checkout runs as a sequence of compensable steps:
//!
//! 1. read the cart and resolve its products,
//! 2. reserve stock for every line (all or nothing),
//! 3. insert one order per seller group (or per line),
//! 4. settle the cart.
//!
//! A failure at any step undoes the earlier ones, so a failed checkout leaves no
//! orders behind, no stock taken and the cart as it was.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Actor, CancelledBy, Cart, CartLine, Order, OrderError, OrderLine, OrderStatus, OrderUpdate, PaymentResult, Product};
use crate::domain::events::OrderEvent;
use crate::domain::pricing::{Pricing, PricingPolicy};
use crate::domain::value_objects::{CustomerId, OrderId, PaymentMethod, ProductId, SellerId, ShippingAddress};
use crate::error::{Error, Result};
use crate::publisher::EventPublisher;
use crate::repository::{CartRepository, OrderRepository, ProductRepository};
use crate::services::stock::StockReconciler;

/// How cart lines are grouped into orders at checkout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitPolicy {
    /// One order per seller, holding all of that seller's lines.
    #[default]
    PerSeller,
    /// One order per cart line.
    PerLine,
}

impl FromStr for SplitPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "per-seller" => Ok(Self::PerSeller),
            "per-line" => Ok(Self::PerLine),
            other => Err(format!("unknown order split policy `{other}` (expected per-seller or per-line)")),
        }
    }
}

/// Order as returned over the API: pricing flattened and status spelled out as flags.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub seller_id: SellerId,
    pub items: Vec<OrderLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(flatten)]
    pub pricing: Pricing,
    pub status: &'static str,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_result: Option<PaymentResult>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub is_cancelled: bool,
    pub cancelled_by: Option<CancelledBy>,
    pub cancel_message: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updates: Vec<OrderUpdate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let (cancelled_by, cancelled_at) = match order.status() {
            OrderStatus::Cancelled { by, cancelled_at, .. } => (Some(*by), Some(*cancelled_at)),
            _ => (None, None),
        };
        Self {
            id: order.id(),
            customer_id: order.customer_id(),
            seller_id: order.seller_id(),
            items: order.items().to_vec(),
            shipping_address: order.shipping_address().clone(),
            payment_method: order.payment_method(),
            pricing: order.pricing().clone(),
            status: order.status().as_str(),
            is_paid: order.is_paid(),
            paid_at: order.paid_at(),
            payment_result: order.payment_result().cloned(),
            is_delivered: order.is_delivered(),
            delivered_at: order.delivered_at(),
            is_cancelled: order.is_cancelled(),
            cancelled_by,
            cancel_message: order.cancel_message().map(str::to_string),
            cancelled_at,
            updates: order.updates().to_vec(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self { Self::from(&order) }
}

pub struct OrderEngine {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    orders: Arc<dyn OrderRepository>,
    stock: StockReconciler,
    events: Arc<dyn EventPublisher>,
    pricing: PricingPolicy,
    split: SplitPolicy,
}

impl OrderEngine {
    pub fn new(
        carts: Arc<dyn CartRepository>,
        products: Arc<dyn ProductRepository>,
        orders: Arc<dyn OrderRepository>,
        events: Arc<dyn EventPublisher>,
        pricing: PricingPolicy,
        split: SplitPolicy,
    ) -> Self {
        let stock = StockReconciler::new(products.clone());
        Self { carts, products, orders, stock, events, pricing, split }
    }

    /// Turns the customer's cart into orders. See the module docs for the steps.
    #[tracing::instrument(skip_all, fields(customer_id = %customer))]
    pub async fn place_order(&self, customer: CustomerId, shipping_address: ShippingAddress, payment_method: PaymentMethod) -> Result<Vec<Order>> {
        let cart = match self.carts.find(customer).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(Error::validation("Cart is empty. Cannot create order")),
        };
        shipping_address.validate()?;

        let checked_out: Vec<CartLine> = cart.items().to_vec();
        let lines = self.resolve_lines(&checked_out).await?;

        let all_lines: Vec<OrderLine> = lines.iter().map(|(line, _)| line.clone()).collect();
        self.stock.reserve(&all_lines).await?;

        let mut orders = Vec::new();
        let mut pending_events = Vec::new();
        for (seller, group) in self.group(lines) {
            let pricing = self.pricing.quote(group.iter().map(|l| (l.unit_price, l.quantity.value())));
            let inserted = match Order::place(customer, seller, group, shipping_address.clone(), payment_method, pricing) {
                Ok(mut order) => {
                    pending_events.extend(order.take_events());
                    match self.orders.insert(&order).await {
                        Ok(()) => Ok(order),
                        Err(e) => Err(Error::from(e)),
                    }
                }
                Err(e) => Err(e.into()),
            };
            match inserted {
                Ok(order) => orders.push(order),
                Err(e) => {
                    self.abandon(&orders, &all_lines).await;
                    return Err(e);
                }
            }
        }

        let settled = self
            .carts
            .modify(customer, false, Box::new(move |cart: &mut Cart| -> Result<()> {
                if !cart.covers(&checked_out) {
                    return Err(Error::conflict("Cart changed during checkout, please review it and try again"));
                }
                cart.settle(&checked_out);
                Ok(())
            }))
            .await;
        match settled {
            Ok(Some(_)) => {}
            Ok(None) => {
                self.abandon(&orders, &all_lines).await;
                return Err(Error::conflict("Cart changed during checkout, please review it and try again"));
            }
            Err(e) => {
                self.abandon(&orders, &all_lines).await;
                return Err(e);
            }
        }

        tracing::info!(orders = orders.len(), "orders placed");
        self.publish_all(&pending_events).await;
        Ok(orders)
    }

    /// Customer cancels without a reason; seller must give one. Stock comes back in
    /// the same step; if it cannot, the order stays as it was.
    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    pub async fn cancel_order(&self, actor: Actor, order_id: OrderId, reason: Option<String>) -> Result<Order> {
        let original = self.load(order_id).await?;
        let mut order = original.clone();
        order.cancel(actor, reason)?;
        let events = order.take_events();

        if !self.orders.replace(&order, original.version()).await? {
            return Err(concurrent_change());
        }

        if let Err(e) = self.stock.release(order.items()).await {
            match self.orders.replace(&original, order.version()).await {
                Ok(true) => tracing::warn!(error = %e, "cancellation rolled back: stock not restored"),
                Ok(false) => tracing::error!(error = %e, "cancellation rollback lost a race; order left cancelled without restored stock"),
                Err(revert) => tracing::error!(error = %e, revert_error = %revert, "cancellation rollback failed; order left cancelled without restored stock"),
            }
            return Err(e);
        }

        tracing::info!(by = ?actor, "order cancelled");
        self.publish_all(&events).await;
        Ok(order)
    }

    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    pub async fn mark_delivered(&self, seller: SellerId, order_id: OrderId) -> Result<Order> {
        let order = self.transition(order_id, |order| order.deliver(seller)).await?;
        tracing::info!("order delivered");
        Ok(order)
    }

    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    pub async fn add_update_message(&self, seller: SellerId, order_id: OrderId, message: &str) -> Result<Order> {
        self.transition(order_id, |order| order.add_update(seller, message)).await
    }

    /// Records a payment confirmed by the external provider. No gateway is contacted.
    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    pub async fn pay_order(&self, customer: CustomerId, order_id: OrderId, result: PaymentResult) -> Result<Order> {
        let order = self.transition(order_id, |order| order.mark_paid(customer, result)).await?;
        tracing::info!("order paid");
        Ok(order)
    }

    pub async fn get_order(&self, actor: Actor, order_id: OrderId) -> Result<Order> {
        let order = self.load(order_id).await?;
        order.authorize(actor)?;
        Ok(order)
    }

    pub async fn list_for_customer(&self, customer: CustomerId) -> Result<Vec<Order>> {
        Ok(self.orders.list_by_customer(customer).await?)
    }

    pub async fn list_for_seller(&self, seller: SellerId) -> Result<Vec<Order>> {
        Ok(self.orders.list_by_seller(seller).await?)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        self.orders.find(order_id).await?.ok_or_else(|| Error::not_found("Order not found"))
    }

    /// Load, apply, write back under the loaded version, publish.
    async fn transition<F>(&self, order_id: OrderId, apply: F) -> Result<Order>
    where
        F: FnOnce(&mut Order) -> std::result::Result<(), OrderError>,
    {
        let mut order = self.load(order_id).await?;
        let expected = order.version();
        apply(&mut order)?;
        let events = order.take_events();
        if !self.orders.replace(&order, expected).await? {
            return Err(concurrent_change());
        }
        self.publish_all(&events).await;
        Ok(order)
    }

    async fn resolve_lines(&self, cart_lines: &[CartLine]) -> Result<Vec<(OrderLine, SellerId)>> {
        let ids: Vec<ProductId> = cart_lines.iter().map(|l| l.product).collect();
        let catalog: HashMap<ProductId, Product> = self.products.find_many(&ids).await?.into_iter().map(|p| (p.id, p)).collect();
        cart_lines
            .iter()
            .map(|line| {
                let product = catalog
                    .get(&line.product)
                    .ok_or_else(|| Error::conflict(format!("Product {} is no longer available", line.product)))?;
                let order_line = OrderLine { product: product.id, name: product.name.clone(), unit_price: product.price, quantity: line.quantity };
                Ok((order_line, product.seller_id))
            })
            .collect()
    }

    /// Groups keep the cart's line order; sellers appear in order of first line.
    fn group(&self, lines: Vec<(OrderLine, SellerId)>) -> Vec<(SellerId, Vec<OrderLine>)> {
        match self.split {
            SplitPolicy::PerLine => lines.into_iter().map(|(line, seller)| (seller, vec![line])).collect(),
            SplitPolicy::PerSeller => {
                let mut groups: Vec<(SellerId, Vec<OrderLine>)> = Vec::new();
                for (line, seller) in lines {
                    match groups.iter_mut().find(|(s, _)| *s == seller) {
                        Some((_, group)) => group.push(line),
                        None => groups.push((seller, vec![line])),
                    }
                }
                groups
            }
        }
    }

    /// Undo a checkout: drop inserted orders, give reserved stock back.
    async fn abandon(&self, inserted: &[Order], reserved: &[OrderLine]) {
        for order in inserted {
            if let Err(e) = self.orders.delete(order.id()).await {
                tracing::error!(error = %e, order_id = %order.id(), "compensation failed: order not deleted");
            }
        }
        self.stock.unreserve(reserved).await;
        tracing::warn!(orders = inserted.len(), "checkout abandoned");
    }

    async fn publish_all(&self, events: &[OrderEvent]) {
        for event in events {
            self.events.publish(event).await;
        }
    }
}

fn concurrent_change() -> Error {
    Error::conflict("Order was modified concurrently, please retry")
}
