//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::CancelledBy;
use crate::domain::value_objects::{CustomerId, OrderId, SellerId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: OrderId, customer_id: CustomerId, seller_id: SellerId, total: Decimal, at: DateTime<Utc> },
    Cancelled { order_id: OrderId, by: CancelledBy, reason: Option<String>, at: DateTime<Utc> },
    Delivered { order_id: OrderId, at: DateTime<Utc> },
    Updated { order_id: OrderId, message: String, at: DateTime<Utc> },
    Paid { order_id: OrderId, at: DateTime<Utc> },
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            Self::Placed { order_id, .. }
            | Self::Cancelled { order_id, .. }
            | Self::Delivered { order_id, .. }
            | Self::Updated { order_id, .. }
            | Self::Paid { order_id, .. } => *order_id,
        }
    }

    /// Last segment of the publish subject.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::Cancelled { .. } => "cancelled",
            Self::Delivered { .. } => "delivered",
            Self::Updated { .. } => "updated",
            Self::Paid { .. } => "paid",
        }
    }
}
