//! Request bodies. Field names are camelCase on the wire.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::PaymentResult;
use crate::domain::value_objects::ShippingAddress;

#[derive(Debug, Deserialize, Validate)]
pub struct AddLineRequest {
    pub product: Uuid,
    #[validate(range(min = 1, message = "Quantity must be greater than 0"))]
    pub quantity: u32,
}

/// Zero removes the line.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLineRequest {
    pub product: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RemoveLineRequest {
    pub product: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// Blank or missing fields are reported together by the order engine.
    #[serde(default)]
    pub shipping_address: ShippingAddress,
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SellerMessageRequest {
    #[validate(length(min = 1, max = 1000, message = "Message is required"))]
    pub message: String,
}

/// Payment confirmation forwarded by the client after the provider accepted it.
#[derive(Debug, Deserialize, Validate)]
pub struct PayOrderRequest {
    #[validate(length(min = 1, message = "Payment id is required"))]
    pub id: String,
    #[validate(length(min = 1, message = "Payment status is required"))]
    pub status: String,
    #[validate(email(message = "A valid payer email is required"))]
    pub email: String,
}

impl From<PayOrderRequest> for PaymentResult {
    fn from(r: PayOrderRequest) -> Self {
        PaymentResult { id: r.id, status: r.status, email: r.email }
    }
}
