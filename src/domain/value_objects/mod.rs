//! Value objects for carts and orders

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::Error;

pub type CustomerId = Uuid;
pub type SellerId = Uuid;
pub type ProductId = Uuid;
pub type OrderId = Uuid;

/// Strictly positive line quantity, at most [`Quantity::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Largest quantity a cart line or order line can hold (the `INTEGER` column range).
    pub const MAX: u32 = i32::MAX as u32;

    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        if value > Self::MAX { return Err(QuantityError::TooLarge); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Result<Self, QuantityError> {
        self.0.checked_add(other.0).ok_or(QuantityError::TooLarge).and_then(Self::new)
    }
    /// `None` when nothing would be left.
    pub fn subtract(&self, other: Quantity) -> Option<Self> {
        if other.0 >= self.0 { None } else { Some(Self(self.0 - other.0)) }
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> u32 { q.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { Zero, TooLarge }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => write!(f, "Quantity must be greater than 0"),
            Self::TooLarge => write!(f, "Quantity must be at most {}", Quantity::MAX),
        }
    }
}

impl From<QuantityError> for Error {
    fn from(e: QuantityError) -> Self { Error::Validation(e.to_string()) }
}

/// Shipping address snapshot embedded in every order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub house: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zipcode: String,
}

impl ShippingAddress {
    /// All five fields are required and must not be blank.
    pub fn validate(&self) -> Result<(), Error> {
        let fields = [
            ("house", &self.house),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
            ("zipcode", &self.zipcode),
        ];
        let missing: Vec<&str> = fields.iter().filter(|(_, v)| v.trim().is_empty()).map(|(k, _)| *k).collect();
        if !missing.is_empty() {
            return Err(Error::validation(format!("Shipping address is missing: {}", missing.join(", "))));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    #[serde(rename = "COD")]
    Cod,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Cod => "COD", Self::Card => "Card" }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COD" => Ok(Self::Cod),
            "Card" => Ok(Self::Card),
            other => Err(Error::validation(format!("Unsupported payment method: {other}"))),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}
