//! Service configuration, read once at startup.

use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::pricing::PricingPolicy;
use crate::services::SplitPolicy;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} has an invalid value `{value}`: {reason}")]
    Invalid { name: &'static str, value: String, reason: String },

    #[error("{0} must be set in {1} environment")]
    Missing(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL. Without it the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub nats_url: Option<String>,
    pub pricing: PricingPolicy,
    pub split_policy: SplitPolicy,
    pub request_timeout: Duration,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "development".into());

        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy {
            tax_rate: parse(&var, "TAX_RATE", defaults.tax_rate)?,
            shipping_fee: parse(&var, "SHIPPING_FEE", defaults.shipping_fee)?,
            free_shipping_threshold: parse(&var, "FREE_SHIPPING_THRESHOLD", defaults.free_shipping_threshold)?,
        };
        for (name, value) in [("TAX_RATE", pricing.tax_rate), ("SHIPPING_FEE", pricing.shipping_fee), ("FREE_SHIPPING_THRESHOLD", pricing.free_shipping_threshold)] {
            if value < Decimal::ZERO {
                return Err(ConfigError::Invalid { name, value: value.to_string(), reason: "must not be negative".into() });
            }
        }

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "development" => {
                tracing::warn!("JWT_SECRET not set, using a development secret");
                "dev-jwt-secret-not-for-production".into()
            }
            None => return Err(ConfigError::Missing("JWT_SECRET", environment)),
        };

        let timeout_secs: u64 = parse(&var, "REQUEST_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid { name: "REQUEST_TIMEOUT_SECS", value: "0".into(), reason: "must be positive".into() });
        }

        Ok(Self {
            database_url: var("DATABASE_URL"),
            port: parse(&var, "PORT", 8083)?,
            jwt_secret,
            nats_url: var("NATS_URL"),
            pricing,
            split_policy: parse(&var, "ORDER_SPLIT_POLICY", SplitPolicy::default())?,
            request_timeout: Duration::from_secs(timeout_secs),
            db_max_connections: parse(&var, "DB_MAX_CONNECTIONS", 10)?,
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid { name, value: raw, reason: e.to_string() }),
    }
}
