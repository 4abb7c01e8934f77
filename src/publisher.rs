//! Best-effort delivery of order events.

use async_trait::async_trait;

use crate::domain::events::OrderEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Never fails the caller; delivery problems are logged.
    async fn publish(&self, event: &OrderEvent);
}

/// Publishes JSON payloads on `<prefix>.<kind>`, e.g. `marketplace.orders.placed`.
pub struct NatsPublisher {
    client: async_nats::Client,
    prefix: String,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client, prefix: impl Into<String>) -> Self {
        Self { client, prefix: prefix.into() }
    }

    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        Ok(Self::new(client, prefix))
    }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, event: &OrderEvent) {
        let subject = format!("{}.{}", self.prefix, event.kind());
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, order_id = %event.order_id(), "failed to encode order event");
                return;
            }
        };
        if let Err(e) = self.client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(error = %e, %subject, order_id = %event.order_id(), "failed to publish order event");
        }
    }
}

/// Fallback when no broker is configured: events only reach the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &OrderEvent) {
        tracing::debug!(order_id = %event.order_id(), kind = event.kind(), ?event, "order event");
    }
}
