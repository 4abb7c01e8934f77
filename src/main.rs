//! Marketplace Orders service

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketplace_orders::api::{self, AppState};
use marketplace_orders::identity::JwtIdentityProvider;
use marketplace_orders::publisher::{EventPublisher, LogPublisher, NatsPublisher};
use marketplace_orders::repository::{CartRepository, InMemoryStore, OrderRepository, PgStore, ProductRepository};
use marketplace_orders::services::{CartEngine, OrderEngine};
use marketplace_orders::AppConfig;

const EVENT_SUBJECT_PREFIX: &str = "marketplace.orders";

type Stores = (Arc<dyn CartRepository>, Arc<dyn ProductRepository>, Arc<dyn OrderRepository>);

fn shared<S>(store: Arc<S>) -> Stores
where
    S: CartRepository + ProductRepository + OrderRepository + 'static,
{
    (store.clone(), store.clone(), store)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = AppConfig::from_env()?;

    let (carts, products, orders) = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections, config.request_timeout).await?;
            store.migrate().await?;
            tracing::info!("using postgres store");
            shared(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            shared(Arc::new(InMemoryStore::new()))
        }
    };

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match NatsPublisher::connect(url, EVENT_SUBJECT_PREFIX).await {
            Ok(publisher) => Arc::new(publisher),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, order events go to the log only");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let state = AppState {
        carts: Arc::new(CartEngine::new(carts.clone(), products.clone(), config.pricing.clone())),
        orders: Arc::new(OrderEngine::new(carts, products, orders, events, config.pricing.clone(), config.split_policy)),
        identity: Arc::new(JwtIdentityProvider::new(&config.jwt_secret)),
    };
    let app = api::router(state, config.request_timeout);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(split_policy = ?config.split_policy, "marketplace orders listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
