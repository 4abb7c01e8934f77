//! Postgres-backed repositories.
//!
//! Stock moves with single conditional `UPDATE`s, carts are serialized with a row lock
//! on `carts`, and orders are JSONB documents guarded by a `version` column.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CartMutation, CartRepository, OrderRepository, ProductRepository};
use crate::domain::aggregates::{Cart, CartLine, Order, Product};
use crate::domain::value_objects::{CustomerId, OrderId, ProductId, Quantity, SellerId};
use crate::error::{Error, RepositoryError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(sqlx::Error::Migrate(Box::new(e))))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price: Decimal,
    stock: i32,
    seller_id: Uuid,
    rating: Decimal,
    num_reviews: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(r: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(r.stock).map_err(|_| RepositoryError::Corrupt(format!("product {} has negative stock", r.id)))?;
        let num_reviews = u32::try_from(r.num_reviews).unwrap_or(0);
        Ok(Product {
            id: r.id, name: r.name, price: r.price, stock, seller_id: r.seller_id,
            rating: r.rating, num_reviews, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, name, price, stock, seller_id, rating, num_reviews, created_at, updated_at";

#[async_trait]
impl ProductRepository for PgStore {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn decrement_stock(&self, id: ProductId, qty: u32) -> Result<bool, RepositoryError> {
        let Ok(qty) = i32::try_from(qty) else { return Ok(false) };
        let result = sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2")
            .bind(id)
            .bind(qty)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn restore_stock(&self, id: ProductId, qty: u32) -> Result<bool, RepositoryError> {
        let qty = i32::try_from(qty).map_err(|_| RepositoryError::Corrupt(format!("restore quantity {qty} out of range")))?;
        let result = sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(qty)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

async fn load_lines<'c, E>(executor: E, customer: CustomerId) -> Result<Vec<CartLine>, RepositoryError>
where
    E: sqlx::PgExecutor<'c>,
{
    let rows: Vec<(Uuid, i32)> = sqlx::query_as("SELECT product_id, quantity FROM cart_items WHERE customer_id = $1 ORDER BY position")
        .bind(customer)
        .fetch_all(executor)
        .await?;
    rows.into_iter()
        .map(|(product, quantity)| {
            u32::try_from(quantity)
                .ok()
                .and_then(|q| Quantity::new(q).ok())
                .map(|quantity| CartLine { product, quantity })
                .ok_or_else(|| RepositoryError::Corrupt(format!("cart line {product} has quantity {quantity}")))
        })
        .collect()
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find(&self, customer: CustomerId) -> Result<Option<Cart>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let header: Option<(DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as("SELECT created_at, updated_at FROM carts WHERE customer_id = $1")
            .bind(customer)
            .fetch_optional(&mut *tx)
            .await?;
        let Some((created_at, updated_at)) = header else { return Ok(None) };
        let lines = load_lines(&mut *tx, customer).await?;
        tx.commit().await?;
        Cart::from_parts(customer, lines, created_at, updated_at)
            .map(Some)
            .map_err(|e| RepositoryError::Corrupt(format!("cart of {customer}: {e}")))
    }

    async fn modify(&self, customer: CustomerId, create: bool, mutation: CartMutation) -> Result<Option<Cart>, Error> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        if create {
            sqlx::query("INSERT INTO carts (customer_id, created_at, updated_at) VALUES ($1, NOW(), NOW()) ON CONFLICT (customer_id) DO NOTHING")
                .bind(customer)
                .execute(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;
        }

        // Row lock: concurrent modifications of the same cart queue up here.
        let header: Option<(DateTime<Utc>,)> = sqlx::query_as("SELECT created_at FROM carts WHERE customer_id = $1 FOR UPDATE")
            .bind(customer)
            .fetch_optional(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        let Some((created_at,)) = header else { return Ok(None) };

        let lines = load_lines(&mut *tx, customer).await?;
        let mut cart = Cart::from_parts(customer, lines, created_at, Utc::now())
            .map_err(|e| RepositoryError::Corrupt(format!("cart of {customer}: {e}")))?;
        // Dropping `tx` on error rolls back, including a cart row created above.
        mutation(&mut cart)?;

        sqlx::query("DELETE FROM cart_items WHERE customer_id = $1")
            .bind(customer)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;
        for (position, line) in cart.items().iter().enumerate() {
            let quantity = i32::try_from(line.quantity.value())
                .map_err(|_| Error::validation(format!("Quantity {} is too large", line.quantity)))?;
            sqlx::query("INSERT INTO cart_items (customer_id, product_id, quantity, position) VALUES ($1, $2, $3, $4)")
                .bind(customer)
                .bind(line.product)
                .bind(quantity)
                .bind(position as i32)
                .execute(&mut *tx)
                .await
                .map_err(RepositoryError::from)?;
        }
        sqlx::query("UPDATE carts SET updated_at = $2 WHERE customer_id = $1")
            .bind(customer)
            .bind(cart.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        tx.commit().await.map_err(RepositoryError::from)?;
        Ok(Some(cart))
    }
}

fn version_param(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version).map_err(|_| RepositoryError::Corrupt(format!("order version {version} out of range")))
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, seller_id, status, version, document, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id())
        .bind(order.customer_id())
        .bind(order.seller_id())
        .bind(order.status().as_str())
        .bind(version_param(order.version())?)
        .bind(Json(order))
        .bind(order.created_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn list_by_customer(&self, customer: CustomerId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE customer_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(customer)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }

    async fn list_by_seller(&self, seller: SellerId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE seller_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(seller)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }

    async fn replace(&self, order: &Order, expected_version: u64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2, version = $3, document = $4 WHERE id = $1 AND version = $5")
            .bind(order.id())
            .bind(order.status().as_str())
            .bind(version_param(order.version())?)
            .bind(Json(order))
            .bind(version_param(expected_version)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
