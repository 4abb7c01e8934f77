//! Cart engine: line maintenance and live pricing.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::{Cart, Product};
use crate::domain::pricing::{Pricing, PricingPolicy};
use crate::domain::value_objects::{CustomerId, ProductId, Quantity, SellerId};
use crate::error::{Error, Result};
use crate::repository::{CartRepository, ProductRepository};

/// Cart as returned to its owner, with products resolved and prices derived.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub customer_id: CustomerId,
    pub items: Vec<CartLineView>,
    #[serde(flatten)]
    pub pricing: Pricing,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub product_id: ProductId,
    pub quantity: u32,
    /// `None` when the catalog no longer has the product; the line then adds nothing to the price.
    pub product: Option<ProductSummary>,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
    pub seller_id: SellerId,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self { name: p.name.clone(), price: p.price, stock: p.stock, seller_id: p.seller_id }
    }
}

impl CartView {
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

pub struct CartEngine {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
    pricing: PricingPolicy,
}

impl CartEngine {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>, pricing: PricingPolicy) -> Self {
        Self { carts, products, pricing }
    }

    /// Never fails on a missing cart; that is an empty cart.
    pub async fn get_cart(&self, customer: CustomerId) -> Result<CartView> {
        let cart = self.carts.find(customer).await?;
        self.view(customer, cart.as_ref()).await
    }

    #[tracing::instrument(skip_all, fields(customer_id = %customer, product_id = %product))]
    pub async fn add_line(&self, customer: CustomerId, product: ProductId, quantity: u32) -> Result<CartView> {
        let quantity = Quantity::new(quantity)?;
        if self.products.find(product).await?.is_none() {
            return Err(Error::not_found("Product not found"));
        }
        let cart = self
            .carts
            .modify(customer, true, Box::new(move |cart: &mut Cart| -> Result<()> { Ok(cart.add_line(product, quantity)?) }))
            .await?;
        tracing::debug!(quantity = quantity.value(), "cart line added");
        self.view(customer, cart.as_ref()).await
    }

    /// Replaces the quantity; zero removes the line.
    #[tracing::instrument(skip_all, fields(customer_id = %customer, product_id = %product))]
    pub async fn update_line(&self, customer: CustomerId, product: ProductId, quantity: u32) -> Result<CartView> {
        let cart = self
            .carts
            .modify(customer, false, Box::new(move |cart: &mut Cart| -> Result<()> { Ok(cart.update_line(product, quantity)?) }))
            .await?
            .ok_or_else(|| Error::not_found("Cart doesn't exist"))?;
        tracing::debug!(quantity, "cart line updated");
        self.view(customer, Some(&cart)).await
    }

    #[tracing::instrument(skip_all, fields(customer_id = %customer, product_id = %product))]
    pub async fn remove_line(&self, customer: CustomerId, product: ProductId) -> Result<CartView> {
        let cart = self
            .carts
            .modify(customer, false, Box::new(move |cart: &mut Cart| -> Result<()> { Ok(cart.remove_line(product)?) }))
            .await?
            .ok_or_else(|| Error::not_found("Cart doesn't exist"))?;
        tracing::debug!("cart line removed");
        self.view(customer, Some(&cart)).await
    }

    async fn view(&self, customer: CustomerId, cart: Option<&Cart>) -> Result<CartView> {
        let Some(cart) = cart else {
            return Ok(CartView { customer_id: customer, items: vec![], pricing: Pricing::default(), created_at: None, updated_at: None });
        };
        let ids: Vec<ProductId> = cart.items().iter().map(|l| l.product).collect();
        let catalog: HashMap<ProductId, Product> = self.products.find_many(&ids).await?.into_iter().map(|p| (p.id, p)).collect();

        let items: Vec<CartLineView> = cart
            .items()
            .iter()
            .map(|line| {
                let product = catalog.get(&line.product);
                CartLineView {
                    product_id: line.product,
                    quantity: line.quantity.value(),
                    product: product.map(ProductSummary::from),
                    line_total: product.map_or(Decimal::ZERO, |p| p.price * Decimal::from(line.quantity.value())),
                }
            })
            .collect();

        let priced: Vec<(Decimal, u32)> = cart
            .items()
            .iter()
            .filter_map(|line| catalog.get(&line.product).map(|p| (p.price, line.quantity.value())))
            .collect();
        let pricing = if priced.is_empty() { Pricing::default() } else { self.pricing.quote(priced) };

        Ok(CartView { customer_id: customer, items, pricing, created_at: Some(cart.created_at()), updated_at: Some(cart.updated_at()) })
    }
}
