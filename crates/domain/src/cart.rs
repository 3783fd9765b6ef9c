//! Cart lines and enriched snapshot views.

use common::Sku;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// A pending line item in a user's cart.
///
/// Carries no price: cart contents are priced against the live catalog
/// when viewed, and frozen only at order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub sku: Sku,
    pub quantity: u32,
}

impl CartLine {
    /// Creates a new cart line.
    pub fn new(sku: impl Into<Sku>, quantity: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity,
        }
    }
}

/// A catalog product as seen by the checkout core.
///
/// The catalog itself (CRUD, categories, images) lives outside this
/// system; this is the read-side view the cart and pipeline join
/// against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub sku: Sku,
    pub name: String,
    pub brand: String,
    pub category: String,
    /// Current list price. Distinct from prices frozen on placed orders.
    pub price: Money,
}

/// A cart line joined with live catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemView {
    pub sku: Sku,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub quantity: u32,
    /// Current catalog unit price at view time.
    pub unit_price: Money,
    pub line_total: Money,
}

impl CartItemView {
    /// Joins a cart line with its catalog product.
    pub fn from_line(line: &CartLine, product: &CatalogProduct) -> Self {
        Self {
            sku: line.sku.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            quantity: line.quantity,
            unit_price: product.price,
            line_total: product.price.multiply(line.quantity),
        }
    }
}

/// An ordered view of a user's cart with current catalog prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub items: Vec<CartItemView>,
    pub subtotal: Money,
}

impl CartSnapshot {
    /// Builds a snapshot from enriched items, computing the subtotal.
    pub fn new(items: Vec<CartItemView>) -> Self {
        let subtotal = items
            .iter()
            .fold(Money::zero(), |acc, item| acc.add(item.line_total));
        Self { items, subtotal }
    }

    /// Returns true if the cart holds no line items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
