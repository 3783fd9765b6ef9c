//! Cart operations prior to order placement.

use std::collections::HashMap;
use std::sync::Arc;

use common::{Sku, UserId};
use domain::{CartItemView, CartSnapshot};
use store::Store;

use crate::error::{CheckoutError, Result};

/// Upper bound on a single line's quantity. Quantities are persisted as
/// 32-bit integers.
const MAX_LINE_QUANTITY: u32 = 1_000_000;

/// Service for a user's pending cart line items.
///
/// Carts hold (SKU, quantity) pairs only; prices are always joined from
/// the live catalog at view time and frozen only when the pipeline
/// places the order.
pub struct CartService<S> {
    store: Arc<S>,
}

impl<S: Store> CartService<S> {
    /// Creates a new cart service over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Adds a line item to the user's cart.
    ///
    /// The cart is created lazily on first add. Re-adding a SKU fails
    /// with `DuplicateItem`: quantities are never merged, the line must
    /// be removed first.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()> {
        if sku.is_empty() {
            return Err(CheckoutError::InvalidArgument("empty sku".to_string()));
        }
        check_quantity(qty)?;
        if self.store.product(sku).await?.is_none() {
            return Err(CheckoutError::NotFound(format!("product {sku}")));
        }
        if self.store.cart_contains(user, sku).await? {
            return Err(CheckoutError::DuplicateItem { sku: sku.clone() });
        }
        self.store.add_cart_line(user, sku, qty).await?;
        tracing::debug!(%user, %sku, qty, "cart line added");
        Ok(())
    }

    /// Removes a line item from the user's cart.
    ///
    /// Guards against stale references: the SKU must still exist in the
    /// catalog before the cart mutation is attempted.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user: UserId, sku: &Sku) -> Result<()> {
        if self.store.product(sku).await?.is_none() {
            return Err(CheckoutError::NotFound(format!("product {sku}")));
        }
        self.store.remove_cart_line(user, sku).await?;
        Ok(())
    }

    /// Overwrites the quantity of an existing line item.
    ///
    /// Fails with `OutOfStock` if the requested quantity exceeds current
    /// inventory stock.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()> {
        check_quantity(qty)?;
        let available = self.store.stock(sku).await?;
        if qty > available {
            return Err(CheckoutError::OutOfStock {
                sku: sku.clone(),
                requested: qty,
                available,
            });
        }
        self.store.set_cart_quantity(user, sku, qty).await?;
        Ok(())
    }

    /// Produces an ordered view of the cart with current catalog prices.
    ///
    /// Enrichment (name, brand, category, price) is resolved through a
    /// single batched catalog lookup, not a query per line.
    pub async fn snapshot(&self, user: UserId) -> Result<CartSnapshot> {
        let lines = self.store.cart_lines(user).await?;
        if lines.is_empty() {
            return Ok(CartSnapshot::new(vec![]));
        }

        let skus: Vec<Sku> = lines.iter().map(|line| line.sku.clone()).collect();
        let products = self.store.products(&skus).await?;
        let by_sku: HashMap<&Sku, _> = products.iter().map(|p| (&p.sku, p)).collect();

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = by_sku
                .get(&line.sku)
                .ok_or_else(|| CheckoutError::NotFound(format!("product {}", line.sku)))?;
            items.push(CartItemView::from_line(line, product));
        }
        Ok(CartSnapshot::new(items))
    }
}

fn check_quantity(qty: u32) -> Result<()> {
    if qty == 0 {
        return Err(CheckoutError::InvalidArgument(
            "quantity must be at least 1".to_string(),
        ));
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(CheckoutError::InvalidArgument(format!(
            "quantity {qty} exceeds the maximum of {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}
