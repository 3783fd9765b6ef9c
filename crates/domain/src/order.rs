//! The order entity and its immutable line items.

use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, PaymentMethodId, Sku, UserId};
use serde::{Deserialize, Serialize};

use crate::cart::CartSnapshot;
use crate::error::OrderError;
use crate::money::Money;
use crate::status::{OrderStatus, PaymentStatus};

/// A line item on a placed order.
///
/// The unit price is the catalog price frozen at placement time; it is
/// never re-read from the live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub sku: Sku,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    /// Creates a new order line.
    pub fn new(
        sku: impl Into<Sku>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            sku: sku.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the extended price of this line.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// An order created from a cart snapshot at checkout.
///
/// Line items and prices are immutable once placed; only the status
/// fields mutate, and only through the store's status-guarded updates.
/// Orders are retained indefinitely and never hard-deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub payment_method_id: PaymentMethodId,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    /// Coupon discount applied at placement; zero when no coupon.
    pub discount: Money,
    pub coupon_code: Option<String>,
    pub final_price: Money,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a newly placed, unpaid order from frozen line items.
    ///
    /// The subtotal is computed from the lines; the final price applies
    /// the discount with a floor at zero.
    pub fn place(
        user_id: UserId,
        address_id: AddressId,
        payment_method_id: PaymentMethodId,
        lines: Vec<OrderLine>,
        discount: Money,
        coupon_code: Option<String>,
    ) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::NoLineItems);
        }
        for line in &lines {
            if line.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    sku: line.sku.clone(),
                    quantity: line.quantity,
                });
            }
        }

        let subtotal = lines
            .iter()
            .fold(Money::zero(), |acc, line| acc.add(line.line_total()));

        Ok(Self {
            id: OrderId::new(),
            user_id,
            address_id,
            payment_method_id,
            lines,
            subtotal,
            discount,
            coupon_code,
            final_price: subtotal.saturating_sub(discount),
            status: OrderStatus::Placed,
            payment_status: PaymentStatus::NotPaid,
            created_at: Utc::now(),
        })
    }

    /// Freezes a cart snapshot's current prices into order lines.
    pub fn lines_from_snapshot(snapshot: &CartSnapshot) -> Vec<OrderLine> {
        snapshot
            .items
            .iter()
            .map(|item| {
                OrderLine::new(
                    item.sku.clone(),
                    item.name.clone(),
                    item.quantity,
                    item.unit_price,
                )
            })
            .collect()
    }

    /// Returns true if the order belongs to the given user.
    pub fn owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    /// Returns true if payment has been captured.
    pub fn is_paid(&self) -> bool {
        self.payment_status.is_paid()
    }

    /// Returns (sku, quantity) pairs for stock adjustment.
    pub fn stock_adjustments(&self) -> Vec<(Sku, u32)> {
        self.lines
            .iter()
            .map(|line| (line.sku.clone(), line.quantity))
            .collect()
    }
}
