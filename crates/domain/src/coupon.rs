//! Coupon discount rules and validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// How a coupon reduces an order subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscountRule {
    /// Percentage of the subtotal, 0–100.
    Percent(u32),
    /// Flat amount off, capped at the subtotal.
    Flat(Money),
}

/// A discount coupon with its validity constraints.
///
/// Every coupon is single-use per user; application is recorded against
/// the order at placement and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub rule: DiscountRule,
    /// Minimum order subtotal for the coupon to apply.
    pub min_order_value: Money,
    /// Expiry instant; `None` never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Why a coupon failed validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CouponError {
    /// No coupon exists with the supplied code.
    #[error("unknown coupon code")]
    NotFound,

    /// The coupon expired before the order was placed.
    #[error("coupon has expired")]
    Expired,

    /// The order subtotal is below the coupon's minimum.
    #[error("order subtotal {subtotal} is below the coupon minimum {minimum}")]
    BelowMinimum { minimum: Money, subtotal: Money },

    /// The user has already redeemed this coupon.
    #[error("coupon already used")]
    AlreadyUsed,
}

impl Coupon {
    /// Computes the discount for a subtotal, capped at the subtotal.
    ///
    /// The cap makes discount application monotonic: a final price is
    /// never negative.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.rule {
            DiscountRule::Percent(pct) => {
                Money::from_cents(subtotal.cents() * i64::from(pct.min(100)) / 100)
            }
            DiscountRule::Flat(amount) => amount,
        };
        raw.min(subtotal)
    }

    /// Validates the coupon against an order and returns the discount.
    ///
    /// `already_used` is the store's answer to whether this user has
    /// redeemed the coupon before.
    pub fn validate(
        &self,
        subtotal: Money,
        now: DateTime<Utc>,
        already_used: bool,
    ) -> Result<Money, CouponError> {
        if let Some(expires_at) = self.expires_at
            && now >= expires_at
        {
            return Err(CouponError::Expired);
        }
        if subtotal < self.min_order_value {
            return Err(CouponError::BelowMinimum {
                minimum: self.min_order_value,
                subtotal,
            });
        }
        if already_used {
            return Err(CouponError::AlreadyUsed);
        }
        Ok(self.discount_for(subtotal))
    }
}
