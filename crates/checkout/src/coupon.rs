//! Coupon validation against an order subtotal.

use std::sync::Arc;

use chrono::Utc;
use common::UserId;
use domain::{CouponError, Money};
use store::Store;

use crate::error::Result;

/// A successfully validated coupon, ready to record against an order.
#[derive(Debug, Clone)]
pub struct AppliedCoupon {
    pub coupon_id: i32,
    pub code: String,
    /// Discount amount, never exceeding the subtotal it was computed
    /// against.
    pub discount: Money,
}

/// Validates coupon codes and computes their discount.
pub struct CouponEvaluator<S> {
    store: Arc<S>,
}

impl<S: Store> CouponEvaluator<S> {
    /// Creates a new evaluator over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Validates `code` for a user and subtotal.
    ///
    /// Fails with the coupon taxonomy (`NotFound`, `Expired`,
    /// `BelowMinimum`, `AlreadyUsed`); on success the discount is
    /// monotonic — applying it can never drive a price negative.
    pub async fn validate(
        &self,
        code: &str,
        subtotal: Money,
        user: UserId,
    ) -> Result<AppliedCoupon> {
        let coupon = self
            .store
            .coupon_by_code(code)
            .await?
            .ok_or(CouponError::NotFound)?;

        let already_used = self.store.coupon_used_by(coupon.id, user).await?;
        let discount = coupon.validate(subtotal, Utc::now(), already_used)?;

        Ok(AppliedCoupon {
            coupon_id: coupon.id,
            code: coupon.code,
            discount,
        })
    }
}
