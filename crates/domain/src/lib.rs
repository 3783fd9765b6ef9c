//! Domain layer for the checkout core.
//!
//! This crate holds the pure domain model shared by the store and
//! orchestration layers:
//! - `Money` value type (cent-denominated, never negative prices)
//! - `OrderStatus` / `PaymentStatus` state machines
//! - `Order` and its immutable line items with placement-time prices
//! - Cart line and enriched snapshot views
//! - `Coupon` discount rules and validation
//!
//! Nothing in here performs I/O; persistence and orchestration live in
//! the `store` and `checkout` crates.

pub mod cart;
pub mod coupon;
pub mod error;
pub mod money;
pub mod order;
pub mod status;

pub use cart::{CartItemView, CartLine, CartSnapshot, CatalogProduct};
pub use coupon::{Coupon, CouponError, DiscountRule};
pub use error::OrderError;
pub use money::Money;
pub use order::{Order, OrderLine};
pub use status::{OrderStatus, PaymentStatus};
