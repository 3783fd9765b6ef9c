//! Orchestration layer for the cart → checkout → order → payment
//! workflow.
//!
//! The services here are generic over the `store::Store` supertrait and
//! the `PaymentGateway` seam:
//! - [`CartService`] — pending line items prior to order placement
//! - [`CouponEvaluator`] — discount validation against an order subtotal
//! - [`OrderPipeline`] — converts a cart into a priced, stateful order
//!   and drives its lifecycle (cancel, return, operator transitions)
//! - [`PaymentReconciler`] — gateway session creation and the idempotent
//!   capture-confirmation callback
//! - [`WalletService`] — per-user credit ledger primitives
//!
//! Stock is decremented at payment confirmation, not at placement
//! (deferred-decrement policy): an unpaid or abandoned order never holds
//! stock, at the cost of a capture-time `StockExhausted` failure mode.

pub mod cart;
pub mod coupon;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod reconciler;
pub mod wallet;

pub use cart::CartService;
pub use coupon::{AppliedCoupon, CouponEvaluator};
pub use error::CheckoutError;
pub use gateway::{GatewayError, GatewaySession, InMemoryGateway, PaymentGateway, CURRENCY};
pub use pipeline::{OrderPipeline, PlaceOrder};
pub use reconciler::{CaptureSession, PaymentReconciler};
pub use wallet::WalletService;
