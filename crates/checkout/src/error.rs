//! The checkout error taxonomy.

use common::{OrderId, Sku};
use domain::{CouponError, Money, OrderStatus};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the checkout services.
///
/// Every failure is a typed variant so the presentation layer can map
/// them to distinct user-facing responses. Invariant violations
/// (`OutOfStock`, `StockExhausted`, `AlreadyPaid`, ...) represent real
/// conflicts the caller must resolve and are never retried
/// automatically; only `Unavailable` is safe to retry.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed input (empty SKU, zero quantity, invalid reference).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The entity exists but does not belong to the caller.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Order placement requires a non-empty cart.
    #[error("cart is empty")]
    EmptyCart,

    /// The SKU is already in the cart; quantities are not merged.
    #[error("{sku} is already in the cart")]
    DuplicateItem { sku: Sku },

    /// A requested quantity exceeds current stock (validation read).
    #[error("{sku} is out of stock: requested {requested}, available {available}")]
    OutOfStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// Stock ran out between placement and capture
    /// (deferred-decrement failure mode).
    #[error("stock exhausted for {sku}")]
    StockExhausted { sku: Sku },

    /// The supplied coupon failed validation.
    #[error("invalid coupon: {0}")]
    Coupon(#[from] CouponError),

    /// Payment for the order was already captured.
    #[error("order {0} is already paid")]
    AlreadyPaid(OrderId),

    /// A wallet debit exceeds the balance.
    #[error("insufficient wallet funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    /// The order's current status does not permit the operation.
    #[error("order {order_id} is in status {status}")]
    InvalidState {
        order_id: OrderId,
        status: OrderStatus,
    },

    /// The requested status transition is not in the state machine.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The external payment gateway rejected or failed the call.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    /// Transient store failure; safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => {
                CheckoutError::NotFound(format!("{entity} {key}"))
            }
            StoreError::AlreadyExists { entity, key } => {
                CheckoutError::InvalidArgument(format!("{entity} {key} already exists"))
            }
            StoreError::InsufficientStock { sku, .. } => CheckoutError::StockExhausted { sku },
            StoreError::StatusConflict { order_id, actual } => CheckoutError::InvalidState {
                order_id,
                status: actual,
            },
            StoreError::AlreadyCaptured(order_id) => CheckoutError::AlreadyPaid(order_id),
            StoreError::InsufficientFunds { balance, requested } => {
                CheckoutError::InsufficientFunds { balance, requested }
            }
            StoreError::Corrupt { .. } => CheckoutError::Unavailable(err.to_string()),
            StoreError::Database(_) => CheckoutError::Unavailable(err.to_string()),
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
