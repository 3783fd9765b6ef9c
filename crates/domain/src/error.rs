//! Domain error types.

use thiserror::Error;

use crate::status::OrderStatus;

/// Errors raised by the order entity and its state machine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The requested status transition is not allowed.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// An order must carry at least one line item.
    #[error("order has no line items")]
    NoLineItems,

    /// A line item quantity must be at least one.
    #[error("invalid quantity {quantity} for {sku}")]
    InvalidQuantity { sku: common::Sku, quantity: u32 },
}
