use common::{OrderId, Sku};
use domain::{Money, OrderStatus};
use thiserror::Error;

/// Errors that can occur when interacting with the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// An entity with the same key already exists.
    #[error("{entity} already exists: {key}")]
    AlreadyExists { entity: &'static str, key: String },

    /// A stock decrement would drive the SKU below zero.
    /// Nothing was applied.
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// A status-guarded update lost to a concurrent transition.
    #[error("conflicting status for order {order_id}: currently {actual}")]
    StatusConflict {
        order_id: OrderId,
        actual: OrderStatus,
    },

    /// Payment for the order has already been captured.
    #[error("payment for order {0} already captured")]
    AlreadyCaptured(OrderId),

    /// A wallet debit exceeds the current balance.
    #[error("insufficient wallet funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Money, requested: Money },

    /// A stored value could not be decoded into its domain type.
    #[error("corrupt stored value for {entity} {key}: {reason}")]
    Corrupt {
        entity: &'static str,
        key: String,
        reason: String,
    },

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Shorthand for a `NotFound` with a displayable key.
    pub fn not_found(entity: &'static str, key: impl std::fmt::Display) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
