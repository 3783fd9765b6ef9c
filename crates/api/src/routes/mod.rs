//! Route handlers and shared application state.

pub mod cart;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod wallet;

use checkout::{CartService, InMemoryGateway, OrderPipeline, PaymentReconciler, WalletService};
use common::{OrderId, UserId};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub cart: CartService<S>,
    pub pipeline: OrderPipeline<S>,
    pub payments: PaymentReconciler<S, InMemoryGateway>,
    pub wallet: WalletService<S>,
    /// Store backend label reported by `/health`.
    pub backend: &'static str,
}

pub(crate) fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid user_id: {e}")))?;
    Ok(UserId::from_uuid(uuid))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
