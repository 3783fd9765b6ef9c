//! Shared identifier types used across the checkout workspace.

pub mod types;

pub use types::{AddressId, OrderId, PaymentMethodId, Sku, UserId};
