//! Persistence layer for the checkout core.
//!
//! Exposes one trait per collaborator (catalog, inventory, cart, order,
//! payment, wallet, coupon) plus the `Store` supertrait the orchestration
//! layer is generic over, with two implementations:
//! - [`MemoryStore`] — a single-lock in-memory store for tests and demos
//! - [`PgStore`] — PostgreSQL via sqlx, using row-level locks and guarded
//!   updates to uphold the stock and payment invariants

pub mod error;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use error::{Result, StoreError};
pub use interfaces::{
    CartStore, CatalogStore, CouponStore, InventoryStore, OrderStore, PaymentRecord, PaymentStore,
    Store, WalletStore,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;
