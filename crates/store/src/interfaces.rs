//! Store traits for the checkout core's collaborators.
//!
//! One trait per collaborator of the order workflow. All implementations
//! must be thread-safe (Send + Sync); cross-entity consistency is the
//! store's responsibility, enforced through its transaction discipline
//! rather than in-process locks held by callers.

use async_trait::async_trait;
use common::{OrderId, Sku, UserId};
use domain::{CartLine, CatalogProduct, Coupon, Money, Order, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::Result;

/// The payment row linked 1:1 to an order.
///
/// `gateway_payment_id` is set only on successful capture; the `paid`
/// flag transitions false→true exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub order_id: OrderId,
    pub gateway_session_id: String,
    pub gateway_payment_id: Option<String>,
    pub paid: bool,
}

/// Read-only access to the product catalog.
///
/// The catalog itself is maintained outside this system; the checkout
/// core only joins against it for names, brands, categories and current
/// prices.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up a single product by SKU.
    async fn product(&self, sku: &Sku) -> Result<Option<CatalogProduct>>;

    /// Batched lookup for several SKUs in one round trip.
    ///
    /// Missing SKUs are simply absent from the result; callers decide
    /// whether that is an error.
    async fn products(&self, skus: &[Sku]) -> Result<Vec<CatalogProduct>>;
}

/// Per-SKU stock ledger with a floor at zero.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Returns current stock for a SKU.
    async fn stock(&self, sku: &Sku) -> Result<u32>;

    /// Decrements stock, failing with `InsufficientStock` if the SKU
    /// would go below zero. Nothing is applied on failure.
    async fn decrement_stock(&self, sku: &Sku, qty: u32) -> Result<()>;

    /// Increments stock for a SKU.
    async fn increment_stock(&self, sku: &Sku, qty: u32) -> Result<()>;

    /// All-or-nothing decrement across several SKUs.
    ///
    /// Either every line is applied or none is; concurrent decrements of
    /// the same SKU serialize inside the store.
    async fn decrement_all(&self, lines: &[(Sku, u32)]) -> Result<()>;

    /// Increments stock for several SKUs (stock restoration).
    async fn increment_all(&self, lines: &[(Sku, u32)]) -> Result<()>;
}

/// A user's pending cart line items.
///
/// Carts are created lazily on first insert and cleared, not deleted,
/// at order placement.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Returns the cart lines in insertion order.
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>>;

    /// Returns true if the SKU is already in the user's cart.
    async fn cart_contains(&self, user: UserId, sku: &Sku) -> Result<bool>;

    /// Inserts a line item, failing with `AlreadyExists` on a duplicate
    /// SKU.
    async fn add_cart_line(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()>;

    /// Removes a line item, failing with `NotFound` if absent.
    async fn remove_cart_line(&self, user: UserId, sku: &Sku) -> Result<()>;

    /// Overwrites a line item quantity, failing with `NotFound` if
    /// absent.
    async fn set_cart_quantity(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()>;

    /// Removes every line from the user's cart.
    async fn clear_cart(&self, user: UserId) -> Result<()>;
}

/// Order persistence. Orders are never hard-deleted.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a newly placed order with its line items.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Loads an order by id.
    async fn order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists a user's orders, newest first.
    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>>;

    /// Status-guarded transition: atomically moves the order to `to`
    /// if its current status is in `allowed_from`, returning the
    /// previous status.
    ///
    /// Fails with `StatusConflict` carrying the actual status otherwise.
    /// This compare-and-set is the serialization point between
    /// cancellation and payment confirmation.
    async fn transition_status(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<OrderStatus>;

    /// Status-guarded transition that also settles a paid order's
    /// refund.
    ///
    /// Applies the same compare-and-set as `transition_status` and, when
    /// the order is paid, credits its final price back to the owner's
    /// wallet and restores stock for every line in the same atomic
    /// commit. Inventory rows that no longer exist are skipped.
    ///
    /// Returns true if a refund was settled.
    async fn transition_with_refund(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool>;
}

/// Payment records and the atomic capture commit.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Creates or refreshes the payment record with a gateway session
    /// id. Fails with `AlreadyCaptured` if payment was already taken.
    async fn upsert_payment_session(&self, order_id: OrderId, session_id: &str) -> Result<()>;

    /// Loads the payment record for an order.
    async fn payment(&self, order_id: OrderId) -> Result<Option<PaymentRecord>>;

    /// Atomically records the gateway payment id, flips the paid flag,
    /// and decrements stock for every ordered line.
    ///
    /// This is the single commit point of the deferred-decrement policy:
    /// - `AlreadyCaptured` if the order was already paid (idempotent
    ///   re-delivery guard; no state change),
    /// - `StatusConflict` if the order was canceled in the meantime,
    /// - `InsufficientStock` if any decrement would go below zero.
    ///
    /// On any failure nothing is applied.
    async fn confirm_capture(
        &self,
        order_id: OrderId,
        gateway_payment_id: &str,
        decrements: &[(Sku, u32)],
    ) -> Result<()>;
}

/// Per-user credit balance, usable as refund target and payment source.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// Returns the balance; a missing wallet reads as zero.
    async fn wallet_balance(&self, user: UserId) -> Result<Money>;

    /// Adds to the balance (creating the wallet if needed) and returns
    /// the new balance.
    async fn credit_wallet(&self, user: UserId, amount: Money) -> Result<Money>;

    /// Subtracts from the balance, failing with `InsufficientFunds` if
    /// the balance is too low. Returns the new balance.
    async fn debit_wallet(&self, user: UserId, amount: Money) -> Result<Money>;
}

/// Coupon definitions and per-user usage tracking.
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Looks up a coupon by its code.
    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>>;

    /// Returns true if the user has already redeemed the coupon.
    async fn coupon_used_by(&self, coupon_id: i32, user: UserId) -> Result<bool>;

    /// Records a redemption against an order.
    async fn record_coupon_use(
        &self,
        coupon_id: i32,
        user: UserId,
        order_id: OrderId,
    ) -> Result<()>;
}

/// The full store surface the orchestration layer works against.
///
/// Blanket-implemented for anything that implements every collaborator
/// trait, so `MemoryStore` and `PgStore` qualify automatically.
pub trait Store:
    CatalogStore + InventoryStore + CartStore + OrderStore + PaymentStore + WalletStore + CouponStore
{
}

impl<T> Store for T where
    T: CatalogStore
        + InventoryStore
        + CartStore
        + OrderStore
        + PaymentStore
        + WalletStore
        + CouponStore
{
}
