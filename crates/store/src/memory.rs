//! In-memory store implementation for tests and demos.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{OrderId, Sku, UserId};
use domain::{CartLine, CatalogProduct, Coupon, Money, Order, OrderStatus, PaymentStatus};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    interfaces::{
        CartStore, CatalogStore, CouponStore, InventoryStore, OrderStore, PaymentRecord,
        PaymentStore, WalletStore,
    },
};

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<Sku, CatalogProduct>,
    stock: HashMap<Sku, u32>,
    carts: HashMap<UserId, Vec<CartLine>>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<OrderId, PaymentRecord>,
    wallets: HashMap<UserId, Money>,
    coupons: HashMap<String, Coupon>,
    coupon_uses: HashMap<(i32, UserId), OrderId>,
}

impl Inner {
    fn available(&self, sku: &Sku) -> Result<u32> {
        self.stock
            .get(sku)
            .copied()
            .ok_or_else(|| StoreError::not_found("inventory", sku))
    }

    /// Validates every decrement before applying any of them.
    fn apply_decrements(&mut self, lines: &[(Sku, u32)]) -> Result<()> {
        for (sku, qty) in lines {
            let available = self.available(sku)?;
            if available < *qty {
                return Err(StoreError::InsufficientStock {
                    sku: sku.clone(),
                    requested: *qty,
                    available,
                });
            }
        }
        for (sku, qty) in lines {
            if let Some(stock) = self.stock.get_mut(sku) {
                *stock -= qty;
            }
        }
        Ok(())
    }
}

/// In-memory store holding every table behind a single lock.
///
/// The one lock plays the role of the database's transaction discipline:
/// each operation observes and mutates a consistent snapshot, which makes
/// the cross-entity atomicity of `confirm_capture` trivial. Provides the
/// same interface as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a catalog product together with its stock level.
    pub async fn seed_product(&self, product: CatalogProduct, stock: u32) {
        let mut inner = self.inner.write().await;
        inner.stock.insert(product.sku.clone(), stock);
        inner.products.insert(product.sku.clone(), product);
    }

    /// Seeds a coupon definition.
    pub async fn seed_coupon(&self, coupon: Coupon) {
        let mut inner = self.inner.write().await;
        inner.coupons.insert(coupon.code.clone(), coupon);
    }

    /// Seeds a wallet balance.
    pub async fn seed_wallet(&self, user: UserId, balance: Money) {
        self.inner.write().await.wallets.insert(user, balance);
    }

    /// Removes a product from the catalog, leaving carts untouched
    /// (stale-reference scenarios in tests).
    pub async fn remove_product(&self, sku: &Sku) {
        let mut inner = self.inner.write().await;
        inner.products.remove(sku);
        inner.stock.remove(sku);
    }

    /// Returns the number of persisted orders.
    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn product(&self, sku: &Sku) -> Result<Option<CatalogProduct>> {
        Ok(self.inner.read().await.products.get(sku).cloned())
    }

    async fn products(&self, skus: &[Sku]) -> Result<Vec<CatalogProduct>> {
        let inner = self.inner.read().await;
        Ok(skus
            .iter()
            .filter_map(|sku| inner.products.get(sku).cloned())
            .collect())
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn stock(&self, sku: &Sku) -> Result<u32> {
        self.inner.read().await.available(sku)
    }

    async fn decrement_stock(&self, sku: &Sku, qty: u32) -> Result<()> {
        self.inner
            .write()
            .await
            .apply_decrements(&[(sku.clone(), qty)])
    }

    async fn increment_stock(&self, sku: &Sku, qty: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let stock = inner
            .stock
            .get_mut(sku)
            .ok_or_else(|| StoreError::not_found("inventory", sku))?;
        *stock += qty;
        Ok(())
    }

    async fn decrement_all(&self, lines: &[(Sku, u32)]) -> Result<()> {
        self.inner.write().await.apply_decrements(lines)
    }

    async fn increment_all(&self, lines: &[(Sku, u32)]) -> Result<()> {
        let mut inner = self.inner.write().await;
        for (sku, _) in lines {
            inner.available(sku)?;
        }
        for (sku, qty) in lines {
            if let Some(stock) = inner.stock.get_mut(sku) {
                *stock += qty;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>> {
        Ok(self
            .inner
            .read()
            .await
            .carts
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    async fn cart_contains(&self, user: UserId, sku: &Sku) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .carts
            .get(&user)
            .is_some_and(|lines| lines.iter().any(|line| &line.sku == sku)))
    }

    async fn add_cart_line(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let lines = inner.carts.entry(user).or_default();
        if lines.iter().any(|line| &line.sku == sku) {
            return Err(StoreError::AlreadyExists {
                entity: "cart line",
                key: sku.to_string(),
            });
        }
        lines.push(CartLine::new(sku.clone(), qty));
        Ok(())
    }

    async fn remove_cart_line(&self, user: UserId, sku: &Sku) -> Result<()> {
        let mut inner = self.inner.write().await;
        let lines = inner
            .carts
            .get_mut(&user)
            .ok_or_else(|| StoreError::not_found("cart line", sku))?;
        let before = lines.len();
        lines.retain(|line| &line.sku != sku);
        if lines.len() == before {
            return Err(StoreError::not_found("cart line", sku));
        }
        Ok(())
    }

    async fn set_cart_quantity(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()> {
        let mut inner = self.inner.write().await;
        let line = inner
            .carts
            .get_mut(&user)
            .and_then(|lines| lines.iter_mut().find(|line| &line.sku == sku))
            .ok_or_else(|| StoreError::not_found("cart line", sku))?;
        line.quantity = qty;
        Ok(())
    }

    async fn clear_cart(&self, user: UserId) -> Result<()> {
        if let Some(lines) = self.inner.write().await.carts.get_mut(&user) {
            lines.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.orders.contains_key(&order.id) {
            return Err(StoreError::AlreadyExists {
                entity: "order",
                key: order.id.to_string(),
            });
        }
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let inner = self.inner.read().await;
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|order| order.user_id == user)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition_status(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<OrderStatus> {
        let mut inner = self.inner.write().await;
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order", id))?;
        let previous = order.status;
        if !allowed_from.contains(&previous) {
            return Err(StoreError::StatusConflict {
                order_id: id,
                actual: previous,
            });
        }
        order.status = to;
        Ok(previous)
    }

    async fn transition_with_refund(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let (user, amount, restock) = {
            let order = inner
                .orders
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("order", id))?;
            if !allowed_from.contains(&order.status) {
                return Err(StoreError::StatusConflict {
                    order_id: id,
                    actual: order.status,
                });
            }
            order.status = to;
            if !order.payment_status.is_paid() {
                return Ok(false);
            }
            (order.user_id, order.final_price, order.stock_adjustments())
        };

        let balance = inner.wallets.entry(user).or_default();
        *balance = balance.add(amount);
        for (sku, qty) in restock {
            // A delisted product has no inventory entry left to restore.
            if let Some(stock) = inner.stock.get_mut(&sku) {
                *stock += qty;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn upsert_payment_session(&self, order_id: OrderId, session_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.orders.contains_key(&order_id) {
            return Err(StoreError::not_found("order", order_id));
        }
        if inner.payments.get(&order_id).is_some_and(|p| p.paid) {
            return Err(StoreError::AlreadyCaptured(order_id));
        }
        inner.payments.insert(
            order_id,
            PaymentRecord {
                order_id,
                gateway_session_id: session_id.to_string(),
                gateway_payment_id: None,
                paid: false,
            },
        );
        Ok(())
    }

    async fn payment(&self, order_id: OrderId) -> Result<Option<PaymentRecord>> {
        Ok(self.inner.read().await.payments.get(&order_id).cloned())
    }

    async fn confirm_capture(
        &self,
        order_id: OrderId,
        gateway_payment_id: &str,
        decrements: &[(Sku, u32)],
    ) -> Result<()> {
        let mut inner = self.inner.write().await;

        let order = inner
            .orders
            .get(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        if order.payment_status.is_paid() {
            return Err(StoreError::AlreadyCaptured(order_id));
        }
        if order.status == OrderStatus::Canceled {
            return Err(StoreError::StatusConflict {
                order_id,
                actual: OrderStatus::Canceled,
            });
        }
        if !inner.payments.contains_key(&order_id) {
            return Err(StoreError::not_found("payment", order_id));
        }

        // Stock first: a failed decrement must leave the paid flag unset.
        inner.apply_decrements(decrements)?;

        if let Some(payment) = inner.payments.get_mut(&order_id) {
            payment.gateway_payment_id = Some(gateway_payment_id.to_string());
            payment.paid = true;
        }
        if let Some(order) = inner.orders.get_mut(&order_id) {
            order.payment_status = PaymentStatus::Paid;
        }
        Ok(())
    }
}

#[async_trait]
impl WalletStore for MemoryStore {
    async fn wallet_balance(&self, user: UserId) -> Result<Money> {
        Ok(self
            .inner
            .read()
            .await
            .wallets
            .get(&user)
            .copied()
            .unwrap_or_default())
    }

    async fn credit_wallet(&self, user: UserId, amount: Money) -> Result<Money> {
        let mut inner = self.inner.write().await;
        let balance = inner.wallets.entry(user).or_default();
        *balance = balance.add(amount);
        Ok(*balance)
    }

    async fn debit_wallet(&self, user: UserId, amount: Money) -> Result<Money> {
        let mut inner = self.inner.write().await;
        let balance = inner.wallets.entry(user).or_default();
        if *balance < amount {
            return Err(StoreError::InsufficientFunds {
                balance: *balance,
                requested: amount,
            });
        }
        *balance = balance.subtract(amount);
        Ok(*balance)
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        Ok(self.inner.read().await.coupons.get(code).cloned())
    }

    async fn coupon_used_by(&self, coupon_id: i32, user: UserId) -> Result<bool> {
        Ok(self
            .inner
            .read()
            .await
            .coupon_uses
            .contains_key(&(coupon_id, user)))
    }

    async fn record_coupon_use(
        &self,
        coupon_id: i32,
        user: UserId,
        order_id: OrderId,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.coupon_uses.contains_key(&(coupon_id, user)) {
            return Err(StoreError::AlreadyExists {
                entity: "coupon use",
                key: format!("{coupon_id}/{user}"),
            });
        }
        inner.coupon_uses.insert((coupon_id, user), order_id);
        Ok(())
    }
}
