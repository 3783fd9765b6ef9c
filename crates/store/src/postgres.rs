//! PostgreSQL-backed store implementation.
//!
//! Stock and payment invariants are enforced in SQL: guarded updates
//! (`... WHERE stock >= $n`) keep the inventory floor at zero, and the
//! capture commit takes a row lock on the order so cancellation and
//! confirmation serialize on order status.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, OrderId, PaymentMethodId, Sku, UserId};
use domain::{
    CartLine, CatalogProduct, Coupon, DiscountRule, Money, Order, OrderLine, OrderStatus,
    PaymentStatus,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    interfaces::{
        CartStore, CatalogStore, CouponStore, InventoryStore, OrderStore, PaymentRecord,
        PaymentStore, WalletStore,
    },
};

/// PostgreSQL store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and creates a store over a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<CatalogProduct> {
        Ok(CatalogProduct {
            sku: Sku::new(row.try_get::<String, _>("sku")?),
            name: row.try_get("name")?,
            brand: row.try_get("brand")?,
            category: row.try_get("category")?,
            price: Money::from_cents(row.try_get("price_cents")?),
        })
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order> {
        let id = OrderId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let order_status: String = row.try_get("order_status")?;
        let payment_status: String = row.try_get("payment_status")?;

        Ok(Order {
            id,
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            address_id: AddressId::new(row.try_get("address_id")?),
            payment_method_id: PaymentMethodId::new(row.try_get("payment_method_id")?),
            lines,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
            discount: Money::from_cents(row.try_get("discount_cents")?),
            coupon_code: row.try_get("coupon_code")?,
            final_price: Money::from_cents(row.try_get("final_price_cents")?),
            status: OrderStatus::parse(&order_status).ok_or_else(|| StoreError::Corrupt {
                entity: "order",
                key: id.to_string(),
                reason: format!("unknown order status {order_status:?}"),
            })?,
            payment_status: PaymentStatus::parse(&payment_status).ok_or_else(|| {
                StoreError::Corrupt {
                    entity: "order",
                    key: id.to_string(),
                    reason: format!("unknown payment status {payment_status:?}"),
                }
            })?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_order_line(row: PgRow) -> Result<OrderLine> {
        Ok(OrderLine {
            sku: Sku::new(row.try_get::<String, _>("sku")?),
            product_name: row.try_get("product_name")?,
            quantity: row.try_get::<i32, _>("quantity")? as u32,
            unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
        })
    }

    fn row_to_coupon(row: PgRow) -> Result<Coupon> {
        let id: i32 = row.try_get("id")?;
        let kind: String = row.try_get("discount_kind")?;
        let value: i64 = row.try_get("discount_value")?;
        let rule = match kind.as_str() {
            "percent" => DiscountRule::Percent(value as u32),
            "flat" => DiscountRule::Flat(Money::from_cents(value)),
            other => {
                return Err(StoreError::Corrupt {
                    entity: "coupon",
                    key: id.to_string(),
                    reason: format!("unknown discount kind {other:?}"),
                });
            }
        };
        Ok(Coupon {
            id,
            code: row.try_get("code")?,
            rule,
            min_order_value: Money::from_cents(row.try_get("min_order_cents")?),
            expires_at: row.try_get("expires_at")?,
        })
    }

    async fn order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT sku, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_order_line).collect()
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn product(&self, sku: &Sku) -> Result<Option<CatalogProduct>> {
        let row = sqlx::query(
            "SELECT sku, name, brand, category, price_cents FROM products WHERE sku = $1",
        )
        .bind(sku.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn products(&self, skus: &[Sku]) -> Result<Vec<CatalogProduct>> {
        let keys: Vec<&str> = skus.iter().map(Sku::as_str).collect();
        let rows = sqlx::query(
            "SELECT sku, name, brand, category, price_cents FROM products WHERE sku = ANY($1)",
        )
        .bind(&keys)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn stock(&self, sku: &Sku) -> Result<u32> {
        let stock: Option<i32> = sqlx::query_scalar("SELECT stock FROM inventories WHERE sku = $1")
            .bind(sku.as_str())
            .fetch_optional(&self.pool)
            .await?;
        stock
            .map(|s| s as u32)
            .ok_or_else(|| StoreError::not_found("inventory", sku))
    }

    async fn decrement_stock(&self, sku: &Sku, qty: u32) -> Result<()> {
        let result =
            sqlx::query("UPDATE inventories SET stock = stock - $2 WHERE sku = $1 AND stock >= $2")
                .bind(sku.as_str())
                .bind(qty as i32)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            let available = self.stock(sku).await?;
            return Err(StoreError::InsufficientStock {
                sku: sku.clone(),
                requested: qty,
                available,
            });
        }
        Ok(())
    }

    async fn increment_stock(&self, sku: &Sku, qty: u32) -> Result<()> {
        let result = sqlx::query("UPDATE inventories SET stock = stock + $2 WHERE sku = $1")
            .bind(sku.as_str())
            .bind(qty as i32)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("inventory", sku));
        }
        Ok(())
    }

    async fn decrement_all(&self, lines: &[(Sku, u32)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        // Take inventory locks in SKU order so concurrent multi-line
        // decrements cannot deadlock each other.
        let mut lines: Vec<&(Sku, u32)> = lines.iter().collect();
        lines.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        for (sku, qty) in lines {
            // Row lock serializes concurrent decrements of the same SKU.
            let available: Option<i32> =
                sqlx::query_scalar("SELECT stock FROM inventories WHERE sku = $1 FOR UPDATE")
                    .bind(sku.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            let available =
                available.ok_or_else(|| StoreError::not_found("inventory", sku))? as u32;
            if available < *qty {
                return Err(StoreError::InsufficientStock {
                    sku: sku.clone(),
                    requested: *qty,
                    available,
                });
            }
            sqlx::query("UPDATE inventories SET stock = stock - $2 WHERE sku = $1")
                .bind(sku.as_str())
                .bind(*qty as i32)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn increment_all(&self, lines: &[(Sku, u32)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let mut lines: Vec<&(Sku, u32)> = lines.iter().collect();
        lines.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        for (sku, qty) in lines {
            let result = sqlx::query("UPDATE inventories SET stock = stock + $2 WHERE sku = $1")
                .bind(sku.as_str())
                .bind(*qty as i32)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::not_found("inventory", sku));
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CartStore for PgStore {
    async fn cart_lines(&self, user: UserId) -> Result<Vec<CartLine>> {
        let rows = sqlx::query(
            "SELECT sku, quantity FROM cart_items WHERE user_id = $1 ORDER BY position ASC",
        )
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                Ok(CartLine {
                    sku: Sku::new(row.try_get::<String, _>("sku")?),
                    quantity: row.try_get::<i32, _>("quantity")? as u32,
                })
            })
            .collect::<Result<Vec<_>>>()?)
    }

    async fn cart_contains(&self, user: UserId, sku: &Sku) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM cart_items WHERE user_id = $1 AND sku = $2)",
        )
        .bind(user.as_uuid())
        .bind(sku.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn add_cart_line(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO cart_items (user_id, sku, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, sku) DO NOTHING
            "#,
        )
        .bind(user.as_uuid())
        .bind(sku.as_str())
        .bind(qty as i32)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                entity: "cart line",
                key: sku.to_string(),
            });
        }
        Ok(())
    }

    async fn remove_cart_line(&self, user: UserId, sku: &Sku) -> Result<()> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND sku = $2")
            .bind(user.as_uuid())
            .bind(sku.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart line", sku));
        }
        Ok(())
    }

    async fn set_cart_quantity(&self, user: UserId, sku: &Sku, qty: u32) -> Result<()> {
        let result =
            sqlx::query("UPDATE cart_items SET quantity = $3 WHERE user_id = $1 AND sku = $2")
                .bind(user.as_uuid())
                .bind(sku.as_str())
                .bind(qty as i32)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("cart line", sku));
        }
        Ok(())
    }

    async fn clear_cart(&self, user: UserId) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, address_id, payment_method_id,
                subtotal_cents, discount_cents, coupon_code, final_price_cents,
                order_status, payment_status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.address_id.as_i32())
        .bind(order.payment_method_id.as_i32())
        .bind(order.subtotal.cents())
        .bind(order.discount.cents())
        .bind(&order.coupon_code)
        .bind(order.final_price.cents())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, sku, product_name, quantity, unit_price_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(line.sku.as_str())
            .bind(&line.product_name)
            .bind(line.quantity as i32)
            .bind(line.unit_price.cents())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let lines = self.order_lines(id).await?;
                Ok(Some(Self::row_to_order(&row, lines)?))
            }
            None => Ok(None),
        }
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id ASC",
        )
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        // One batched item fetch instead of a query per order.
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let item_rows = sqlx::query(
            r#"
            SELECT order_id, sku, product_name, quantity, unit_price_cents
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY position ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines_by_order: std::collections::HashMap<Uuid, Vec<OrderLine>> =
            std::collections::HashMap::new();
        for row in item_rows {
            let order_id: Uuid = row.try_get("order_id")?;
            lines_by_order
                .entry(order_id)
                .or_default()
                .push(Self::row_to_order_line(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: Uuid = row.try_get("id")?;
                let lines = lines_by_order.remove(&id).unwrap_or_default();
                Self::row_to_order(row, lines)
            })
            .collect()
    }

    async fn transition_status(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<OrderStatus> {
        let mut tx = self.pool.begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT order_status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or_else(|| StoreError::not_found("order", id))?;
        let current = OrderStatus::parse(&current).ok_or_else(|| StoreError::Corrupt {
            entity: "order",
            key: id.to_string(),
            reason: format!("unknown order status {current:?}"),
        })?;

        if !allowed_from.contains(&current) {
            return Err(StoreError::StatusConflict {
                order_id: id,
                actual: current,
            });
        }

        sqlx::query("UPDATE orders SET order_status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(current)
    }

    async fn transition_with_refund(
        &self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT user_id, final_price_cents, order_status, payment_status
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found("order", id))?;

        let current: String = row.try_get("order_status")?;
        let current = OrderStatus::parse(&current).ok_or_else(|| StoreError::Corrupt {
            entity: "order",
            key: id.to_string(),
            reason: format!("unknown order status {current:?}"),
        })?;
        if !allowed_from.contains(&current) {
            return Err(StoreError::StatusConflict {
                order_id: id,
                actual: current,
            });
        }

        sqlx::query("UPDATE orders SET order_status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;

        let payment_status: String = row.try_get("payment_status")?;
        if payment_status != PaymentStatus::Paid.as_str() {
            tx.commit().await?;
            return Ok(false);
        }

        let user: Uuid = row.try_get("user_id")?;
        let amount: i64 = row.try_get("final_price_cents")?;
        sqlx::query(
            r#"
            INSERT INTO wallets (user_id, balance_cents)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET balance_cents = wallets.balance_cents + $2
            "#,
        )
        .bind(user)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        // Restore in SKU order, matching the lock order of the capture
        // path. A delisted product has no inventory row left to restore.
        let lines =
            sqlx::query("SELECT sku, quantity FROM order_items WHERE order_id = $1 ORDER BY sku")
                .bind(id.as_uuid())
                .fetch_all(&mut *tx)
                .await?;
        for line in lines {
            let sku: String = line.try_get("sku")?;
            let qty: i32 = line.try_get("quantity")?;
            sqlx::query("UPDATE inventories SET stock = stock + $2 WHERE sku = $1")
                .bind(&sku)
                .bind(qty)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn upsert_payment_session(&self, order_id: OrderId, session_id: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO payments (order_id, gateway_session_id)
            VALUES ($1, $2)
            ON CONFLICT (order_id) DO UPDATE SET gateway_session_id = $2
            WHERE payments.paid = FALSE
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(session_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyCaptured(order_id));
        }
        Ok(())
    }

    async fn payment(&self, order_id: OrderId) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT order_id, gateway_session_id, gateway_payment_id, paid
            FROM payments
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| {
            Ok(PaymentRecord {
                order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
                gateway_session_id: row.try_get("gateway_session_id")?,
                gateway_payment_id: row.try_get("gateway_payment_id")?,
                paid: row.try_get("paid")?,
            })
        })
        .transpose()
    }

    async fn confirm_capture(
        &self,
        order_id: OrderId,
        gateway_payment_id: &str,
        decrements: &[(Sku, u32)],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // The order row lock is the serialization point between a
        // concurrent cancel and this capture.
        let row =
            sqlx::query("SELECT order_status, payment_status FROM orders WHERE id = $1 FOR UPDATE")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::not_found("order", order_id))?;

        let payment_status: String = row.try_get("payment_status")?;
        if payment_status == PaymentStatus::Paid.as_str() {
            return Err(StoreError::AlreadyCaptured(order_id));
        }
        let order_status: String = row.try_get("order_status")?;
        if order_status == OrderStatus::Canceled.as_str() {
            return Err(StoreError::StatusConflict {
                order_id,
                actual: OrderStatus::Canceled,
            });
        }

        let updated = sqlx::query(
            r#"
            UPDATE payments
            SET gateway_payment_id = $2, paid = TRUE
            WHERE order_id = $1 AND paid = FALSE
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(gateway_payment_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::not_found("payment", order_id));
        }

        // Inventory locks in SKU order: two captures with overlapping
        // lines must not deadlock each other.
        let mut decrements: Vec<&(Sku, u32)> = decrements.iter().collect();
        decrements.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        for (sku, qty) in decrements {
            let result = sqlx::query(
                "UPDATE inventories SET stock = stock - $2 WHERE sku = $1 AND stock >= $2",
            )
            .bind(sku.as_str())
            .bind(*qty as i32)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                let available: Option<i32> =
                    sqlx::query_scalar("SELECT stock FROM inventories WHERE sku = $1")
                        .bind(sku.as_str())
                        .fetch_optional(&mut *tx)
                        .await?;
                // Dropping the transaction rolls back the paid flag.
                return Err(StoreError::InsufficientStock {
                    sku: sku.clone(),
                    requested: *qty,
                    available: available.unwrap_or(0) as u32,
                });
            }
        }

        sqlx::query("UPDATE orders SET payment_status = $2 WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(PaymentStatus::Paid.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl WalletStore for PgStore {
    async fn wallet_balance(&self, user: UserId) -> Result<Money> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance_cents FROM wallets WHERE user_id = $1")
                .bind(user.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(Money::from_cents(balance.unwrap_or(0)))
    }

    async fn credit_wallet(&self, user: UserId, amount: Money) -> Result<Money> {
        let balance: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO wallets (user_id, balance_cents)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET balance_cents = wallets.balance_cents + $2
            RETURNING balance_cents
            "#,
        )
        .bind(user.as_uuid())
        .bind(amount.cents())
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(balance))
    }

    async fn debit_wallet(&self, user: UserId, amount: Money) -> Result<Money> {
        let balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE wallets
            SET balance_cents = balance_cents - $2
            WHERE user_id = $1 AND balance_cents >= $2
            RETURNING balance_cents
            "#,
        )
        .bind(user.as_uuid())
        .bind(amount.cents())
        .fetch_optional(&self.pool)
        .await?;
        match balance {
            Some(balance) => Ok(Money::from_cents(balance)),
            None => {
                let current = self.wallet_balance(user).await?;
                Err(StoreError::InsufficientFunds {
                    balance: current,
                    requested: amount,
                })
            }
        }
    }
}

#[async_trait]
impl CouponStore for PgStore {
    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, discount_kind, discount_value, min_order_cents, expires_at
            FROM coupons
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_coupon).transpose()
    }

    async fn coupon_used_by(&self, coupon_id: i32, user: UserId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2)",
        )
        .bind(coupon_id)
        .bind(user.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn record_coupon_use(
        &self,
        coupon_id: i32,
        user: UserId,
        order_id: OrderId,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO coupon_usages (coupon_id, user_id, order_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (coupon_id, user_id) DO NOTHING
            "#,
        )
        .bind(coupon_id)
        .bind(user.as_uuid())
        .bind(order_id.as_uuid())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                entity: "coupon use",
                key: format!("{coupon_id}/{user}"),
            });
        }
        Ok(())
    }
}
