//! The order pipeline: cart → priced order with a lifecycle.

use std::sync::Arc;

use common::{AddressId, OrderId, PaymentMethodId, UserId};
use domain::{CouponError, Order, OrderError, OrderStatus};
use store::{Store, StoreError};

use crate::cart::CartService;
use crate::coupon::CouponEvaluator;
use crate::error::{CheckoutError, Result};

/// Command to place an order from the user's current cart.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user: UserId,
    pub address_id: AddressId,
    pub payment_method_id: PaymentMethodId,
    pub coupon_code: Option<String>,
}

/// Orchestrates order placement and lifecycle transitions.
///
/// Stock is validated at placement but only decremented at payment
/// confirmation (see `PaymentReconciler`), so an abandoned order never
/// holds stock.
pub struct OrderPipeline<S> {
    store: Arc<S>,
    cart: CartService<S>,
    coupons: CouponEvaluator<S>,
}

impl<S: Store> OrderPipeline<S> {
    /// Creates a new pipeline over the given store.
    pub fn new(store: Arc<S>) -> Self {
        let cart = CartService::new(store.clone());
        let coupons = CouponEvaluator::new(store.clone());
        Self {
            store,
            cart,
            coupons,
        }
    }

    /// Converts the user's cart into a placed, unpaid order.
    ///
    /// 1. Snapshot the cart (`EmptyCart` if it has no lines).
    /// 2. Validation read of stock per line (`OutOfStock` names the
    ///    first short SKU). Not a reservation: the authoritative check
    ///    happens inside the capture transaction.
    /// 3. Price from current catalog prices, apply the coupon discount.
    /// 4. Record the coupon redemption. The loser of two concurrent
    ///    redemptions of a single-use coupon fails here, before any
    ///    order is written.
    /// 5. Persist the order `PLACED` / `NOT PAID` with frozen prices and
    ///    clear the cart.
    #[tracing::instrument(skip(self, cmd), fields(user = %cmd.user))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<Order> {
        metrics::counter!("orders_place_attempts_total").increment(1);
        let started = std::time::Instant::now();

        if !cmd.address_id.is_valid() {
            return Err(CheckoutError::InvalidArgument(format!(
                "invalid address id {}",
                cmd.address_id
            )));
        }
        if !cmd.payment_method_id.is_valid() {
            return Err(CheckoutError::InvalidArgument(format!(
                "invalid payment method id {}",
                cmd.payment_method_id
            )));
        }

        let snapshot = self.cart.snapshot(cmd.user).await?;
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        for item in &snapshot.items {
            let available = self.store.stock(&item.sku).await?;
            if item.quantity > available {
                return Err(CheckoutError::OutOfStock {
                    sku: item.sku.clone(),
                    requested: item.quantity,
                    available,
                });
            }
        }

        let applied = match &cmd.coupon_code {
            Some(code) => Some(self.coupons.validate(code, snapshot.subtotal, cmd.user).await?),
            None => None,
        };
        let discount = applied
            .as_ref()
            .map(|coupon| coupon.discount)
            .unwrap_or_default();

        let lines = Order::lines_from_snapshot(&snapshot);
        let order = Order::place(
            cmd.user,
            cmd.address_id,
            cmd.payment_method_id,
            lines,
            discount,
            applied.as_ref().map(|coupon| coupon.code.clone()),
        )
        .map_err(map_order_error)?;

        if let Some(coupon) = &applied {
            self.store
                .record_coupon_use(coupon.coupon_id, cmd.user, order.id)
                .await
                .map_err(|err| match err {
                    StoreError::AlreadyExists { .. } => {
                        CheckoutError::Coupon(CouponError::AlreadyUsed)
                    }
                    other => other.into(),
                })?;
        }
        self.store.insert_order(&order).await?;
        self.store.clear_cart(cmd.user).await?;

        tracing::info!(order_id = %order.id, final_price = %order.final_price, "order placed");
        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("place_order_duration_seconds").record(started.elapsed().as_secs_f64());
        Ok(order)
    }

    /// Loads an order, enforcing ownership.
    pub async fn order_for_user(&self, order_id: OrderId, user: UserId) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order_id}")))?;
        if !order.owned_by(user) {
            return Err(CheckoutError::Forbidden(format!(
                "order {order_id} belongs to another user"
            )));
        }
        Ok(order)
    }

    /// Lists a user's orders, newest first.
    pub async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for_user(user).await?)
    }

    /// Cancels an order that has not shipped.
    ///
    /// The status compare-and-set serializes against a concurrent
    /// capture: whichever commits first wins. A cancel landing after a
    /// committed capture settles the refund (wallet credit and stock
    /// restore) in the same store commit as the status change, so a
    /// canceled paid order is never left unrefunded.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, user: UserId) -> Result<Order> {
        self.order_for_user(order_id, user).await?;

        let refunded = self
            .store
            .transition_with_refund(
                order_id,
                &[OrderStatus::Placed, OrderStatus::Processing],
                OrderStatus::Canceled,
            )
            .await?;
        if refunded {
            metrics::counter!("orders_refunded_total").increment(1);
        }

        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order_id}")))?;
        tracing::info!(%order_id, refunded, "order canceled");
        metrics::counter!("orders_canceled_total").increment(1);
        Ok(order)
    }

    /// Requests a return for a completed order.
    ///
    /// Stock and wallet are reconciled only when an operator confirms
    /// the return via `approve_order(.., RETURNED)`.
    #[tracing::instrument(skip(self))]
    pub async fn return_order(&self, order_id: OrderId, user: UserId) -> Result<Order> {
        self.order_for_user(order_id, user).await?;

        self.store
            .transition_status(
                order_id,
                &[OrderStatus::Completed],
                OrderStatus::ReturnRequested,
            )
            .await?;

        tracing::info!(%order_id, "return requested");
        self.store
            .order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order_id}")))
    }

    /// Operator-facing transition to any legal next status.
    ///
    /// Validates the requested transition against the state machine and
    /// applies it with a compare-and-set against the observed status.
    /// Confirming a return (`RETURN_REQUESTED → RETURNED`) and an
    /// operator-side cancel both settle the refund for paid orders
    /// atomically with the status change.
    #[tracing::instrument(skip(self))]
    pub async fn approve_order(&self, order_id: OrderId, to: OrderStatus) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order_id}")))?;

        if !order.status.can_transition_to(to) {
            return Err(CheckoutError::InvalidTransition {
                from: order.status,
                to,
            });
        }

        let refunded = if matches!(to, OrderStatus::Returned | OrderStatus::Canceled) {
            self.store
                .transition_with_refund(order_id, &[order.status], to)
                .await?
        } else {
            self.store
                .transition_status(order_id, &[order.status], to)
                .await?;
            false
        };
        if refunded {
            metrics::counter!("orders_refunded_total").increment(1);
        }

        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order_id}")))?;
        tracing::info!(%order_id, status = %to, refunded, "order transitioned");
        Ok(order)
    }
}

fn map_order_error(err: OrderError) -> CheckoutError {
    match err {
        OrderError::NoLineItems => CheckoutError::EmptyCart,
        other => CheckoutError::InvalidArgument(other.to_string()),
    }
}
