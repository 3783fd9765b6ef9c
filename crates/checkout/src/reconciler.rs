//! Payment capture against the external gateway.

use std::sync::Arc;

use common::{OrderId, UserId};
use domain::Order;
use store::{PaymentRecord, Store};

use crate::error::{CheckoutError, Result};
use crate::gateway::{PaymentGateway, CURRENCY};

/// An open gateway session for an order awaiting capture.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub session_id: String,
    pub order: Order,
}

/// Drives an order from placed to paid through the gateway.
///
/// `initiate_capture` opens a session; the charge completes out-of-band
/// and `confirm_capture` commits it. Stock decrements happen only inside
/// the confirm transaction, so sessions can be abandoned or retried
/// freely without ever holding inventory.
pub struct PaymentReconciler<S, G> {
    store: Arc<S>,
    gateway: G,
}

impl<S: Store, G: PaymentGateway> PaymentReconciler<S, G> {
    /// Creates a new reconciler over a store and gateway.
    pub fn new(store: Arc<S>, gateway: G) -> Self {
        Self { store, gateway }
    }

    /// Opens a gateway session for the order's final price.
    ///
    /// Re-initiating for an unpaid order replaces the stored session, so
    /// an abandoned session is never a dead end. The gateway call happens
    /// before any store write; a gateway failure leaves no local trace.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_capture(&self, order_id: OrderId, user: UserId) -> Result<CaptureSession> {
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
        if order.is_paid() {
            return Err(CheckoutError::AlreadyPaid(order_id));
        }

        let session = self
            .gateway
            .create_session(order.final_price, CURRENCY, &order_id.to_string())
            .await
            .map_err(|err| CheckoutError::Gateway(err.to_string()))?;

        self.store
            .upsert_payment_session(order_id, &session.session_id)
            .await?;

        tracing::info!(%order_id, session_id = %session.session_id, "capture session opened");
        metrics::counter!("payments_initiated_total").increment(1);
        Ok(CaptureSession {
            session_id: session.session_id,
            order,
        })
    }

    /// Loads the payment record for an order, if a session was opened.
    pub async fn payment_for_order(&self, order_id: OrderId) -> Result<Option<PaymentRecord>> {
        Ok(self.store.payment(order_id).await?)
    }

    /// Commits a completed gateway charge.
    ///
    /// Atomically, in one store transaction: verify the order is still
    /// unpaid and not canceled, decrement stock for every line (all or
    /// nothing), and mark the order paid. Replays of the same callback
    /// fail with `AlreadyPaid` and change nothing.
    #[tracing::instrument(skip(self, gateway_payment_id))]
    pub async fn confirm_capture(
        &self,
        order_id: OrderId,
        session_id: &str,
        gateway_payment_id: &str,
    ) -> Result<Order> {
        let order = self
            .store
            .order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order_id}")))?;
        if order.is_paid() {
            return Err(CheckoutError::AlreadyPaid(order_id));
        }

        let record = self
            .store
            .payment(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("payment session for {order_id}")))?;
        if record.gateway_session_id != session_id {
            return Err(CheckoutError::NotFound(format!(
                "payment session {session_id}"
            )));
        }

        self.store
            .confirm_capture(order_id, gateway_payment_id, &order.stock_adjustments())
            .await?;

        tracing::info!(%order_id, "payment captured");
        metrics::counter!("payments_captured_total").increment(1);
        self.store
            .order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {order_id}")))
    }
}
