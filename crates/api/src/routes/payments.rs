//! Payment session and capture endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::CURRENCY;
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_order_id, parse_user_id};
use crate::error::ApiError;
use crate::routes::orders::{OrderResponse, UserRequest};

#[derive(Deserialize)]
pub struct ConfirmCaptureRequest {
    pub order_id: String,
    pub session_id: String,
    pub gateway_payment_id: String,
}

#[derive(Serialize)]
pub struct PaymentSessionResponse {
    pub order_id: String,
    pub session_id: String,
    pub amount_cents: i64,
    pub currency: &'static str,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub order_id: String,
    pub gateway_session_id: String,
    pub gateway_payment_id: Option<String>,
    pub paid: bool,
}

/// POST /orders/:id/payment — open a gateway session for an order.
#[tracing::instrument(skip(state, req))]
pub async fn initiate<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<(StatusCode, Json<PaymentSessionResponse>), ApiError> {
    let order_id = parse_order_id(&id)?;
    let user = parse_user_id(&req.user_id)?;
    let session = state.payments.initiate_capture(order_id, user).await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentSessionResponse {
            order_id: order_id.to_string(),
            session_id: session.session_id,
            amount_cents: session.order.final_price.cents(),
            currency: CURRENCY,
        }),
    ))
}

/// POST /payments/confirm — gateway callback committing a charge.
///
/// Idempotent: redelivery of a processed callback gets 409 and changes
/// nothing.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ConfirmCaptureRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&req.order_id)?;
    let order = state
        .payments
        .confirm_capture(order_id, &req.session_id, &req.gateway_payment_id)
        .await?;
    Ok(Json(OrderResponse::from_order(order)))
}

/// GET /orders/:id/payment — the payment record for an order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let record = state
        .payments
        .payment_for_order(order_id)
        .await?
        .ok_or_else(|| {
            ApiError::Checkout(checkout::CheckoutError::NotFound(format!(
                "payment session for {order_id}"
            )))
        })?;

    Ok(Json(PaymentResponse {
        order_id: record.order_id.to_string(),
        gateway_session_id: record.gateway_session_id,
        gateway_payment_id: record.gateway_payment_id,
        paid: record.paid,
    }))
}
