//! Order placement and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{AddressId, PaymentMethodId};
use domain::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_order_id, parse_user_id};
use crate::error::ApiError;
use crate::routes::cart::UserQuery;
use checkout::PlaceOrder;

// -- Request types --

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub user_id: String,
    pub address_id: i32,
    pub payment_method_id: i32,
    pub coupon_code: Option<String>,
}

#[derive(Deserialize)]
pub struct UserRequest {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub sku: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub address_id: i32,
    pub payment_method_id: i32,
    pub status: String,
    pub payment_status: String,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub coupon_code: Option<String>,
    pub final_price_cents: i64,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

impl OrderResponse {
    pub(crate) fn from_order(order: Order) -> Self {
        let lines = order
            .lines
            .iter()
            .map(|line| OrderLineResponse {
                sku: line.sku.to_string(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                line_total_cents: line.line_total().cents(),
            })
            .collect();

        Self {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            address_id: order.address_id.as_i32(),
            payment_method_id: order.payment_method_id.as_i32(),
            status: order.status.as_str().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            subtotal_cents: order.subtotal.cents(),
            discount_cents: order.discount.cents(),
            coupon_code: order.coupon_code,
            final_price_cents: order.final_price.cents(),
            created_at: order.created_at.to_rfc3339(),
            lines,
        }
    }
}

// -- Handlers --

/// POST /orders — place an order from the user's cart.
#[tracing::instrument(skip(state, req))]
pub async fn place<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user = parse_user_id(&req.user_id)?;
    let order = state
        .pipeline
        .place_order(PlaceOrder {
            user,
            address_id: AddressId::new(req.address_id),
            payment_method_id: PaymentMethodId::new(req.payment_method_id),
            coupon_code: req.coupon_code,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from_order(order))))
}

/// GET /orders — list the user's orders, newest first.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let user = parse_user_id(&query.user_id)?;
    let orders = state.pipeline.orders_for_user(user).await?;
    Ok(Json(
        orders.into_iter().map(OrderResponse::from_order).collect(),
    ))
}

/// GET /orders/:id — load one of the user's orders.
#[tracing::instrument(skip(state, query))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let user = parse_user_id(&query.user_id)?;
    let order = state.pipeline.order_for_user(order_id, user).await?;
    Ok(Json(OrderResponse::from_order(order)))
}

/// POST /orders/:id/cancel — cancel an order that has not shipped.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let user = parse_user_id(&req.user_id)?;
    let order = state.pipeline.cancel_order(order_id, user).await?;
    Ok(Json(OrderResponse::from_order(order)))
}

/// POST /orders/:id/return — request a return for a completed order.
#[tracing::instrument(skip(state, req))]
pub async fn request_return<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let user = parse_user_id(&req.user_id)?;
    let order = state.pipeline.return_order(order_id, user).await?;
    Ok(Json(OrderResponse::from_order(order)))
}

/// POST /orders/:id/status — operator transition to a new status.
#[tracing::instrument(skip(state, req))]
pub async fn transition<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<TransitionRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let to = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown order status: {}", req.status)))?;
    let order = state.pipeline.approve_order(order_id, to).await?;
    Ok(Json(OrderResponse::from_order(order)))
}
