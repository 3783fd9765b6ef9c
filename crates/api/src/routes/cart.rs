//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::Sku;
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_user_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub user_id: String,
    pub sku: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub user_id: String,
    pub quantity: u32,
}

#[derive(Serialize)]
pub struct CartItemResponse {
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub subtotal_cents: i64,
}

/// GET /cart — the user's cart priced against the live catalog.
#[tracing::instrument(skip(state, query))]
pub async fn view<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CartResponse>, ApiError> {
    let user = parse_user_id(&query.user_id)?;
    let snapshot = state.cart.snapshot(user).await?;

    let items = snapshot
        .items
        .into_iter()
        .map(|item| CartItemResponse {
            sku: item.sku.to_string(),
            name: item.name,
            brand: item.brand,
            category: item.category,
            quantity: item.quantity,
            unit_price_cents: item.unit_price.cents(),
            line_total_cents: item.line_total.cents(),
        })
        .collect();

    Ok(Json(CartResponse {
        items,
        subtotal_cents: snapshot.subtotal.cents(),
    }))
}

/// POST /cart/items — add a line item.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<AddItemRequest>,
) -> Result<StatusCode, ApiError> {
    let user = parse_user_id(&req.user_id)?;
    state
        .cart
        .add_item(user, &Sku::new(req.sku), req.quantity)
        .await?;
    Ok(StatusCode::CREATED)
}

/// PUT /cart/items/:sku — overwrite a line item quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<StatusCode, ApiError> {
    let user = parse_user_id(&req.user_id)?;
    state
        .cart
        .update_quantity(user, &Sku::new(sku), req.quantity)
        .await?;
    Ok(StatusCode::OK)
}

/// DELETE /cart/items/:sku — remove a line item.
#[tracing::instrument(skip(state, query))]
pub async fn remove_item<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let user = parse_user_id(&query.user_id)?;
    state.cart.remove_item(user, &Sku::new(sku)).await?;
    Ok(StatusCode::NO_CONTENT)
}
