//! Wallet endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use domain::Money;
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_user_id};
use crate::error::ApiError;
use crate::routes::cart::UserQuery;

#[derive(Deserialize)]
pub struct CreditRequest {
    pub user_id: String,
    pub amount_cents: i64,
}

#[derive(Serialize)]
pub struct WalletResponse {
    pub balance_cents: i64,
}

/// GET /wallet — the user's store-credit balance.
#[tracing::instrument(skip(state, query))]
pub async fn balance<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<UserQuery>,
) -> Result<Json<WalletResponse>, ApiError> {
    let user = parse_user_id(&query.user_id)?;
    let balance = state.wallet.balance(user).await?;
    Ok(Json(WalletResponse {
        balance_cents: balance.cents(),
    }))
}

/// POST /wallet/credit — top up the wallet.
#[tracing::instrument(skip(state, req))]
pub async fn credit<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreditRequest>,
) -> Result<Json<WalletResponse>, ApiError> {
    let user = parse_user_id(&req.user_id)?;
    let balance = state
        .wallet
        .credit(user, Money::from_cents(req.amount_cents))
        .await?;
    Ok(Json(WalletResponse {
        balance_cents: balance.cents(),
    }))
}
