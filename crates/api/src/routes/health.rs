//! Service health endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::Store;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// Which store implementation is serving checkout, `memory` or
    /// `postgresql`.
    pub backend: &'static str,
}

/// GET /health — liveness plus the active store backend.
pub async fn check<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "checkout-api",
        backend: state.backend,
    })
}
