//! HTTP API server with observability for the checkout core.
//!
//! Provides REST endpoints for the cart → order → payment workflow,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use checkout::{CartService, InMemoryGateway, OrderPipeline, PaymentReconciler, WalletService};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/cart", get(routes::cart::view::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/items/{sku}", put(routes::cart::update_item::<S>))
        .route("/cart/items/{sku}", delete(routes::cart::remove_item::<S>))
        .route("/orders", post(routes::orders::place::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route(
            "/orders/{id}/return",
            post(routes::orders::request_return::<S>),
        )
        .route("/orders/{id}/status", post(routes::orders::transition::<S>))
        .route("/orders/{id}/payment", post(routes::payments::initiate::<S>))
        .route("/orders/{id}/payment", get(routes::payments::get::<S>))
        .route("/payments/confirm", post(routes::payments::confirm::<S>))
        .route("/wallet", get(routes::wallet::balance::<S>))
        .route("/wallet/credit", post(routes::wallet::credit::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over a store and the in-memory
/// gateway. `backend` labels the store implementation in `/health`.
pub fn create_default_state<S: Store + 'static>(
    store: Arc<S>,
    backend: &'static str,
) -> Arc<AppState<S>> {
    let gateway = InMemoryGateway::new();
    Arc::new(AppState {
        cart: CartService::new(store.clone()),
        pipeline: OrderPipeline::new(store.clone()),
        payments: PaymentReconciler::new(store.clone(), gateway),
        wallet: WalletService::new(store),
        backend,
    })
}
