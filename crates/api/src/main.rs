//! API server entry point.

use std::sync::Arc;

use common::Sku;
use domain::{CatalogProduct, Coupon, DiscountRule, Money};
use store::{MemoryStore, PgStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::config::Config;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Demo catalog for in-memory runs.
async fn seed_demo_catalog(store: &MemoryStore) {
    let products = [
        ("SKU-TEE", "Plain Tee", "Threadway", "apparel", 49_900),
        ("SKU-MUG", "Enamel Mug", "Campware", "kitchen", 29_900),
        ("SKU-LAMP", "Desk Lamp", "Lumio", "home", 129_900),
    ];
    for (sku, name, brand, category, price_cents) in products {
        store
            .seed_product(
                CatalogProduct {
                    sku: Sku::new(sku),
                    name: name.to_string(),
                    brand: brand.to_string(),
                    category: category.to_string(),
                    price: Money::from_cents(price_cents),
                },
                100,
            )
            .await;
    }
    store
        .seed_coupon(Coupon {
            id: 1,
            code: "WELCOME10".to_string(),
            rule: DiscountRule::Percent(10),
            min_order_value: Money::from_cents(50_000),
            expires_at: None,
        })
        .await;
}

async fn serve(app: axum::Router, addr: &str) {
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick a store and serve
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url).await.expect("database connect failed");
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using PostgreSQL store");

            let state = api::create_default_state(Arc::new(store), "postgresql");
            let app = api::create_app(state, metrics_handle);
            serve(app, &config.addr()).await;
        }
        None => {
            let store = MemoryStore::new();
            seed_demo_catalog(&store).await;
            tracing::info!("no DATABASE_URL set, using in-memory store");

            let state = api::create_default_state(Arc::new(store), "memory");
            let app = api::create_app(state, metrics_handle);
            serve(app, &config.addr()).await;
        }
    }
}
