//! Customer Web - catalog data-access service.
//!
//! This binary runs the catalog client's background work and serves the
//! operational endpoints on port 5000.
//!
//! # Architecture
//!
//! - Cache-aside `CatalogClient` over the catalog API (retry + circuit breaker)
//! - Background stock refresher, stopped through a `watch` shutdown channel
//! - Development only: one best-effort upstream sync at startup
//! - Axum for `/health` and `/ops/*`

#![cfg_attr(not(test), forbid(unsafe_code))]

use customer_web::catalog::CatalogClient;
use customer_web::config::AppConfig;
use customer_web::jobs::{StockRefresher, spawn_startup_sync};
use customer_web::routes;
use customer_web::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(std::borrow::Cow::Owned(
                config
                    .sentry_environment
                    .clone()
                    .unwrap_or_else(|| config.environment.to_string()),
            )),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "customer_web=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    tracing::info!(
        environment = %config.environment,
        catalog_api = %config.catalog.base_url,
        "Starting customer-web"
    );

    let catalog = CatalogClient::new(&config.catalog).expect("Failed to build catalog client");

    // Background stock refresh, stopped on shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = StockRefresher::new(catalog.clone(), config.refresh);
    let refresh_metrics = refresher.metrics();
    let refresher_handle = refresher
        .spawn(shutdown_rx)
        .expect("Stock refresher already running");

    // Warm the upstream in development; never awaited
    if config.environment.is_development() {
        drop(spawn_startup_sync(catalog.clone()));
    }

    let state = AppState::new(config.clone(), catalog, refresh_metrics);

    let app = routes::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = config.socket_addr();
    tracing::info!("customer-web listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // Stop the refresher and wait for it to finish its current step
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresher_handle.await {
        tracing::error!(error = %e, "Stock refresher task failed");
    }

    tracing::info!("customer-web stopped");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
