//! DocForge Ingestion Service
//!
//! HTTP service that turns uploaded or fetched documents into
//! searchable chunk rows. Handles:
//! - Text sanitization and recursive chunking
//! - Single and batch ingestion
//! - Postgres full-text indexing via tsvector
//! - Observability (logging, metrics, request tracing)

mod chunker;
mod handlers;
mod sanitize;
mod service;

use axum::{
    routing::{get, post},
    Router,
};
use docforge_common::{config::AppConfig, db::DbPool, metrics, Repository};
use handlers::AppState;
use service::IngestService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting DocForge Ingestion Service v{}", docforge_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    // Initialize metrics
    metrics::register_metrics();
    if config.server.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.server.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }

    // Initialize database connection and schema
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    db.run_migrations().await?;

    let repository = Repository::new(db);
    let state = AppState {
        service: IngestService::new(Arc::new(repository), config.chunking.clone()),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ingest", post(handlers::ingest::ingest_document))
        .route("/ingest/batch", post(handlers::ingest::ingest_batch))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
