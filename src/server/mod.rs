use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::LineageConfig;
use crate::ingest::IngestCoordinator;
use crate::storage::GraphStore;

pub mod routes;

/// Server state
pub struct AppState {
    pub store: Arc<dyn GraphStore>,
    pub coordinator: Arc<IngestCoordinator>,
}

/// Build the HTTP router. Empty `cors_origins` allows any origin.
pub fn router(state: Arc<AppState>, cors_origins: &[String], static_dir: Option<&str>) -> Router {
    let app = Router::new()
        .route("/analyze/sql", post(routes::handle_analyze))
        .route("/graph/data", get(routes::handle_graph))
        .route("/impact/check", get(routes::handle_impact))
        .route("/ingest/bulk", post(routes::handle_bulk))
        .route("/ingest/metrics", get(routes::handle_metrics))
        .route("/health", get(routes::handle_health));

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Serve until Ctrl-C, then drain the ingestion queue.
pub async fn start_server(
    config: &LineageConfig,
    store: Arc<dyn GraphStore>,
    coordinator: Arc<IngestCoordinator>,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        store,
        coordinator: Arc::clone(&coordinator),
    });
    let app = router(state, &config.cors_origins, config.static_dir.as_deref());

    let addr = config.socket_addr()?;
    tracing::info!("Starting server on {}", addr);
    crate::ui::success(&format!("Server running at http://{}", addr));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, draining ingestion queue");
    coordinator.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
