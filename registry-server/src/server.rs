//! HTTP server setup and routing
//!
//! Builds the axum router over [`AppState`] and runs it until Ctrl-C, then
//! shuts the registry service down.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::{auth, cargo, config::Config, service::RegistryService, state::AppState, ui, validation};

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let publish = Router::new()
        .route("/api/v1/crates/new", put(cargo::publish_crate))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(ui::home))
        .route("/health", get(health_handler))
        .route("/sparse/{*path}", get(cargo::sparse_index))
        .route(
            "/crates/{crate}/{version}/download",
            get(cargo::download_crate),
        )
        .merge(publish)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(validation::MAX_REQUEST_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"status": "healthy"}"#,
    )
}

/// Run the registry until interrupted.
pub async fn run_server(config: Config) -> Result<()> {
    info!("Starting sparse registry");

    let service = Arc::new(RegistryService::from_config(&config));
    service.init().await?;

    let addr: SocketAddr = tokio::net::lookup_host(config.bind_addr())
        .await
        .map_err(|e| {
            error!(addr = %config.bind_addr(), error = %e, "Invalid socket address");
            anyhow::anyhow!("Invalid socket address {}: {}", config.bind_addr(), e)
        })?
        .next()
        .ok_or_else(|| anyhow::anyhow!("No address found for {}", config.bind_addr()))?;

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        error!(addr = %addr, error = %e, "Failed to bind to address");
        anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
    })?;

    let state = Arc::new(AppState::new(Arc::clone(&service), config));
    info!(
        addr = %addr,
        root_url = %state.server_addr,
        package_dir = %service.package_dir().display(),
        auth_required = auth::is_auth_required(&state),
        "Server listening"
    );

    let served = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    service.shutdown().await;

    served.map_err(|e| {
        error!(error = %e, "Server error");
        anyhow::anyhow!("Server error: {}", e)
    })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
