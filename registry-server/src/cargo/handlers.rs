//! Cargo HTTP endpoint handlers
//!
//! Upload and download endpoints. Both delegate to
//! [`RegistryService`](crate::service::RegistryService); the handlers only
//! adapt requests and responses.

use crate::{AppError, AppResult, AppState};
use axum::{
    body::Body,
    extract::{Path as AxumPath, Request, State},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info};

/// Publishes a new crate version (`cargo publish`).
///
/// The body is the length-prefixed upload frame. Success is an empty JSON
/// object, which Cargo reads as "no warnings".
pub async fn publish_crate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    debug!(size = body.len(), "Incoming Cargo publish request");
    let published = state.service.publish(&body).await?;

    info!(
        crate_name = %published.name,
        version = %published.version,
        "Cargo crate uploaded"
    );
    Ok(Json(json!({})))
}

/// Streams a stored `.crate` archive.
pub async fn download_crate(
    AxumPath((crate_name, version)): AxumPath<(String, String)>,
    State(state): State<Arc<AppState>>,
    req: Request,
) -> AppResult<Response> {
    debug!(crate_name = %crate_name, version = %version, "Incoming Cargo crate download request");
    let path = state.service.archive_path(&crate_name, &version).await?;

    let response = ServeFile::new(&path)
        .oneshot(req)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to serve {}: {e}", path.display())))?;

    info!(crate_name = %crate_name, version = %version, "Serving crate archive");
    Ok(response.map(Body::new).into_response())
}
