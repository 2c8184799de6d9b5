//! Sparse index endpoints
//!
//! Cargo fetches `config.json` once and then one file per crate at a path
//! derived from the crate name. Index files are rendered on demand from the
//! in-memory index; nothing is stored on disk.

use crate::{validation, AppError, AppResult, AppState};
use axum::{
    extract::{Path as AxumPath, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// Name of the registry configuration file at the index root.
pub const CONFIG_FILE: &str = "config.json";

/// Calculate Cargo index path for a crate name according to Cargo's index structure
/// Names are organized in directories: 1/a, 2/ab, 3/a/abc, ab/cd/abcd...
///
/// # Security
/// This function validates the crate name before slicing it, so malformed
/// input is rejected instead of panicking.
pub fn index_path(name: &str) -> AppResult<String> {
    let validated_name = validation::validate_crate_name(name)
        .map_err(|e| AppError::BadRequest(format!("Invalid crate name '{name}': {e}")))?;

    let name = validated_name.to_lowercase();

    let path = match name.len() {
        0 => {
            return Err(AppError::BadRequest(
                "Crate name cannot be empty".to_string(),
            ))
        }
        1 => format!("1/{name}"),
        2 => format!("2/{name}"),
        3 => {
            let first_char = &name[..1];
            format!("3/{first_char}/{name}")
        }
        _ => {
            let first_two = &name[..2];
            let next_two = &name[2..4];
            format!("{first_two}/{next_two}/{name}")
        }
    };

    Ok(path)
}

/// Returns the registry configuration Cargo reads before anything else.
pub async fn config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    debug!("Incoming sparse config request");
    let root = &state.server_addr;

    Json(json!({
        "dl": format!("{root}/crates"),
        "api": root,
    }))
}

/// Serves one sparse index file, or `config.json` at the index root.
///
/// The crate name is the last path segment; the leading segments must be
/// the ones [`index_path`] computes for it (compared case-insensitively).
pub async fn sparse_index(
    AxumPath(path): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> AppResult<Response> {
    if path == CONFIG_FILE {
        return Ok(config(State(state)).await.into_response());
    }

    let not_found = || AppError::NotFound(format!("No index file at '{path}'"));

    let crate_name = path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(not_found)?;

    // Names that cannot be crates have no index file
    let expected = index_path(crate_name).map_err(|_| not_found())?;
    if !expected.eq_ignore_ascii_case(&path) {
        debug!(path = %path, expected = %expected, "Sparse index path does not match crate layout");
        return Err(not_found());
    }

    debug!(crate_name = %crate_name, path = %path, "Incoming sparse index request");
    let lines = state.service.index_lines(crate_name).await?;
    Ok(lines.into_response())
}
