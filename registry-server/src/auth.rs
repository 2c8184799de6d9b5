//! Shared-secret authentication middleware for package uploads
//!
//! When a token is configured, the `Authorization` header must carry exactly
//! that token. Cargo sends the token from its credentials file verbatim, with
//! no `Bearer` prefix.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::{error::AppError, state::AppState};

fn authorization_header(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Middleware to validate authentication for upload endpoints
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.security.token.as_deref() else {
        return Ok(next.run(req).await);
    };

    match authorization_header(&req) {
        Some(token) if token == expected => Ok(next.run(req).await),
        Some(_) => {
            warn!(uri = %req.uri(), "Rejected upload with invalid token");
            Err(AppError::Unauthorized("Invalid token".to_string()))
        }
        None => Err(AppError::Unauthorized(
            "Missing Authorization header".to_string(),
        )),
    }
}

/// Check if authentication is required based on config
pub fn is_auth_required(state: &AppState) -> bool {
    state.config.security.token.is_some()
}
