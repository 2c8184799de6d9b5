use std::sync::Arc;

use askama::Template;
use axum::{extract::State, response::Html};
use tracing::{error, warn};

use crate::{auth, cargo, AppError, AppResult, AppState};

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    packages: Vec<PackageLink>,
    server_addr: String,
    auth_required: bool,
    version: String,
}

struct PackageLink {
    name: String,
    index_url: String,
}

/// Render the landing page listing every indexed crate
pub async fn home(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let mut packages = Vec::new();
    for name in state.service.package_names().await {
        match cargo::index_path(&name) {
            Ok(path) => packages.push(PackageLink {
                index_url: format!("{}/sparse/{path}", state.server_addr),
                name,
            }),
            Err(e) => warn!(crate_name = %name, error = %e, "Leaving crate off the landing page"),
        }
    }

    let template = IndexTemplate {
        packages,
        server_addr: state.server_addr.clone(),
        auth_required: auth::is_auth_required(&state),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Ok(Html(template.render().map_err(|e| {
        error!("Template render error: {}", e);
        AppError::InternalError(format!("Template render error: {e}"))
    })?))
}
