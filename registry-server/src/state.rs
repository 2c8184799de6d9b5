//! # Application State Management
//!
//! Shared state handed to every request handler.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use registry_server::{config::Config, service::RegistryService, state::AppState};
//!
//! let config = Config::default();
//! let service = Arc::new(RegistryService::from_config(&config));
//! let state = Arc::new(AppState::new(service, config));
//! ```

use crate::config::Config;
use crate::service::RegistryService;
use std::sync::Arc;

/// Application state containing the registry service and configuration.
///
/// Wrapped in an `Arc` and shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Index, archive directory and watcher
    pub service: Arc<RegistryService>,
    /// Application configuration
    pub config: Arc<Config>,
    /// Full server address including scheme, host, and port (e.g., "http://localhost:8000")
    pub server_addr: String,
}

impl AppState {
    pub fn new(service: Arc<RegistryService>, config: Config) -> Self {
        let server_addr = config.root_url();
        Self {
            service,
            config: Arc::new(config),
            server_addr,
        }
    }
}
