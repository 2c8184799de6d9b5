//! # Configuration Management
//!
//! Runtime settings for the registry server. The configuration is a JSON
//! document with four sections:
//!
//! - [`ServerConfig`]: bind address and the scheme used in generated URLs
//! - [`StorageConfig`]: the archive directory
//! - [`SecurityConfig`]: the shared upload token
//! - [`IndexConfig`]: index timeouts and background work limits
//!
//! Every field is optional. Missing fields take their value from the
//! `REGISTRY_*` environment variables, then from built-in defaults.
//!
//! ```rust,no_run
//! # use registry_server::config::Config;
//! // Load from file with fallback to defaults
//! let config = Config::load_or_default("config.json")?;
//!
//! // Load from file (fails if file doesn't exist)
//! let config = Config::load("config.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for the registry server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

/// Network settings for the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host/IP address to bind to, also used in generated URLs
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// URL scheme ("http" or "https")
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

/// Where crate archives are stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `<name>-<version>.crate` files; scanned and watched
    #[serde(default = "default_package_path")]
    pub package_path: PathBuf,
}

/// Upload authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret compared against the raw `Authorization` header.
    /// Uploads are open when unset.
    #[serde(default = "default_token")]
    pub token: Option<String>,
}

/// Index behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// How long an index query waits for pending extractions
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,
    /// Upper bound on archives inspected at the same time
    #[serde(default = "default_max_concurrent_extractions")]
    pub max_concurrent_extractions: usize,
    /// Capacity of the directory watcher's event queue
    #[serde(default = "default_watch_queue_capacity")]
    pub watch_queue_capacity: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(fallback)
}

fn default_host() -> String {
    env_or("REGISTRY_HOST", "localhost".to_string())
}

fn default_port() -> u16 {
    env_or("REGISTRY_PORT", 8000)
}

fn default_protocol() -> String {
    env_or("REGISTRY_PROTOCOL", "http".to_string())
}

fn default_package_path() -> PathBuf {
    env_or("REGISTRY_PACKAGE_PATH", PathBuf::from("./packages"))
}

fn default_token() -> Option<String> {
    std::env::var("REGISTRY_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
}

fn default_resolve_timeout_secs() -> u64 {
    10
}

fn default_max_concurrent_extractions() -> usize {
    num_cpus::get()
}

fn default_watch_queue_capacity() -> usize {
    crate::watcher::DEFAULT_QUEUE_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            package_path: default_package_path(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: default_resolve_timeout_secs(),
            max_concurrent_extractions: default_max_concurrent_extractions(),
            watch_queue_capacity: default_watch_queue_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not valid configuration JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let config_str = fs::read_to_string(path)?;
        let config = serde_json::from_str(&config_str)?;
        Ok(config)
    }

    /// Load configuration from file, or use the defaults if it doesn't exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Base URL clients use to reach this server, e.g. `http://localhost:8000`.
    pub fn root_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.server.protocol, self.server.host, self.server.port
        )
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.index.resolve_timeout_secs)
    }
}
