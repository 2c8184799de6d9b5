//! # Sparse Registry Server
//!
//! A Cargo registry that serves the sparse index protocol straight from a
//! directory of `.crate` archives.
//!
//! ## Features
//!
//! - **Directory-backed**: the archive directory is the only persistent state;
//!   the index is rebuilt from it on startup
//! - **Live**: archives copied into or removed from the directory are picked
//!   up without a restart
//! - **Non-blocking ingestion**: manifests are extracted in the background and
//!   index queries wait for them with a deadline
//! - **Cargo compatible**: `cargo publish`, the sparse index and downloads
//!
//! ## Key Modules
//!
//! - [`index`]: in-memory package index and per-version manifest slots
//! - [`cargo`]: archive inspection, the publish wire format and HTTP handlers
//! - [`watcher`]: keeps the index in step with the archive directory
//! - [`service`]: registry lifecycle and the operations the HTTP layer uses
//! - [`config`]: configuration management and settings
//! - [`error`]: error handling and standardized responses
//! - [`validation`]: security-focused input validation utilities

pub mod auth;
pub mod cargo;
pub mod config;
pub mod error;
pub mod hash_utils;
pub mod index;
pub mod server;
pub mod service;
pub mod state;
pub mod storage;
pub mod ui;
pub mod validation;
pub mod watcher;

// Re-export key types for convenience
pub use config::Config;
pub use error::{ApiErrorResponse, AppError, AppResult, ErrorCode};
pub use hash_utils::{sha256_file, sha256_hash};
pub use index::PackageIndex;
pub use server::{build_router, run_server};
pub use service::RegistryService;
pub use state::AppState;
pub use validation::{
    validate_crate_name, validate_file_size, validate_safe_path, validate_version,
    ValidationError, ValidationResult, MAX_PACKAGE_NAME_LENGTH, MAX_PATH_DEPTH,
    MAX_VERSION_LENGTH,
};
