//! Common test utilities and helpers
//!
//! Shared fixtures for the integration tests: a registry over a temporary
//! archive directory, in-memory `.crate` archives and `cargo publish` bodies.

#![allow(dead_code)]

use anyhow::Result;
use axum_test::TestServer;
use flate2::{write::GzEncoder, Compression};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use registry_server::config::Config;
use registry_server::{build_router, AppState, RegistryService};

/// Test registry setup result
pub struct TestSetup {
    pub temp_dir: TempDir,
    pub app_state: Arc<AppState>,
    pub server: TestServer,
}

impl TestSetup {
    pub fn package_dir(&self) -> &Path {
        self.app_state.service.package_dir()
    }

    pub async fn shutdown(self) {
        self.app_state.service.shutdown().await;
    }
}

/// Configuration pointing at `package_dir`, independent of the environment
pub fn test_config(package_dir: &Path, token: Option<&str>) -> Config {
    let mut config = Config::default();
    config.server.host = "localhost".to_string();
    config.server.port = 8080;
    config.server.protocol = "http".to_string();
    config.storage.package_path = package_dir.to_path_buf();
    config.security.token = token.map(str::to_string);
    config.index.resolve_timeout_secs = 5;
    config.index.max_concurrent_extractions = 2;
    config
}

/// Creates an initialized registry over an empty temporary directory
pub async fn create_test_setup(token: Option<&str>) -> Result<TestSetup> {
    let temp_dir = TempDir::new()?;
    create_test_setup_in(temp_dir, token).await
}

/// Creates an initialized registry over an existing directory
pub async fn create_test_setup_in(temp_dir: TempDir, token: Option<&str>) -> Result<TestSetup> {
    let config = test_config(temp_dir.path(), token);
    let service = Arc::new(RegistryService::from_config(&config));
    service.init().await?;

    let app_state = Arc::new(AppState::new(service, config));
    let server = TestServer::new(build_router(app_state.clone()))?;

    Ok(TestSetup {
        temp_dir,
        app_state,
        server,
    })
}

/// Minimal `Cargo.toml` for a crate, with extra TOML appended verbatim
pub fn manifest(name: &str, version: &str, extra: &str) -> String {
    format!("[package]\nname = \"{name}\"\nversion = \"{version}\"\nedition = \"2021\"\n\n{extra}")
}

/// Builds a `.crate` archive holding `<name>-<version>/Cargo.toml`
pub fn build_crate(name: &str, version: &str, extra_manifest: &str) -> Vec<u8> {
    let manifest = manifest(name, version, extra_manifest);
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(manifest.len() as u64);
    header.set_mode(0o644);
    builder
        .append_data(
            &mut header,
            format!("{name}-{version}/Cargo.toml"),
            manifest.as_bytes(),
        )
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

/// Frames an archive the way `cargo publish` sends it
pub fn publish_body(name: &str, version: &str, archive: &[u8]) -> Vec<u8> {
    let metadata = serde_json::to_vec(&json!({
        "name": name,
        "vers": version,
        "deps": [],
        "features": {},
    }))
    .unwrap();

    let mut body = Vec::new();
    body.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    body.extend_from_slice(&metadata);
    body.extend_from_slice(&(archive.len() as u32).to_le_bytes());
    body.extend_from_slice(archive);
    body
}

/// Polls `check` until it returns true or roughly ten seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
