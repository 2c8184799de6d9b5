//! # Registry Service
//!
//! Ties the archive directory, the [`PackageIndex`] and the
//! [`DirectoryWatcher`] together behind the operations the HTTP layer needs.
//!
//! The service is constructed explicitly and handed to the router through
//! [`AppState`](crate::state::AppState). [`RegistryService::init`] performs
//! the startup scan and starts the watcher; [`RegistryService::shutdown`]
//! stops the watcher and applies any events it had already queued.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cargo::{self, decode_upload, render_index_file, ArchiveInspector, ManifestSource};
use crate::config::Config;
use crate::error::{AppError, AppResult, IndexError};
use crate::index::PackageIndex;
use crate::validation;
use crate::watcher::{DirectoryWatcher, DEFAULT_QUEUE_CAPACITY};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedCrate {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

pub struct RegistryService {
    package_dir: PathBuf,
    index: Arc<PackageIndex>,
    watch_queue_capacity: usize,
    watcher: Mutex<Option<DirectoryWatcher>>,
}

impl std::fmt::Debug for RegistryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryService")
            .field("package_dir", &self.package_dir)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl RegistryService {
    pub fn new(package_dir: impl Into<PathBuf>, index: Arc<PackageIndex>) -> Self {
        Self {
            package_dir: package_dir.into(),
            index,
            watch_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            watcher: Mutex::new(None),
        }
    }

    /// Build the service and its index from configuration.
    pub fn from_config(config: &Config) -> Self {
        let source: Arc<dyn ManifestSource> =
            Arc::new(ArchiveInspector::new(config.index.max_concurrent_extractions));
        let index = Arc::new(PackageIndex::with_timeout(source, config.resolve_timeout()));

        let mut service = Self::new(&config.storage.package_path, index);
        service.watch_queue_capacity = config.index.watch_queue_capacity;
        service
    }

    pub fn package_dir(&self) -> &Path {
        &self.package_dir
    }

    pub fn index(&self) -> &Arc<PackageIndex> {
        &self.index
    }

    /// Create the archive directory if needed, start following changes and
    /// index everything already in it. Returns the number of archives found.
    ///
    /// Calling `init` again rescans the directory but keeps the running watcher.
    pub async fn init(&self) -> anyhow::Result<usize> {
        tokio::fs::create_dir_all(&self.package_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.package_dir.display()))?;

        // Watch before scanning so nothing dropped in during the scan is missed
        let mut watcher = self.watcher.lock().await;
        if watcher.is_none() {
            *watcher = Some(DirectoryWatcher::start(
                &self.package_dir,
                Arc::clone(&self.index),
                self.watch_queue_capacity,
            )?);
        }
        drop(watcher);

        let loaded = self
            .index
            .bulk_load(&self.package_dir)
            .await
            .with_context(|| format!("Failed to scan {}", self.package_dir.display()))?;

        info!(
            package_dir = %self.package_dir.display(),
            archives = loaded,
            "Registry initialized"
        );
        Ok(loaded)
    }

    /// Stop the directory watcher. Extractions already running are left to
    /// finish on their own.
    pub async fn shutdown(&self) {
        let watcher = self.watcher.lock().await.take();
        if let Some(watcher) = watcher {
            watcher.shutdown().await;
        }
        info!("Registry shut down");
    }

    /// Accept a `cargo publish` body.
    ///
    /// The duplicate check and the write are separate steps, so two
    /// concurrent uploads of the same version can both succeed; the later
    /// write wins.
    pub async fn publish(&self, body: &[u8]) -> AppResult<PublishedCrate> {
        let frame = decode_upload(body)?;

        validation::validate_crate_name(&frame.name)
            .map_err(|e| AppError::BadRequest(format!("Invalid crate name '{}': {e}", frame.name)))?;
        validation::validate_version(&frame.version).map_err(|e| {
            AppError::BadRequest(format!("Invalid version '{}': {e}", frame.version))
        })?;

        match self.index.find_version(&frame.name, &frame.version).await {
            Ok(Some(_)) => {
                warn!(crate_name = %frame.name, version = %frame.version, "Rejected duplicate upload");
                return Err(AppError::Conflict(format!(
                    "Crate '{}' version {} already exists",
                    frame.name, frame.version
                )));
            }
            Ok(None) => {}
            // A broken archive may be replaced by a fresh upload
            Err(IndexError::Extraction { source, .. }) => {
                warn!(
                    crate_name = %frame.name,
                    version = %frame.version,
                    error = %source,
                    "Replacing archive that failed to index"
                );
            }
            Err(e) => return Err(e.into()),
        }

        let path =
            cargo::save_crate_file(&frame.archive, &frame.name, &frame.version, &self.package_dir)
                .await?;
        self.index.load(&path).await?;

        info!(
            crate_name = %frame.name,
            version = %frame.version,
            size = frame.archive.len(),
            "Crate published"
        );
        Ok(PublishedCrate {
            name: frame.name,
            version: frame.version,
            path,
        })
    }

    /// Newline-delimited index records for every version of `name`.
    ///
    /// Cargo requests index files with lowercased names, so a name that is
    /// not indexed verbatim is matched case-insensitively.
    pub async fn index_lines(&self, name: &str) -> AppResult<String> {
        let mut versions = self.index.find_package(name).await?;
        if versions.is_none() {
            let matched = self
                .index
                .package_names()
                .await
                .into_iter()
                .find(|known| known.eq_ignore_ascii_case(name));
            if let Some(known) = matched {
                versions = self.index.find_package(&known).await?;
            }
        }

        let versions = versions
            .filter(|versions| !versions.is_empty())
            .ok_or_else(|| AppError::NotFound(format!("Crate '{name}' not found")))?;

        Ok(render_index_file(versions.values().map(Arc::as_ref))?)
    }

    /// Location of an existing archive.
    pub async fn archive_path(&self, name: &str, version: &str) -> AppResult<PathBuf> {
        let not_found =
            || AppError::NotFound(format!("Crate '{name}' version {version} not found"));

        // A name or version that could never have been stored is simply absent
        let path =
            cargo::crate_file_path(name, version, &self.package_dir).map_err(|_| not_found())?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(not_found()),
        }
    }

    pub async fn package_names(&self) -> Vec<String> {
        self.index.package_names().await
    }
}
