//! In-memory package index
//!
//! The index maps package names to their [`PackageVersionSet`]s and is rebuilt
//! from the archive directory on every start. Loading an archive registers a
//! [`VersionSlot`] immediately and leaves the manifest extraction running in
//! the background; readers wait for the slots they need with a deadline.
//!
//! Structural changes (creating or dropping a package entry, adding or
//! removing a version) all go through one mutex. Reads copy the relevant slots
//! under that mutex and wait on them after releasing it, so a slow extraction
//! never holds up uploads or watcher events.

mod slot;
mod versions;

pub use slot::{SlotOutcome, SlotPublisher, SlotState, VersionSlot};
pub use versions::{PackageVersionSet, ResolvedVersions, VersionSnapshot};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cargo::{is_crate_archive, ManifestSource, PackageManifest, CRATE_EXTENSION};
use crate::error::IndexError;

/// How long a query waits for pending extractions by default.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Split an archive filename into `(name, version)`.
///
/// Everything before the last hyphen is the name and the rest is the version,
/// so `colorchoice-1.0.4.crate` gives `("colorchoice", "1.0.4")`.
pub fn parse_archive_name(path: &Path) -> Result<(String, String), IndexError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IndexError::InvalidArchiveName(path.display().to_string()))?;

    let suffix = format!(".{CRATE_EXTENSION}");
    let stem = file_name.strip_suffix(suffix.as_str()).unwrap_or(file_name);

    match stem.rsplit_once('-') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {
            Ok((name.to_string(), version.to_string()))
        }
        _ => Err(IndexError::InvalidArchiveName(file_name.to_string())),
    }
}

/// Shared index of every package version found in the archive directory.
pub struct PackageIndex {
    packages: Mutex<HashMap<String, PackageVersionSet>>,
    source: Arc<dyn ManifestSource>,
    resolve_timeout: Duration,
}

impl std::fmt::Debug for PackageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageIndex")
            .field("resolve_timeout", &self.resolve_timeout)
            .finish_non_exhaustive()
    }
}

impl PackageIndex {
    pub fn new(source: Arc<dyn ManifestSource>) -> Self {
        Self::with_timeout(source, DEFAULT_RESOLVE_TIMEOUT)
    }

    pub fn with_timeout(source: Arc<dyn ManifestSource>, resolve_timeout: Duration) -> Self {
        Self {
            packages: Mutex::new(HashMap::new()),
            source,
            resolve_timeout,
        }
    }

    pub fn resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    /// Manifests for every version of `name`, or `None` if the name is unknown.
    ///
    /// Fails if any version is still being extracted when the timeout elapses
    /// or if any extraction failed.
    pub async fn find_package(&self, name: &str) -> Result<Option<ResolvedVersions>, IndexError> {
        let snapshot = {
            let packages = self.packages.lock().await;
            match packages.get(name) {
                Some(set) => set.snapshot(),
                None => return Ok(None),
            }
        };

        snapshot.resolve(self.resolve_timeout).await.map(Some)
    }

    /// Manifest for a single version, or `None` if that version is not indexed.
    ///
    /// Unlike [`find_package`](Self::find_package) this only waits on the one
    /// slot, so a broken sibling version does not affect the answer.
    pub async fn find_version(
        &self,
        name: &str,
        version: &str,
    ) -> Result<Option<Arc<PackageManifest>>, IndexError> {
        let slot = {
            let packages = self.packages.lock().await;
            match packages.get(name).and_then(|set| set.slot(version)) {
                Some(slot) => slot.clone(),
                None => return Ok(None),
            }
        };

        match slot.wait_until(Instant::now() + self.resolve_timeout).await {
            SlotOutcome::Ready(manifest) => Ok(Some(manifest)),
            SlotOutcome::Failed(source) => Err(IndexError::Extraction {
                name: name.to_string(),
                version: version.to_string(),
                source,
            }),
            SlotOutcome::StillPending => Err(IndexError::ResolutionTimeout {
                name: name.to_string(),
                version: version.to_string(),
                timeout: self.resolve_timeout,
            }),
        }
    }

    /// Names of all indexed packages, sorted.
    pub async fn package_names(&self) -> Vec<String> {
        let packages = self.packages.lock().await;
        let mut names: Vec<String> = packages.keys().cloned().collect();
        names.sort();
        names
    }

    /// Register `archive` and start extracting its manifest.
    ///
    /// Returns as soon as the slot is registered. Loading the same archive
    /// again replaces the existing slot for that version.
    pub async fn load(&self, archive: &Path) -> Result<(), IndexError> {
        let (name, version) = parse_archive_name(archive)?;
        let slot = self.spawn_extraction(archive.to_path_buf(), name.clone(), version.clone());

        let mut packages = self.packages.lock().await;
        packages
            .entry(name.clone())
            .or_insert_with(|| PackageVersionSet::new(name.clone()))
            .add_version(version.clone(), slot);
        drop(packages);

        info!(
            crate_name = %name,
            version = %version,
            archive = %archive.display(),
            "Archive accepted for indexing"
        );
        Ok(())
    }

    /// Forget the version stored in `archive`, dropping the package once it
    /// has no versions left.
    pub async fn unlist(&self, archive: &Path) -> Result<(), IndexError> {
        let (name, version) = parse_archive_name(archive)?;

        let mut packages = self.packages.lock().await;
        let Some(set) = packages.get_mut(&name) else {
            debug!(crate_name = %name, version = %version, "Unlist for unknown package ignored");
            return Ok(());
        };

        let removed = set.remove_version(&version);
        if set.is_empty() {
            packages.remove(&name);
        }
        drop(packages);

        if removed {
            info!(crate_name = %name, version = %version, "Version removed from index");
        } else {
            debug!(crate_name = %name, version = %version, "Unlist for unknown version ignored");
        }
        Ok(())
    }

    /// Load every archive found directly inside `dir`.
    ///
    /// Badly named archives are logged and skipped. Returns how many archives
    /// were registered.
    pub async fn bulk_load(&self, dir: &Path) -> std::io::Result<usize> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut loaded = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_crate_archive(&path) || !entry.file_type().await?.is_file() {
                continue;
            }

            match self.load(&path).await {
                Ok(()) => loaded += 1,
                Err(e) => warn!(archive = %path.display(), error = %e, "Skipping archive"),
            }
        }

        info!(dir = %dir.display(), archives = loaded, "Bulk load finished");
        Ok(loaded)
    }

    fn spawn_extraction(&self, archive: PathBuf, name: String, version: String) -> VersionSlot {
        let source = Arc::clone(&self.source);
        let slot_path = archive.clone();

        VersionSlot::spawn(slot_path, async move {
            let outcome = source.fetch(&archive).await;
            match &outcome {
                Ok(manifest) => {
                    if manifest.name != name || manifest.version != version {
                        warn!(
                            archive = %archive.display(),
                            crate_name = %name,
                            version = %version,
                            manifest_name = %manifest.name,
                            manifest_version = %manifest.version,
                            "Manifest identity differs from archive filename"
                        );
                    }
                    debug!(crate_name = %name, version = %version, "Extraction completed");
                }
                Err(e) => {
                    warn!(crate_name = %name, version = %version, error = %e, "Extraction failed");
                }
            }
            outcome
        })
    }
}
