//! Crate archive inspection
//!
//! Turns a `.crate` file on disk into a [`PackageManifest`]. The work is
//! blocking (gzip decompression, unpacking into a scratch directory and a full
//! pass over the file for the checksum), so async callers go through
//! [`ArchiveInspector`], which runs it on tokio's blocking pool behind a
//! concurrency limit.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use tokio::sync::Semaphore;
use tracing::debug;

use super::PackageManifest;
use crate::error::ExtractionError;
use crate::hash_utils::sha256_file;

/// Name of the manifest expected at `<archive-stem>/Cargo.toml`.
pub const MANIFEST_FILE: &str = "Cargo.toml";

/// Produces the manifest for an archive path.
///
/// [`PackageIndex`](crate::index::PackageIndex) schedules one `fetch` per
/// loaded archive; implementations decide where the work runs.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch(&self, archive: &Path) -> Result<PackageManifest, ExtractionError>;
}

/// Inspect an archive synchronously.
///
/// The archive is unpacked into a private temporary directory that is removed
/// on return. The checksum covers the original compressed bytes, not the
/// extracted tree.
pub fn inspect(archive: &Path) -> Result<PackageManifest, ExtractionError> {
    let io_error = |source: std::io::Error| ExtractionError::Io {
        path: archive.to_path_buf(),
        source,
    };

    let stem = archive
        .file_stem()
        .ok_or_else(|| ExtractionError::ManifestNotFound(archive.to_path_buf()))?;

    let workdir = tempfile::tempdir().map_err(io_error)?;
    let file = File::open(archive).map_err(io_error)?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(workdir.path())
        .map_err(io_error)?;

    let manifest_path = workdir.path().join(stem).join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Err(ExtractionError::ManifestNotFound(manifest_location(
            archive, stem,
        )));
    }

    let source = fs::read_to_string(&manifest_path).map_err(io_error)?;
    let checksum = sha256_file(archive).map_err(io_error)?;

    let manifest = PackageManifest::from_toml(&source, checksum).map_err(|source| {
        ExtractionError::InvalidManifest {
            path: archive.to_path_buf(),
            source,
        }
    })?;

    debug!(
        archive = %archive.display(),
        crate_name = %manifest.name,
        version = %manifest.version,
        dependencies = manifest.dependencies.len(),
        "Inspected crate archive"
    );
    Ok(manifest)
}

fn manifest_location(archive: &Path, stem: &std::ffi::OsStr) -> PathBuf {
    archive.join(stem).join(MANIFEST_FILE)
}

/// Runs [`inspect`] off the async scheduler with bounded parallelism.
#[derive(Debug, Clone)]
pub struct ArchiveInspector {
    permits: Arc<Semaphore>,
}

impl ArchiveInspector {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }
}

impl Default for ArchiveInspector {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[async_trait]
impl ManifestSource for ArchiveInspector {
    async fn fetch(&self, archive: &Path) -> Result<PackageManifest, ExtractionError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ExtractionError::Aborted(archive.to_path_buf()))?;

        let path = archive.to_path_buf();
        tokio::task::spawn_blocking(move || inspect(&path))
            .await
            .map_err(|_| ExtractionError::Aborted(archive.to_path_buf()))?
    }
}

/// Build an in-memory `.crate` containing a single manifest.
#[cfg(test)]
pub(crate) fn build_crate_archive(dir_name: &str, manifest: &str) -> Vec<u8> {
    use flate2::{write::GzEncoder, Compression};

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(manifest.len() as u64);
    header.set_mode(0o644);
    builder
        .append_data(
            &mut header,
            format!("{dir_name}/{MANIFEST_FILE}"),
            manifest.as_bytes(),
        )
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_utils::sha256_hash;

    fn sample_manifest(name: &str, version: &str) -> String {
        format!(
            "[package]\nname = \"{name}\"\nversion = \"{version}\"\n\n[dependencies]\nserde = {{ version = \"1\", features = [\"derive\"] }}\n"
        )
    }

    #[test]
    fn test_inspect_reads_manifest_and_checksums_archive() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_crate_archive("sample-1.1.0", &sample_manifest("sample", "1.1.0"));
        let path = dir.path().join("sample-1.1.0.crate");
        std::fs::write(&path, &bytes).unwrap();

        let manifest = inspect(&path).unwrap();
        assert_eq!(manifest.name, "sample");
        assert_eq!(manifest.version, "1.1.0");
        assert_eq!(manifest.checksum, sha256_hash(&bytes));
        assert_eq!(manifest.dependencies.len(), 1);
        assert_eq!(manifest.dependencies[0].features, vec!["derive".to_string()]);
    }

    #[test]
    fn test_inspect_uses_manifest_identity_not_filename() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_crate_archive("renamed-0.1.0", &sample_manifest("actual", "9.9.9"));
        let path = dir.path().join("renamed-0.1.0.crate");
        std::fs::write(&path, &bytes).unwrap();

        let manifest = inspect(&path).unwrap();
        assert_eq!(manifest.name, "actual");
        assert_eq!(manifest.version, "9.9.9");
    }

    #[test]
    fn test_inspect_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        // Packaged under a directory that does not match the archive stem
        let bytes = build_crate_archive("other-0.1.0", &sample_manifest("other", "0.1.0"));
        let path = dir.path().join("sample-1.1.0.crate");
        std::fs::write(&path, &bytes).unwrap();

        let err = inspect(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::ManifestNotFound(_)));
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk-0.1.0.crate");
        std::fs::write(&path, b"definitely not gzip").unwrap();

        let err = inspect(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::Io { .. }));
    }

    #[test]
    fn test_inspect_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_crate_archive("broken-0.1.0", "[package\nname = ");
        let path = dir.path().join("broken-0.1.0.crate");
        std::fs::write(&path, &bytes).unwrap();

        let err = inspect(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidManifest { .. }));
    }

    #[tokio::test]
    async fn test_archive_inspector_runs_off_thread() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = build_crate_archive("sample-1.1.0", &sample_manifest("sample", "1.1.0"));
        let path = dir.path().join("sample-1.1.0.crate");
        std::fs::write(&path, &bytes).unwrap();

        let inspector = ArchiveInspector::new(2);
        let manifest = inspector.fetch(&path).await.unwrap();
        assert_eq!(manifest.name, "sample");

        let missing = inspector.fetch(&dir.path().join("absent-1.0.0.crate")).await;
        assert!(matches!(missing, Err(ExtractionError::Io { .. })));
    }
}
