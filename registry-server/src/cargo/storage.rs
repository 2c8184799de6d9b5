//! Cargo file storage operations
//!
//! Archives live flat in one directory as `<name>-<version>.crate`. That
//! directory is both the upload target and the source the index is rebuilt
//! from.

use crate::{storage, validation, AppError, AppResult};
use std::path::{Path, PathBuf};

/// File extension of crate archives.
pub const CRATE_EXTENSION: &str = "crate";

/// Canonical archive filename for a name/version pair.
pub fn crate_file_name(crate_name: &str, version: &str) -> String {
    format!("{crate_name}-{version}.{CRATE_EXTENSION}")
}

/// Whether a path names a crate archive.
pub fn is_crate_archive(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == CRATE_EXTENSION)
}

/// Resolve the on-disk location of an archive after validating its parts.
pub fn crate_file_path(crate_name: &str, version: &str, crates_dir: &Path) -> AppResult<PathBuf> {
    validation::validate_crate_name(crate_name)
        .map_err(|e| AppError::BadRequest(format!("Invalid crate name '{crate_name}': {e}")))?;
    validation::validate_version(version)
        .map_err(|e| AppError::BadRequest(format!("Invalid version '{version}': {e}")))?;

    let filename = crate_file_name(crate_name, version);

    // Validate the constructed filename path
    validation::validate_safe_path(&filename).map_err(|e| {
        AppError::BadRequest(format!("Generated unsafe filename '{filename}': {e}"))
    })?;

    Ok(crates_dir.join(filename))
}

/// Save crate file to the archive directory
pub async fn save_crate_file(
    data: &[u8],
    crate_name: &str,
    version: &str,
    crates_dir: &Path,
) -> AppResult<PathBuf> {
    validation::validate_file_size(data.len() as u64, None)
        .map_err(|e| AppError::BadRequest(format!("Crate archive rejected: {e}")))?;

    let crate_path = crate_file_path(crate_name, version, crates_dir)?;
    storage::save_file(&crate_path, data).await?;

    Ok(crate_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_file_name() {
        assert_eq!(crate_file_name("colorchoice", "1.0.4"), "colorchoice-1.0.4.crate");
    }

    #[test]
    fn test_is_crate_archive() {
        assert!(is_crate_archive(Path::new("/data/serde-1.0.0.crate")));
        assert!(!is_crate_archive(Path::new("/data/.serde-1.0.0.crate.part")));
        assert!(!is_crate_archive(Path::new("/data/README.md")));
        assert!(!is_crate_archive(Path::new("/data/crate")));
    }

    #[test]
    fn test_crate_file_path_rejects_traversal() {
        let dir = Path::new("/data");
        assert_eq!(
            crate_file_path("serde", "1.0.0", dir).unwrap(),
            Path::new("/data/serde-1.0.0.crate")
        );
        assert!(crate_file_path("../serde", "1.0.0", dir).is_err());
        assert!(crate_file_path("serde", "../../1.0.0", dir).is_err());
    }

    #[tokio::test]
    async fn test_save_crate_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_crate_file(b"bytes", "sample", "1.1.0", dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("sample-1.1.0.crate"));
        assert_eq!(std::fs::read(path).unwrap(), b"bytes");
    }
}
