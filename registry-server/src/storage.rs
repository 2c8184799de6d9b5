use crate::error::{AppError, AppResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Suffix of the scratch file a save is staged in before it is renamed.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Hidden prefix for staging files next to `path`. Every save gets its own
/// randomly named file under this prefix.
fn staging_prefix(path: &Path) -> AppResult<String> {
    let file_name = path.file_name().ok_or_else(|| {
        AppError::InternalError(format!("Cannot save to {}: no file name", path.display()))
    })?;
    Ok(format!(".{}.", file_name.to_string_lossy()))
}

fn write_staged(path: &Path, dir: &Path, prefix: &str, content: &[u8]) -> std::io::Result<()> {
    let mut staged = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(PARTIAL_SUFFIX)
        .tempfile_in(dir)?;
    staged.write_all(content)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Save file content to the specified path atomically
///
/// Content is written to a hidden sibling file and renamed into place, so
/// directory watchers only ever see the complete file appear. Concurrent
/// saves to the same path each stage separately; the last rename wins.
pub async fn save_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> AppResult<()> {
    let path = path.as_ref().to_path_buf();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    // Ensure parent directory exists
    fs::create_dir_all(&dir).await?;
    debug!(parent = %dir.display(), "Created parent directory");

    let prefix = staging_prefix(&path)?;
    let content = content.as_ref().to_vec();
    let size = content.len();

    let target = path.clone();
    tokio::task::spawn_blocking(move || write_staged(&target, &dir, &prefix, &content))
        .await
        .map_err(|e| AppError::InternalError(format!("Save task failed: {e}")))??;

    info!(
        path = %path.display(),
        size,
        "File saved successfully"
    );
    Ok(())
}
