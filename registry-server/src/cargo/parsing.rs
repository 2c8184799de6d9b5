//! Cargo publish payload framing
//!
//! `cargo publish` sends a single binary body:
//!
//! ```text
//! [u32 LE: metadata length M][M bytes: JSON metadata]
//! [u32 LE: archive length L][L bytes: .crate file]
//! ```
//!
//! Both blocks must be exactly the declared size; anything else is a protocol
//! error rather than a silent truncation.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FrameError;
use crate::validation;

const LENGTH_PREFIX: usize = 4;

/// A decoded publish request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFrame {
    pub name: String,
    pub version: String,
    pub archive: Vec<u8>,
}

fn read_length(data: &[u8], offset: usize, what: &str) -> Result<usize, FrameError> {
    let bytes: [u8; LENGTH_PREFIX] = data
        .get(offset..offset + LENGTH_PREFIX)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            FrameError::Framing(format!(
                "payload ends before the {what} length header ({} bytes available after offset {offset})",
                data.len().saturating_sub(offset)
            ))
        })?;
    Ok(u32::from_le_bytes(bytes) as usize)
}

fn required_str(metadata: &Value, field: &str) -> Result<String, FrameError> {
    metadata
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            warn!(field = field, "Publish metadata field missing or not a string");
            FrameError::Metadata(format!("'{field}' field missing or not a string"))
        })
}

/// Decode a complete publish body into name, version and archive bytes.
pub fn decode_upload(data: &[u8]) -> Result<UploadFrame, FrameError> {
    let metadata_len = read_length(data, 0, "metadata")?;

    if metadata_len > validation::MAX_METADATA_SIZE {
        warn!(metadata_len = metadata_len, "Publish metadata section too large");
        return Err(FrameError::Framing(format!(
            "metadata section too large: {} bytes (max: {} bytes)",
            metadata_len,
            validation::MAX_METADATA_SIZE
        )));
    }

    let metadata_end = LENGTH_PREFIX + metadata_len;
    let metadata_bytes = data.get(LENGTH_PREFIX..metadata_end).ok_or_else(|| {
        FrameError::Framing(format!(
            "metadata length {} exceeds the {} bytes remaining",
            metadata_len,
            data.len() - LENGTH_PREFIX
        ))
    })?;

    let metadata: Value = serde_json::from_slice(metadata_bytes).map_err(|e| {
        warn!(error = %e, "Failed to parse publish metadata JSON");
        FrameError::Metadata(format!("invalid metadata JSON: {e}"))
    })?;

    let name = required_str(&metadata, "name")?;
    let version = required_str(&metadata, "vers")?;

    let archive_len = read_length(data, metadata_end, "archive")?;
    let archive = &data[metadata_end + LENGTH_PREFIX..];
    if archive.len() != archive_len {
        warn!(
            declared = archive_len,
            actual = archive.len(),
            "Publish archive size mismatch"
        );
        return Err(FrameError::SizeMismatch {
            declared: archive_len,
            actual: archive.len(),
        });
    }

    debug!(crate_name = %name, version = %version, archive_size = archive.len(), "Decoded publish payload");

    Ok(UploadFrame {
        name,
        version,
        archive: archive.to_vec(),
    })
}

/// Encode a metadata block and archive into a publish body.
pub fn encode_upload(metadata: &[u8], archive: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 * LENGTH_PREFIX + metadata.len() + archive.len());
    payload.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    payload.extend_from_slice(metadata);
    payload.extend_from_slice(&(archive.len() as u32).to_le_bytes());
    payload.extend_from_slice(archive);
    payload
}
