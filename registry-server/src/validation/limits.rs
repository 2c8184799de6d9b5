//! # Input Validation: Size Limits & Thresholds
//!
//! Limits applied to uploads and client-supplied identifiers to prevent
//! resource exhaustion.

use crate::validation::error::ValidationError;
use crate::validation::error::ValidationResult;

/// Maximum allowed request body size (120 MB), enforced by the HTTP layer
pub const MAX_REQUEST_BODY_SIZE: usize = 120 * 1024 * 1024;

/// Maximum allowed crate archive size (80 MB)
pub const MAX_PACKAGE_FILE_SIZE: u64 = 80 * 1024 * 1024;

/// Maximum allowed metadata block size in an upload frame (1 MB)
pub const MAX_METADATA_SIZE: usize = 1024 * 1024;

/// Maximum allowed crate name length
pub const MAX_PACKAGE_NAME_LENGTH: usize = 64;

/// Maximum allowed version string length
pub const MAX_VERSION_LENGTH: usize = 64;

/// Maximum allowed path depth for relative paths
pub const MAX_PATH_DEPTH: usize = 10;

/// Validate file size against limits.
///
/// # Arguments
///
/// * `size` - The file size in bytes
/// * `max_size` - Optional custom maximum size (defaults to MAX_PACKAGE_FILE_SIZE)
///
/// # Returns
///
/// `Ok(())` if size is acceptable, `Err(ValidationError)` if too large
pub fn validate_file_size(size: u64, max_size: Option<u64>) -> ValidationResult<()> {
    let limit = max_size.unwrap_or(MAX_PACKAGE_FILE_SIZE);

    if size > limit {
        return Err(ValidationError::FileTooLarge {
            actual: size,
            max: limit,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(1024, None).is_ok());
        assert!(validate_file_size(MAX_PACKAGE_FILE_SIZE, None).is_ok());
        assert!(validate_file_size(MAX_PACKAGE_FILE_SIZE + 1, None).is_err());
        assert!(validate_file_size(1024, Some(512)).is_err());
    }
}
