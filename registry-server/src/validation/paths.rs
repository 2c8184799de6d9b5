//! # Input Validation: Path and Filename Validation
//!
//! Every filename the server derives from client input is checked here before
//! it is joined onto the archive directory.

use crate::validation::error::ValidationError;
use crate::validation::limits::MAX_PATH_DEPTH;
use crate::validation::error::ValidationResult;
use std::path::{Path, PathBuf};

/// Characters with special meaning to shells or globbing, never valid in a
/// derived archive filename.
const DANGEROUS_PATTERNS: &[&str] = &[
    "//", "\\\\", "~", "$", "`", "|", "&", ";", "<", ">", "(", ")", "{", "}", "[", "]", "*", "?",
];

/// Validate that a relative path cannot escape the directory it is joined to.
///
/// # Examples
///
/// ```rust
/// use registry_server::validation::paths::validate_safe_path;
///
/// assert!(validate_safe_path("serde-1.0.0.crate").is_ok());
/// assert!(validate_safe_path("../../../etc/passwd").is_err());
/// assert!(validate_safe_path("/etc/passwd").is_err());
/// ```
pub fn validate_safe_path<P: AsRef<Path>>(path: P) -> ValidationResult<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if path_str.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if path_str.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if path.is_absolute() {
        return Err(ValidationError::AbsolutePath {
            path: path_str.to_string(),
        });
    }

    if path_str.contains("..") {
        return Err(ValidationError::PathTraversal {
            path: path_str.to_string(),
        });
    }

    let depth = path.components().count();
    if depth > MAX_PATH_DEPTH {
        return Err(ValidationError::PathTooDeep {
            actual: depth,
            max: MAX_PATH_DEPTH,
        });
    }

    if DANGEROUS_PATTERNS
        .iter()
        .any(|pattern| path_str.contains(pattern))
    {
        return Err(ValidationError::InvalidCharacters {
            input: path_str.to_string(),
        });
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_safe_path() {
        assert!(validate_safe_path("ferris-says-0.3.1.crate").is_ok());
        assert!(validate_safe_path("se/rd/serde").is_ok());

        assert!(validate_safe_path("../../../etc/passwd").is_err());
        assert!(validate_safe_path("/etc/passwd").is_err());
        assert!(validate_safe_path("path/with/../traversal").is_err());
        assert!(validate_safe_path("path/with/null\0byte").is_err());
        assert!(validate_safe_path("name-$(whoami).crate").is_err());
    }
}
