//! # Input Validation: Crate Names and Versions
//!
//! Names and versions end up in filenames (`<name>-<version>.crate`), so both
//! are restricted to characters that cannot escape the archive directory and
//! that keep the filename splittable at its last hyphen.

use crate::validation::error::ValidationError;
use crate::validation::limits::{MAX_PACKAGE_NAME_LENGTH, MAX_VERSION_LENGTH};
use crate::validation::error::ValidationResult;

fn check_common(input: &str, max: usize) -> ValidationResult<()> {
    if input.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if input.len() > max {
        return Err(ValidationError::TooLong {
            actual: input.len(),
            max,
        });
    }

    if input.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if input.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    Ok(())
}

/// Validate a crate name according to Cargo rules.
///
/// Cargo allows ASCII letters, digits, hyphens and underscores, and the first
/// character must be a letter.
///
/// # Returns
///
/// `Ok(String)` with the validated name, `Err(ValidationError)` if invalid
pub fn validate_crate_name(name: &str) -> ValidationResult<String> {
    check_common(name, MAX_PACKAGE_NAME_LENGTH)?;

    if name
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_'))
    {
        return Err(ValidationError::InvalidCharacters {
            input: name.to_string(),
        });
    }

    if !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            reason: "Crate names must start with a letter".to_string(),
        });
    }

    Ok(name.to_string())
}

/// Validate a version string for use in an archive filename.
///
/// Letters, digits, dots, underscores and `+` are accepted. Hyphens are
/// rejected: the archive naming convention splits `<name>-<version>` at the
/// last hyphen, so a hyphenated version would be re-indexed under the wrong
/// key when the directory is rescanned.
///
/// # Returns
///
/// `Ok(String)` with the validated version, `Err(ValidationError)` if invalid
pub fn validate_version(version: &str) -> ValidationResult<String> {
    check_common(version, MAX_VERSION_LENGTH)?;

    if version.contains('-') {
        return Err(ValidationError::InvalidFormat {
            reason: "Versions containing '-' cannot be stored as <name>-<version>.crate"
                .to_string(),
        });
    }

    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+'))
    {
        return Err(ValidationError::InvalidCharacters {
            input: version.to_string(),
        });
    }

    Ok(version.to_string())
}
