//! # Input Validation Utilities
//!
//! Security-focused checks applied to everything a client controls before it
//! reaches the filesystem: crate names, versions, derived filenames and the
//! sizes declared in upload frames.

pub mod error;
pub mod limits;
pub mod manifests;
pub mod paths;

pub use self::{
    error::{ValidationError, ValidationResult},
    limits::{
        validate_file_size, MAX_METADATA_SIZE, MAX_PACKAGE_FILE_SIZE, MAX_PACKAGE_NAME_LENGTH,
        MAX_PATH_DEPTH, MAX_REQUEST_BODY_SIZE, MAX_VERSION_LENGTH,
    },
    manifests::{validate_crate_name, validate_version},
    paths::validate_safe_path,
};
