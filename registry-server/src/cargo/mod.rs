//! Cargo registry implementation
//!
//! Archive inspection, the publish wire format, archive storage and the
//! sparse index HTTP surface.

mod archive;
mod handlers;
mod manifest;
mod parsing;
mod sparse;
mod storage;

#[cfg(test)]
pub(crate) use archive::build_crate_archive;
pub use archive::{inspect, ArchiveInspector, ManifestSource, MANIFEST_FILE};
pub use handlers::{download_crate, publish_crate};
pub use manifest::{
    render_index_file, Dependency, DependencyKind, IndexRecord, PackageManifest,
    INDEX_SCHEMA_VERSION,
};
pub use parsing::{decode_upload, encode_upload, UploadFrame};
pub use sparse::{config, index_path, sparse_index, CONFIG_FILE};
pub use storage::{
    crate_file_name, crate_file_path, is_crate_archive, save_crate_file, CRATE_EXTENSION,
};
