//! Package manifest model and sparse index records
//!
//! A [`PackageManifest`] is what the index knows about one published version:
//! the `[package]` identity read from the `Cargo.toml` packaged inside the
//! archive, the checksum of the archive itself, and the dependency and feature
//! tables flattened into the shape Cargo's sparse index expects.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Index schema version written into every record.
pub const INDEX_SCHEMA_VERSION: u32 = 2;

/// Dependency kind as reported in the index.
///
/// Only normal dependencies are indexed; dev and build dependency tables are
/// not read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Normal,
}

/// One entry of a version's `deps` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub name: String,
    pub req: String,
    pub features: Vec<String>,
    pub optional: bool,
    pub default_features: bool,
    /// Always `None`: target-specific tables are merged into the plain
    /// dependency list and their platform qualifier is not kept.
    pub target: Option<String>,
    pub kind: DependencyKind,
}

/// Metadata for one version of one crate, derived from its archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    /// Hex-encoded SHA-256 of the archive file as served for download
    pub checksum: String,
    pub dependencies: Vec<Dependency>,
    pub features: IndexMap<String, Vec<String>>,
}

/// A single line of a sparse index file.
#[derive(Debug, Serialize)]
pub struct IndexRecord<'a> {
    pub name: &'a str,
    pub vers: &'a str,
    pub deps: &'a [Dependency],
    pub cksum: &'a str,
    pub v: u32,
    pub yanked: bool,
    pub features2: &'a IndexMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct RawManifest {
    package: RawPackage,
    #[serde(default)]
    dependencies: IndexMap<String, RawDependency>,
    #[serde(default)]
    target: IndexMap<String, RawTarget>,
    #[serde(default)]
    features: IndexMap<String, Vec<String>>,
}

#[derive(Deserialize)]
struct RawPackage {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct RawTarget {
    #[serde(default)]
    dependencies: IndexMap<String, RawDependency>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Version(String),
    Detailed(DetailedDependency),
}

#[derive(Deserialize)]
struct DetailedDependency {
    version: Option<String>,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default, rename = "default-features", alias = "default_features")]
    default_features: bool,
}

impl RawDependency {
    fn into_dependency(self, name: String) -> Dependency {
        let (req, features, optional, default_features) = match self {
            RawDependency::Version(req) => (req, Vec::new(), false, false),
            RawDependency::Detailed(detail) => (
                detail.version.unwrap_or_else(|| "*".to_string()),
                detail.features,
                detail.optional,
                detail.default_features,
            ),
        };

        Dependency {
            name,
            req,
            features,
            optional,
            default_features,
            target: None,
            kind: DependencyKind::Normal,
        }
    }
}

impl PackageManifest {
    /// Build a manifest from the text of a packaged `Cargo.toml`.
    ///
    /// `[target.<cfg>.dependencies]` tables are folded into the normal
    /// dependency list in document order; a later table overrides an earlier
    /// entry with the same name while keeping its position.
    pub fn from_toml(source: &str, checksum: String) -> Result<Self, toml::de::Error> {
        let raw: RawManifest = toml::from_str(source)?;

        let mut merged = raw.dependencies;
        for (_, target) in raw.target {
            merged.extend(target.dependencies);
        }

        let dependencies = merged
            .into_iter()
            .map(|(name, dep)| dep.into_dependency(name))
            .collect();

        Ok(Self {
            name: raw.package.name,
            version: raw.package.version,
            checksum,
            dependencies,
            features: raw.features,
        })
    }

    pub fn index_record(&self) -> IndexRecord<'_> {
        IndexRecord {
            name: &self.name,
            vers: &self.version,
            deps: &self.dependencies,
            cksum: &self.checksum,
            v: INDEX_SCHEMA_VERSION,
            yanked: false,
            features2: &self.features,
        }
    }
}

/// Render manifests as a newline-delimited sparse index file.
pub fn render_index_file<'a, I>(manifests: I) -> Result<String, serde_json::Error>
where
    I: IntoIterator<Item = &'a PackageManifest>,
{
    let lines = manifests
        .into_iter()
        .map(|manifest| serde_json::to_string(&manifest.index_record()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}
