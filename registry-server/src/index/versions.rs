use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;

use super::slot::{SlotOutcome, VersionSlot};
use crate::cargo::PackageManifest;
use crate::error::IndexError;

/// Manifests of every version of one package, keyed by version string.
pub type ResolvedVersions = IndexMap<String, Arc<PackageManifest>>;

/// All known versions of a single package.
#[derive(Debug, Clone)]
pub struct PackageVersionSet {
    name: String,
    versions: IndexMap<String, VersionSlot>,
}

impl PackageVersionSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert the slot for `version`, replacing any slot already registered.
    pub fn add_version(&mut self, version: impl Into<String>, slot: VersionSlot) {
        self.versions.insert(version.into(), slot);
    }

    /// Remove the slot for `version`. Returns whether it was present.
    pub fn remove_version(&mut self, version: &str) -> bool {
        self.versions.shift_remove(version).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn slot(&self, version: &str) -> Option<&VersionSlot> {
        self.versions.get(version)
    }

    /// Capture the current slots so they can be awaited without holding
    /// whatever lock guards this set.
    pub fn snapshot(&self) -> VersionSnapshot {
        VersionSnapshot {
            name: self.name.clone(),
            slots: self
                .versions
                .iter()
                .map(|(version, slot)| (version.clone(), slot.clone()))
                .collect(),
        }
    }

    pub async fn resolve_all(&self, timeout: Duration) -> Result<ResolvedVersions, IndexError> {
        self.snapshot().resolve(timeout).await
    }
}

/// Point-in-time copy of a [`PackageVersionSet`]'s slots.
#[derive(Debug, Clone)]
pub struct VersionSnapshot {
    name: String,
    slots: Vec<(String, VersionSlot)>,
}

impl VersionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Wait for every slot, sharing one deadline across the whole call.
    ///
    /// All or nothing: a single slot still pending at the deadline fails the
    /// call with [`IndexError::ResolutionTimeout`] and the ready versions are
    /// discarded. A failed extraction is reported ahead of a timeout.
    pub async fn resolve(self, timeout: Duration) -> Result<ResolvedVersions, IndexError> {
        let deadline = Instant::now() + timeout;
        let mut resolved = IndexMap::with_capacity(self.slots.len());
        let mut pending_version = None;

        for (version, slot) in self.slots {
            match slot.wait_until(deadline).await {
                SlotOutcome::Ready(manifest) => {
                    resolved.insert(version, manifest);
                }
                SlotOutcome::Failed(source) => {
                    return Err(IndexError::Extraction {
                        name: self.name,
                        version,
                        source,
                    });
                }
                SlotOutcome::StillPending => {
                    pending_version.get_or_insert(version);
                }
            }
        }

        match pending_version {
            Some(version) => Err(IndexError::ResolutionTimeout {
                name: self.name,
                version,
                timeout,
            }),
            None => Ok(resolved),
        }
    }
}
