//! Publish-once holder for one version's manifest.
//!
//! A slot starts [`SlotState::Pending`] and is moved to `Completed` or `Failed`
//! exactly once by its [`SlotPublisher`]. Readers clone the slot freely and
//! wait on it with a deadline. A publisher dropped without publishing (the
//! extraction task panicked or was torn down) reads as an aborted extraction.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::cargo::PackageManifest;
use crate::error::ExtractionError;

/// Observable state of a [`VersionSlot`].
#[derive(Debug, Clone)]
pub enum SlotState {
    Pending,
    Completed(Arc<PackageManifest>),
    Failed(Arc<ExtractionError>),
}

impl SlotState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SlotState::Pending)
    }
}

/// Outcome of waiting on a slot until a deadline.
#[derive(Debug, Clone)]
pub enum SlotOutcome {
    Ready(Arc<PackageManifest>),
    Failed(Arc<ExtractionError>),
    StillPending,
}

/// Read side of a pending-or-finished manifest computation.
#[derive(Debug, Clone)]
pub struct VersionSlot {
    archive: PathBuf,
    state: watch::Receiver<SlotState>,
}

/// Write side of a [`VersionSlot`]; consumed by publishing.
#[derive(Debug)]
pub struct SlotPublisher {
    state: watch::Sender<SlotState>,
}

impl SlotPublisher {
    pub fn publish(self, outcome: Result<PackageManifest, ExtractionError>) {
        let state = match outcome {
            Ok(manifest) => SlotState::Completed(Arc::new(manifest)),
            Err(error) => SlotState::Failed(Arc::new(error)),
        };
        self.state.send_replace(state);
    }
}

impl VersionSlot {
    /// Create an unpublished slot for `archive` and the handle that completes it.
    pub fn pending(archive: impl Into<PathBuf>) -> (Self, SlotPublisher) {
        let (tx, rx) = watch::channel(SlotState::Pending);
        (
            Self {
                archive: archive.into(),
                state: rx,
            },
            SlotPublisher { state: tx },
        )
    }

    /// Create a slot completed by `computation` on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(archive: impl Into<PathBuf>, computation: F) -> Self
    where
        F: Future<Output = Result<PackageManifest, ExtractionError>> + Send + 'static,
    {
        let (slot, publisher) = Self::pending(archive);
        tokio::spawn(async move {
            publisher.publish(computation.await);
        });
        slot
    }

    pub fn archive(&self) -> &std::path::Path {
        &self.archive
    }

    /// Current state without waiting.
    pub fn state(&self) -> SlotState {
        self.state.borrow().clone()
    }

    /// Wait for the slot to leave `Pending`, giving up at `deadline`.
    ///
    /// A slot that is already finished is reported even if the deadline has
    /// passed.
    pub async fn wait_until(&self, deadline: Instant) -> SlotOutcome {
        let mut state = self.state.clone();
        let waited = tokio::time::timeout_at(deadline, async move {
            state
                .wait_for(|s| !s.is_pending())
                .await
                .map(|guard| guard.clone())
        })
        .await;

        match waited {
            Ok(Ok(SlotState::Completed(manifest))) => SlotOutcome::Ready(manifest),
            Ok(Ok(SlotState::Failed(error))) => SlotOutcome::Failed(error),
            Ok(Ok(SlotState::Pending)) => SlotOutcome::StillPending,
            Ok(Err(_closed)) => SlotOutcome::Failed(Arc::new(ExtractionError::Aborted(
                self.archive.clone(),
            ))),
            Err(_elapsed) => SlotOutcome::StillPending,
        }
    }
}
