//! Error types shared by the tab manager and its collaborators.

use thiserror::Error;

use super::ids::{HostId, TabId};

/// Tab manager errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    #[error("tab id must not be empty")]
    EmptyTabId,

    #[error("tab {0} is already registered")]
    DuplicateTab(TabId),

    #[error("tab {0} is not registered")]
    UnknownTab(TabId),

    #[error("tab {tab} is not present in window {host}")]
    TabNotInHost { tab: TabId, host: HostId },

    #[error("window {0} does not exist")]
    UnknownHost(HostId),

    #[error("window {0} is closed")]
    HostClosed(HostId),

    #[error("registry entry for tab {0} does not match the expected item")]
    RegistryMismatch(TabId),

    #[error("failed to create window: {0}")]
    WindowCreation(String),

    #[error("failed to create content surface for tab {tab}: {reason}")]
    SurfaceCreation { tab: TabId, reason: String },

    #[error("tab {0} is being dragged")]
    TabDragged(TabId),

    #[error("content surface for tab {0} refused to move into the target window")]
    Reparent(TabId),
}

pub type Result<T> = std::result::Result<T, TabError>;

/// Report a broken invariant.
///
/// Debug builds stop right here; release builds log and hand the error back
/// so the offending call becomes a failed no-op.
pub fn violation(err: TabError) -> TabError {
    tracing::error!(error = %err, "invariant violated");
    debug_assert!(false, "invariant violated: {err}");
    err
}
