//! Error types for Scatterbrush

use crate::scene::NodeRef;
use thiserror::Error;

/// Reasons an asset pool refuses a new entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("{0} already exists in the list and can't be added again")]
    AlreadyExists(NodeRef),

    #[error("{0} can't be resolved to a node with a transform")]
    NoTransform(NodeRef),
}

/// Reasons a stroke or place interaction refuses to start.
///
/// Surfaced to the caller for display; a failed preflight never leaves a
/// partial session behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreflightError {
    #[error("Source list is empty")]
    EmptySourcePool,

    #[error("Target list is empty")]
    EmptyTargetPool,

    #[error("{0} no longer exists in the scene")]
    StaleReference(NodeRef),

    #[error("{0} can't be in both the source and the target list")]
    DuplicateAcrossPools(NodeRef),
}

/// Selection on a pool with nothing selectable.
///
/// Preflight guarantees non-empty pools, so seeing this is a contract violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("Asset pool has no selectable entry")]
    EmptyPool,
}

/// Failure of a single placement attempt. The stroke stays active.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("Host failed to duplicate {0}")]
    HostDuplicationFailed(NodeRef),

    #[error("No parent transform found for shape {0}")]
    NoParentTransform(NodeRef),
}

#[derive(Error, Debug)]
pub enum ScatterError {
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Preflight failed: {0}")]
    Preflight(#[from] PreflightError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("Event {event} is not valid while the stroke is {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("No stroke is in progress")]
    NoActiveStroke,
}

pub type Result<T> = std::result::Result<T, ScatterError>;
