#![forbid(unsafe_code)]

//! Error taxonomy for overlay operations.

use thiserror::Error;

use crate::host::NodeId;
use crate::session::{SessionId, SessionState};

pub type Result<T> = std::result::Result<T, OverlayError>;

/// Operation names used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Present,
    Dismiss,
    UpdatePosition,
    UpdateLayout,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Present => "present",
            Self::Dismiss => "dismiss",
            Self::UpdatePosition => "update position",
            Self::UpdateLayout => "update layout",
        })
    }
}

/// Why a snapshot could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFailureReason {
    /// The source node no longer exists.
    DeadSource,
    /// The source has zero width or height.
    EmptyBounds,
    /// The host's rasterizer returned nothing.
    RasterizerDeclined,
}

impl std::fmt::Display for SnapshotFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::DeadSource => "source node is gone",
            Self::EmptyBounds => "source has empty bounds",
            Self::RasterizerDeclined => "rasterizer declined",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    #[error("cannot {operation} while session is {state:?}")]
    InvalidStateTransition {
        operation: Operation,
        state: SessionState,
    },

    #[error("session no longer holds its content")]
    MissingContent,

    #[error("snapshot of node {node:?} failed: {reason}")]
    SnapshotFailure {
        node: NodeId,
        reason: SnapshotFailureReason,
    },

    #[error("keyboard notification is missing its {field}")]
    KeyboardEventMismatch { field: &'static str },

    #[error("no overlay session {0:?}")]
    UnknownSession(SessionId),

    #[error("host provided no surface to present into")]
    NoSurface,
}

impl OverlayError {
    #[must_use]
    pub fn invalid(operation: Operation, state: SessionState) -> Self {
        Self::InvalidStateTransition { operation, state }
    }

    /// Whether the error only means an optional visual effect was skipped.
    #[must_use]
    pub fn is_cosmetic(&self) -> bool {
        matches!(self, Self::SnapshotFailure { .. })
    }
}
