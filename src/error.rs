//! Error types
//!
//! Chain operations report input defects and stale references through
//! `WormError`. The field tick is the boundary that logs and swallows them.

use thiserror::Error;

use crate::sim::NodeId;

/// Faults raised by worm chain operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WormError {
    #[error("note sequence is empty")]
    EmptyNoteSequence,
    #[error("chain has no tail node to grow from")]
    MissingTail,
    #[error("node {0} is not part of the chain")]
    UnknownNode(NodeId),
    #[error("chain is already destroyed")]
    AlreadyDestroyed,
    #[error("invariant violated: {0}")]
    InvariantViolated(String),
}

/// Failures loading or saving settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures loading a song analysis file
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("analysis JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("analysis contains no notes")]
    NoNotes,
}
