//! Error types for skewline

use std::time::Duration;

use thiserror::Error;

use crate::NodeName;

/// Core skewline errors
///
/// Insufficient data and failed name resolution are outcomes, not errors;
/// they never surface here.
#[derive(Error, Debug)]
pub enum SkewError {
    // Store errors
    #[error("Event store error: {0}")]
    Store(String),

    // Directory errors
    #[error("Unknown node: {0}")]
    UnknownNode(NodeName),

    #[error("Reserved node name cannot be registered: {0}")]
    ReservedName(NodeName),

    #[error("Node {0} is not anonymous")]
    NotAnonymous(NodeName),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Pass control
    #[error("Resolution deadline exceeded after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },

    #[error("Resolution pass cancelled")]
    Cancelled,
}

/// Result type for skewline operations
pub type SkewResult<T> = Result<T, SkewError>;
