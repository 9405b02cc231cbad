//! Motion error types

use thiserror::Error;

/// Errors raised when building or wiring motion primitives
///
/// Every variant is a contract violation surfaced at construction time.
/// Per-frame numeric edge cases never produce errors; they resolve to a
/// boundary value instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// A generator, value graph edge, or option set is not usable as given
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An argument refers to something that can no longer be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for motion operations
pub type Result<T> = std::result::Result<T, MotionError>;
