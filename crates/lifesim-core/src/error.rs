#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! Every failure in the simulator is a programming error surfaced
//! synchronously to the caller of the offending operation. Nothing is
//! retried and nothing is swallowed.
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | `IllegalState` | lifecycle transition not valid from the current state |
//! | `NotFound` | handle registry lookup miss |
//! | `IllegalArgument` | negative delay, time travel backwards, bad bundle payload |

use std::fmt;

/// Errors reported by the scheduler, the handle registry and the lifecycle
/// controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// The operation is not valid in the current state.
    IllegalState(String),
    /// A registry lookup missed.
    NotFound(String),
    /// An argument was malformed.
    IllegalArgument(String),
}

impl SimError {
    /// Build an [`SimError::IllegalState`].
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }

    /// Build a [`SimError::NotFound`].
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build an [`SimError::IllegalArgument`].
    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        Self::IllegalArgument(msg.into())
    }

    /// Short machine-friendly name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IllegalState(_) => "illegal_state",
            Self::NotFound(_) => "not_found",
            Self::IllegalArgument(_) => "illegal_argument",
        }
    }

    /// The human-readable message carried by the error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::IllegalState(msg) | Self::NotFound(msg) | Self::IllegalArgument(msg) => msg,
        }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalState(msg) => write!(f, "illegal state: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::IllegalArgument(msg) => write!(f, "illegal argument: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

/// Result type for simulator operations.
pub type SimResult<T> = Result<T, SimError>;
