//! Error types for scheduler setup.

use crate::state::SchedulerState;
use lib_types::FmiStatus;
use thiserror::Error;

/// Errors raised while configuring or initializing a scheduler.
///
/// Once initialized, `sync` reports problems through the last status
/// rather than through this type.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid parameter.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A slave call made during init did not succeed.
    #[error("Initialization failed at {stage}: slave returned {status}")]
    InitFailed {
        stage: &'static str,
        status: FmiStatus,
    },

    /// The slave lacks a capability the policy needs.
    #[error("Operation not supported by slave: {0}")]
    Unsupported(String),

    /// Invalid scheduler state for operation.
    #[error("Invalid scheduler state: expected {expected}, got {actual}")]
    InvalidState {
        expected: SchedulerState,
        actual: SchedulerState,
    },
}

impl SyncError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn init_failed(stage: &'static str, status: FmiStatus) -> Self {
        Self::InitFailed { stage, status }
    }

    /// Check if the slave itself reported a fatal condition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InitFailed {
                status: FmiStatus::Fatal,
                ..
            }
        )
    }
}

/// Result type for scheduler setup.
pub type SyncResult<T> = Result<T, SyncError>;
