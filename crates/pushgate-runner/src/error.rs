//! Error types for process execution

use std::time::Duration;
use thiserror::Error;

/// Process execution errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to execute '{program}': {reason}")]
    NativeExecutionFailed { program: String, reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}

impl RunnerError {
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout {
            timeout_seconds: ceil_secs(timeout),
        }
    }
}

/// Whole seconds in `timeout`, rounded up so a sub-second limit never reads as 0.
#[must_use]
pub fn ceil_secs(timeout: Duration) -> u64 {
    timeout.as_secs() + u64::from(timeout.subsec_nanos() > 0)
}
