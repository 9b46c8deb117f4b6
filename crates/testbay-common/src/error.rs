//! Unified error types for the testbay workspace.
//!
//! `EnvironmentUnavailable` is the only variant that means "skip": the
//! environment cannot host the test. Every other variant is a genuine failure.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum TestbayError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// The container engine is missing, unreachable, or not local when it
    /// has to be.
    #[error("environment unavailable: {reason}")]
    EnvironmentUnavailable {
        /// Why the environment cannot host the test.
        reason: String,
    },

    /// Building the image or starting the container failed after the
    /// engine was confirmed to be available.
    #[error("failed to start {container_type}: {message}")]
    StartFailure {
        /// Display name of the container type.
        container_type: String,
        /// Description of the failure.
        message: String,
    },

    /// An external command exited unsuccessfully.
    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        /// Command line that was executed.
        command: String,
        /// Exit status, `-1` when terminated by a signal.
        status: i32,
        /// Captured standard error.
        stderr: String,
    },

    /// Releasing the run log or the container failed.
    #[error("cleanup failed: {}", failures.join("; "))]
    Cleanup {
        /// One entry per cleanup step that failed.
        failures: Vec<String>,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl TestbayError {
    /// Creates an [`TestbayError::EnvironmentUnavailable`] error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::EnvironmentUnavailable {
            reason: reason.into(),
        }
    }

    /// Returns whether this error is a skip signal rather than a failure.
    #[must_use]
    pub const fn is_environment_unavailable(&self) -> bool {
        matches!(self, Self::EnvironmentUnavailable { .. })
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, TestbayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_a_skip_signal() {
        let err = TestbayError::unavailable("Docker is needed for the test");
        assert!(err.is_environment_unavailable());
        assert_eq!(
            err.to_string(),
            "environment unavailable: Docker is needed for the test"
        );
    }

    #[test]
    fn start_failure_is_not_a_skip_signal() {
        let err = TestbayError::StartFailure {
            container_type: "SshdContainer".into(),
            message: "build failed".into(),
        };
        assert!(!err.is_environment_unavailable());
        assert_eq!(err.to_string(), "failed to start SshdContainer: build failed");
    }

    #[test]
    fn cleanup_lists_every_failure() {
        let err = TestbayError::Cleanup {
            failures: vec!["log".into(), "container".into()],
        };
        assert_eq!(err.to_string(), "cleanup failed: log; container");
    }
}
