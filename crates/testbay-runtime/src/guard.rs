//! Scoped execution with guaranteed finalization.
//!
//! A test body either succeeds, asks to be skipped because the environment
//! cannot host it, or fails. [`run_scoped`] runs the body, invokes a failure
//! hook for genuine failures (including panics), and always runs the
//! finalizer before surfacing the body's outcome.

use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};

use testbay_common::error::TestbayError;
use thiserror::Error;

/// Outcome of a guarded test body that did not succeed.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The environment cannot host the test. Not a failure.
    #[error("skipped: {reason}")]
    Skip {
        /// Why the test was skipped.
        reason: String,
    },

    /// The test failed. The original error is kept as-is.
    #[error("{0}")]
    Failure(Box<dyn StdError + Send + Sync + 'static>),
}

impl GuardError {
    /// Creates a skip outcome.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    /// Creates a failure carrying only a message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(message.into().into())
    }

    /// Returns whether this outcome is a skip.
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    /// Returns the original error if this is a failure of type `E`.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Skip { .. } => None,
            Self::Failure(inner) => inner.downcast_ref::<E>(),
        }
    }
}

impl From<TestbayError> for GuardError {
    fn from(err: TestbayError) -> Self {
        match err {
            TestbayError::EnvironmentUnavailable { reason } => Self::Skip { reason },
            other => Self::Failure(Box::new(other)),
        }
    }
}

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        Self::Failure(Box::new(err))
    }
}

/// Runs `body` against `scope` and finalizes the scope on every exit path.
///
/// - success: `finalize` runs; its error, if any, becomes the outcome.
/// - skip: `finalize` runs; the skip is returned unchanged.
/// - failure: `on_failure` runs, then `finalize`; the failure is returned
///   unchanged and a finalizer error is only logged.
/// - panic: like failure, then the panic resumes with its original payload.
pub fn run_scoped<S, T, B, F, C>(
    scope: &mut S,
    body: B,
    on_failure: F,
    finalize: C,
) -> Result<T, GuardError>
where
    B: FnOnce(&mut S) -> Result<T, GuardError>,
    F: FnOnce(&mut S),
    C: FnOnce(&mut S) -> Result<(), TestbayError>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *scope)));

    let failed = matches!(outcome, Ok(Err(GuardError::Failure(_))) | Err(_));
    if failed {
        on_failure(&mut *scope);
    }
    let finalized = finalize(scope);

    match outcome {
        Ok(Ok(value)) => finalized.map(|()| value).map_err(GuardError::from),
        Ok(Err(err)) => {
            if let Err(cleanup) = finalized {
                tracing::warn!(error = %cleanup, outcome = %err, "cleanup failed after unsuccessful test body");
            }
            Err(err)
        }
        Err(payload) => {
            if let Err(cleanup) = finalized {
                tracing::warn!(error = %cleanup, "cleanup failed after test body panicked");
            }
            panic::resume_unwind(payload)
        }
    }
}
