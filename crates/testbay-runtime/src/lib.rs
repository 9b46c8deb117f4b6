//! Test-scoped container lifecycle management.
//!
//! A [`ScopedContainerLifecycle`](lifecycle::ScopedContainerLifecycle) builds
//! and starts one container for the duration of a test body, captures the
//! container's output in a run log, dumps that log when the body fails, and
//! always destroys the container and deletes the log afterwards.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod docker;
pub mod engine;
pub mod guard;
pub mod lifecycle;
pub mod logs;
