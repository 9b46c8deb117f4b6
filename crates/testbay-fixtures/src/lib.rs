//! # testbay-fixtures
//!
//! Container types tests can ask a lifecycle for, and the helpers that let a
//! test body talk to the started fixture.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod registry;
pub mod sshd;
