//! CLI command definitions and dispatch.

pub mod fixtures;
pub mod probe;
pub mod run;
pub mod ssh;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use testbay_common::config::TestbayConfig;
use testbay_common::types::ContainerType;
use testbay_runtime::docker::DockerEngine;
use testbay_runtime::guard::GuardError;
use testbay_runtime::lifecycle::ScopedContainerLifecycle;

/// testbay: disposable fixture containers for acceptance tests.
#[derive(Parser, Debug)]
#[command(name = testbay_common::constants::BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file (environment variables still take precedence).
    #[arg(long, global = true, env = "TESTBAY_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check whether the container engine can host fixtures.
    Probe(probe::ProbeArgs),
    /// List the known fixtures.
    Fixtures(fixtures::FixturesArgs),
    /// Start a fixture, report its ports, and tear it down.
    Run(run::RunArgs),
    /// Run a command over SSH against a fresh sshd fixture.
    Ssh(ssh::SshArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if configuration loading or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Probe(args) => probe::execute(&config, &args),
        Command::Fixtures(args) => fixtures::execute(&config, &args),
        Command::Run(args) => run::execute(&config, &args),
        Command::Ssh(args) => ssh::execute(&config, &args),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<TestbayConfig> {
    let config = match path {
        Some(path) => TestbayConfig::load(path),
        None => TestbayConfig::from_env(),
    }
    .context("failed to load configuration")?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

/// Creates a docker-backed lifecycle for `container_type`.
pub(crate) fn lifecycle(
    config: &TestbayConfig,
    container_type: ContainerType,
    local_only: bool,
) -> ScopedContainerLifecycle<DockerEngine> {
    let lifecycle = ScopedContainerLifecycle::new(DockerEngine::new(config.clone()), container_type)
        .with_log_dir(&config.log_dir);
    if local_only {
        lifecycle.local_only()
    } else {
        lifecycle
    }
}

/// Turns a guarded outcome into the command result; skips are not errors.
pub(crate) fn finish(outcome: Result<(), GuardError>) -> anyhow::Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(GuardError::Skip { reason }) => {
            eprintln!("  Skipped: {reason}");
            Ok(())
        }
        Err(GuardError::Failure(err)) => Err(anyhow::anyhow!(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use testbay_common::error::TestbayError;

    use super::*;

    #[test]
    fn missing_config_file_keeps_io_cause() {
        let Err(err) = load_config(Some(Path::new("/nonexistent/testbay.json"))) else {
            panic!("a missing config file must fail");
        };

        assert!(matches!(
            err.downcast_ref::<TestbayError>(),
            Some(TestbayError::Io { .. })
        ));
        assert!(
            err.chain()
                .any(|cause| cause.downcast_ref::<std::io::Error>().is_some())
        );
    }
}
