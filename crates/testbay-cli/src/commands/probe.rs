//! `tbay probe`: Check whether the container engine can host fixtures.

use clap::Args;
use testbay_common::config::TestbayConfig;
use testbay_runtime::docker::DockerEngine;
use testbay_runtime::engine::{self, ContainerEngine};

use crate::output::{BOLD, GREEN, RESET, YELLOW, yes_no};

/// Arguments for the `probe` command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    /// Also require the engine to run on the loopback interface.
    #[arg(long)]
    pub local_only: bool,
}

/// Executes the `probe` command.
///
/// Reports the engine binary, its availability, and where it runs.
///
/// # Errors
///
/// Returns an error if the engine cannot host fixtures under the requested
/// constraints.
pub fn execute(config: &TestbayConfig, args: &ProbeArgs) -> anyhow::Result<()> {
    let engine = DockerEngine::new(config.clone());
    let available = engine.is_available();
    let host = engine.host()?;
    let resolved = engine::resolve_host(&host);

    println!("{:<12} {}", "binary", config.docker_binary);
    println!("{:<12} {}", "available", yes_no(available));
    println!("{:<12} {host}", "host");
    match &resolved {
        Ok(ip) => println!(
            "{:<12} {ip} ({})",
            "address",
            if ip.is_loopback() { "loopback" } else { "remote" }
        ),
        Err(e) => println!("{:<12} {e}", "address"),
    }

    if !available {
        eprintln!("  {YELLOW}Tests needing a container engine will be skipped.{RESET}");
        return Err(anyhow::anyhow!(
            "container engine `{}` is not available",
            config.docker_binary
        ));
    }
    let local = resolved.as_ref().is_ok_and(|ip| ip.is_loopback());
    if args.local_only && !local {
        eprintln!("  {YELLOW}Local-only tests will be skipped.{RESET}");
        return Err(anyhow::anyhow!("container engine runs on {host}, not locally"));
    }

    eprintln!("  {GREEN}{BOLD}Engine ready.{RESET}");
    Ok(())
}
