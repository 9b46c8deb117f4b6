//! `tbay run`: Start a fixture, report its ports, and tear it down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use testbay_common::config::TestbayConfig;
use testbay_runtime::engine::ContainerHandle;
use testbay_runtime::guard::GuardError;

use crate::output::{BOLD, DIM, GREEN, RESET, format_elapsed};

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Fixture id or name, e.g. `sshd`.
    pub fixture: String,

    /// Require the engine to run on the loopback interface.
    #[arg(long)]
    pub local_only: bool,

    /// Keep the container running until Ctrl+C.
    #[arg(long)]
    pub hold: bool,
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the fixture is unknown, or if building, starting or
/// releasing the container fails. An unavailable engine is reported as a
/// skip, not an error.
pub fn execute(config: &TestbayConfig, args: &RunArgs) -> anyhow::Result<()> {
    let container_type = testbay_fixtures::registry::lookup(&args.fixture).ok_or_else(|| {
        anyhow::anyhow!("unknown fixture: {} (see `tbay fixtures`)", args.fixture)
    })?;

    let started = Instant::now();
    let hold = args.hold;
    let mut lifecycle = super::lifecycle(config, container_type, args.local_only);

    let outcome = lifecycle.run_guarded(|lc| {
        let name = lc.container_type().to_string();
        let handle = lc.acquire()?;
        eprintln!();
        eprintln!(
            "  {GREEN}{BOLD}Started{RESET} {name} {DIM}[{}]{RESET} in {}",
            handle.id().short(),
            format_elapsed(started.elapsed())
        );
        eprintln!("  {DIM}since {}{RESET}", handle.started_at().to_rfc3339());
        for binding in handle.bindings() {
            println!("{binding}");
        }
        if hold {
            wait_for_interrupt()?;
        }
        Ok(())
    });

    super::finish(outcome)?;
    eprintln!("  {GREEN}Container released.{RESET}");
    Ok(())
}

fn wait_for_interrupt() -> Result<(), GuardError> {
    eprintln!();
    eprintln!("  Press {BOLD}Ctrl+C{RESET} to stop the container...");

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| GuardError::failure(format!("failed to set Ctrl+C handler: {e}")))?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(250));
    }
    Ok(())
}
