//! `tbay fixtures`: List the known fixtures.

use clap::Args;
use testbay_common::config::TestbayConfig;

use crate::output::{format_ports, yes_no};

/// Arguments for the `fixtures` command.
#[derive(Args, Debug)]
pub struct FixturesArgs {}

/// Executes the `fixtures` command.
///
/// Lists every fixture with its ports and whether its build context exists
/// under the configured fixtures directory.
///
/// # Errors
///
/// This command does not fail.
pub fn execute(config: &TestbayConfig, _args: &FixturesArgs) -> anyhow::Result<()> {
    println!(
        "{:<10} {:<18} {:<16} {:<8} {:<20}",
        "ID", "NAME", "PORTS", "CONTEXT", "IMAGE"
    );
    for ty in testbay_fixtures::registry::known() {
        let context = config.fixtures_dir.join(ty.fixture_id());
        println!(
            "{:<10} {:<18} {:<16} {:<8} {:<20}",
            ty.fixture_id(),
            ty.name(),
            format_ports(ty.ports()),
            yes_no(context.is_dir()),
            ty.image_tag()
        );
    }
    Ok(())
}
