//! `tbay ssh`: Run a command over SSH against a fresh sshd fixture.

use clap::Args;
use testbay_common::config::TestbayConfig;
use testbay_fixtures::sshd::{self, SshdFixture};

/// Arguments for the `ssh` command.
#[derive(Args, Debug)]
pub struct SshArgs {
    /// Require the engine to run on the loopback interface.
    #[arg(long)]
    pub local_only: bool,

    /// Command to run as the fixture's `test` user.
    #[arg(trailing_var_arg = true, required = true)]
    pub command: Vec<String>,
}

/// Executes the `ssh` command.
///
/// The container output is dumped to standard error if the remote command
/// fails.
///
/// # Errors
///
/// Returns an error if the fixture cannot be started or the remote command
/// fails.
pub fn execute(config: &TestbayConfig, args: &SshArgs) -> anyhow::Result<()> {
    let container_type = sshd::container_type();
    let resources = config.fixtures_dir.join(container_type.fixture_id());
    let remote: Vec<&str> = args.command.iter().map(String::as_str).collect();
    let mut lifecycle = super::lifecycle(config, container_type, args.local_only);

    let outcome = lifecycle.run_guarded(|lc| {
        let handle = lc.acquire()?;
        let mut fixture = SshdFixture::new(handle, &resources);
        let mut stdout = std::io::stdout().lock();
        fixture.ssh_with_public_key(&remote, &mut stdout)?;
        Ok(())
    });

    super::finish(outcome)
}
