//! SSH server fixture.
//!
//! The fixture image (`<fixtures_dir>/sshd`) runs `sshd` with a `test` user
//! authorised for the insecure key pair shipped next to its Dockerfile as
//! `unsafe` (plaintext) and `unsafe_enc_key` (passphrase protected).

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use tempfile::TempPath;
use testbay_common::error::{Result, TestbayError};
use testbay_common::types::ContainerType;
use testbay_runtime::engine::ContainerHandle;

/// Port `sshd` listens on inside the container.
pub const SSH_PORT: u16 = 22;

/// Account the fixture authorises.
pub const SSH_USER: &str = "test";

/// File name of the plaintext private key in the fixture resources.
pub const PRIVATE_KEY: &str = "unsafe";

/// File name of the encrypted private key in the fixture resources.
pub const ENCRYPTED_PRIVATE_KEY: &str = "unsafe_enc_key";

/// Returns the container type of the SSH server fixture.
#[must_use]
pub fn container_type() -> ContainerType {
    ContainerType::new("SshdContainer", "sshd").with_port(SSH_PORT)
}

/// Test-side view of a running SSH server container.
///
/// Key files are copied out of the fixture resources on first use and
/// deleted when the fixture is dropped.
#[derive(Debug)]
pub struct SshdFixture<'a, H> {
    handle: &'a H,
    resources: PathBuf,
    private_key: Option<TempPath>,
    encrypted_private_key: Option<TempPath>,
}

impl<'a, H: ContainerHandle> SshdFixture<'a, H> {
    /// Wraps a started container; `resources` holds the key files.
    #[must_use]
    pub fn new(handle: &'a H, resources: impl Into<PathBuf>) -> Self {
        Self {
            handle,
            resources: resources.into(),
            private_key: None,
            encrypted_private_key: None,
        }
    }

    /// Returns the underlying container handle.
    #[must_use]
    pub const fn handle(&self) -> &H {
        self.handle
    }

    /// Returns the path of an owner-read-only copy of the plaintext key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be copied out of the resources.
    pub fn private_key(&mut self) -> Result<&Path> {
        materialize(&mut self.private_key, &self.resources.join(PRIVATE_KEY))
    }

    /// Returns the path of an owner-read-only copy of the encrypted key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be copied out of the resources.
    pub fn encrypted_private_key(&mut self) -> Result<&Path> {
        materialize(
            &mut self.encrypted_private_key,
            &self.resources.join(ENCRYPTED_PRIVATE_KEY),
        )
    }

    /// Returns the plaintext private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot be copied or read.
    pub fn private_key_string(&mut self) -> Result<String> {
        let path = self.private_key()?;
        std::fs::read_to_string(path).map_err(|e| TestbayError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Builds an `ssh` invocation that logs in with the plaintext key.
    ///
    /// Append the remote command with [`Command::args`].
    ///
    /// # Errors
    ///
    /// Returns an error if port 22 is not published or the key cannot be
    /// materialized.
    pub fn ssh(&mut self) -> Result<Command> {
        let not_published = || TestbayError::Config {
            message: format!("sshd port {SSH_PORT} is not published"),
        };
        let port = self.handle.port(SSH_PORT).ok_or_else(not_published)?;
        let ip = self.handle.ip_bound(SSH_PORT).ok_or_else(not_published)?;
        let key = self.private_key()?.to_path_buf();

        let mut cmd = Command::new("ssh");
        let _ = cmd
            .arg("-p")
            .arg(port.to_string())
            .args(["-F", "none"])
            .args(["-o", "IdentitiesOnly=yes"])
            .args(["-o", "StrictHostKeyChecking=no"])
            .arg("-i")
            .arg(key)
            .arg(format!("{SSH_USER}@{ip}"));
        Ok(cmd)
    }

    /// Runs `remote` over SSH, copying its output to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`TestbayError::CommandFailed`] if the remote command exits
    /// unsuccessfully, or an I/O error if `ssh` cannot be run.
    pub fn ssh_with_public_key(&mut self, remote: &[&str], sink: &mut dyn Write) -> Result<()> {
        let mut cmd = self.ssh()?;
        let io_err = |e| TestbayError::Io {
            path: PathBuf::from("ssh"),
            source: e,
        };
        tracing::debug!(command = ?remote, "running over ssh");
        let output = cmd
            .args(remote)
            .stdin(Stdio::null())
            .output()
            .map_err(io_err)?;

        sink.write_all(&output.stdout).map_err(io_err)?;
        sink.write_all(&output.stderr).map_err(io_err)?;
        sink.flush().map_err(io_err)?;

        if !output.status.success() {
            return Err(TestbayError::CommandFailed {
                command: format!("ssh {}", remote.join(" ")),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Starts `remote` over SSH with its standard output piped.
    ///
    /// # Errors
    ///
    /// Returns an error if `ssh` cannot be spawned.
    pub fn popen(&mut self, remote: &[&str]) -> Result<Child> {
        self.ssh()?
            .args(remote)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| TestbayError::Io {
                path: PathBuf::from("ssh"),
                source: e,
            })
    }
}

fn materialize<'s>(slot: &'s mut Option<TempPath>, source: &Path) -> Result<&'s Path> {
    let key = match slot.take() {
        Some(key) => key,
        None => copy_key(source)?,
    };
    Ok(&**slot.insert(key))
}

/// Copies a key into a temp file that only its owner may read.
fn copy_key(source: &Path) -> Result<TempPath> {
    let source_err = |e| TestbayError::Io {
        path: source.to_path_buf(),
        source: e,
    };
    let mut input = File::open(source).map_err(source_err)?;
    let mut temp = tempfile::Builder::new()
        .prefix("ssh")
        .suffix("key")
        .tempfile()
        .map_err(|e| TestbayError::Io {
            path: std::env::temp_dir(),
            source: e,
        })?;
    let _ = io::copy(&mut input, &mut temp).map_err(source_err)?;

    let temp = temp.into_temp_path();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o400)).map_err(|e| {
            TestbayError::Io {
                path: temp.to_path_buf(),
                source: e,
            }
        })?;
    }
    tracing::debug!(key = %source.display(), copy = %temp.display(), "materialized ssh key");
    Ok(temp)
}
