//! Container engine backed by the `docker` command line client.
//!
//! Images are built from `<fixtures_dir>/<fixture id>`, containers publish
//! every declared port on the configured bind address, and `docker logs -f`
//! streams container output into the run log while the container lives.

use std::ffi::OsStr;
use std::fs::OpenOptions;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use chrono::{DateTime, Utc};
use testbay_common::config::TestbayConfig;
use testbay_common::error::{Result, TestbayError};
use testbay_common::types::{ContainerId, ContainerState, ContainerType, ImageId, PortBinding};

use crate::engine::{ContainerEngine, ContainerHandle, Image};

/// Engine that shells out to the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    config: TestbayConfig,
}

impl DockerEngine {
    /// Creates an engine using the given configuration.
    #[must_use]
    pub const fn new(config: TestbayConfig) -> Self {
        Self { config }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &TestbayConfig {
        &self.config
    }

    fn command(&self) -> Command {
        Command::new(&self.config.docker_binary)
    }

    fn follow_logs(&self, id: &ContainerId, log: &Path) -> Result<Child> {
        let io_err = |e| TestbayError::Io {
            path: log.to_path_buf(),
            source: e,
        };
        let stdout = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log)
            .map_err(io_err)?;
        let stderr = stdout.try_clone().map_err(io_err)?;

        self.command()
            .args(["logs", "-f", id.as_str()])
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .map_err(|e| TestbayError::Io {
                path: PathBuf::from(&self.config.docker_binary),
                source: e,
            })
    }
}

impl ContainerEngine for DockerEngine {
    type Handle = DockerContainer;

    fn is_available(&self) -> bool {
        let binary = &self.config.docker_binary;
        if which::which(binary).is_err() {
            tracing::debug!(binary = %binary, "engine binary not found");
            return false;
        }
        let reachable = self
            .command()
            .arg("info")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success());
        tracing::debug!(binary = %binary, reachable, "probed engine");
        reachable
    }

    fn host(&self) -> Result<String> {
        Ok(self.config.engine_host())
    }

    fn build(&self, container_type: &ContainerType) -> Result<Image> {
        let context = self.config.fixtures_dir.join(container_type.fixture_id());
        if !context.is_dir() {
            return Err(TestbayError::StartFailure {
                container_type: container_type.to_string(),
                message: format!("no image build context at {}", context.display()),
            });
        }

        let tag = container_type.image_tag();
        tracing::info!(tag = %tag, context = %context.display(), "building fixture image");
        let _ = run_command(self.command().args(["build", "-t", tag.as_str()]).arg(&context))?;
        Ok(Image {
            id: ImageId::new(tag),
            container_type: container_type.clone(),
        })
    }

    fn start(&self, image: &Image, log: &Path) -> Result<DockerContainer> {
        let mut cmd = self.command();
        let _ = cmd.args(["run", "-d"]);
        for port in image.container_type.ports() {
            let _ = cmd
                .arg("-p")
                .arg(format!("{}::{port}", publish_host(self.config.bind_address)));
        }
        let _ = cmd.arg(image.id.as_str());

        let id = run_command(&mut cmd)?;
        if id.is_empty() {
            return Err(TestbayError::StartFailure {
                container_type: image.container_type.to_string(),
                message: "engine did not report a container id".into(),
            });
        }

        // Dropping a partially set up container removes it again.
        let mut container = DockerContainer {
            id: ContainerId::new(id),
            binary: self.config.docker_binary.clone(),
            bindings: Vec::new(),
            log_follower: None,
            state: ContainerState::Running,
            started_at: Utc::now(),
        };
        container.log_follower = Some(self.follow_logs(&container.id, log)?);

        for &port in image.container_type.ports() {
            let output = run_command(
                self.command()
                    .arg("port")
                    .arg(container.id.as_str())
                    .arg(format!("{port}/tcp")),
            )?;
            let binding =
                parse_port_output(port, &output).ok_or_else(|| TestbayError::StartFailure {
                    container_type: image.container_type.to_string(),
                    message: format!("port {port} is not published: {output:?}"),
                })?;
            container.bindings.push(binding);
        }

        Ok(container)
    }
}

/// A container started through [`DockerEngine`].
#[derive(Debug)]
pub struct DockerContainer {
    id: ContainerId,
    binary: String,
    bindings: Vec<PortBinding>,
    log_follower: Option<Child>,
    state: ContainerState,
    started_at: DateTime<Utc>,
}

impl DockerContainer {
    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ContainerState {
        self.state
    }

    /// Returns when the container was started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn stop_log_follower(&mut self) {
        let Some(mut follower) = self.log_follower.take() else {
            return;
        };
        if let Err(e) = follower.kill() {
            tracing::debug!(error = %e, "log follower already exited");
        }
        match follower.wait() {
            Ok(status) => tracing::debug!(%status, "log follower reaped"),
            Err(e) => tracing::debug!(error = %e, "failed to reap log follower"),
        }
    }
}

impl ContainerHandle for DockerContainer {
    fn id(&self) -> &ContainerId {
        &self.id
    }

    fn bindings(&self) -> &[PortBinding] {
        &self.bindings
    }

    fn destroy(&mut self) -> Result<()> {
        if self.state == ContainerState::Destroyed {
            return Ok(());
        }
        self.state = ContainerState::Destroyed;

        let removed = run_command(Command::new(&self.binary).args(["rm", "-f", self.id.as_str()]));

        self.stop_log_follower();

        let _ = removed?;
        tracing::info!(id = %self.id.short(), "container removed");
        Ok(())
    }
}

impl Drop for DockerContainer {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            tracing::warn!(error = %e, id = %self.id, "failed to remove container on drop");
        }
    }
}

/// Parses `docker port` output into the binding of `container_port`.
///
/// The first line that parses wins, e.g. `127.0.0.1:49153` or `[::]:49153`.
#[must_use]
pub fn parse_port_output(container_port: u16, output: &str) -> Option<PortBinding> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| {
            let (host, port) = line.rsplit_once(':')?;
            let host = host.trim_start_matches('[').trim_end_matches(']');
            Some(PortBinding {
                container_port,
                host_ip: host.parse().ok()?,
                host_port: port.parse().ok()?,
            })
        })
}

/// Formats a bind address for `docker run -p <host>::<port>`.
fn publish_host(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(ip) => ip.to_string(),
        IpAddr::V6(ip) => format!("[{ip}]"),
    }
}

fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs a command to completion and returns its trimmed standard output.
fn run_command(cmd: &mut Command) -> Result<String> {
    let line = describe(cmd);
    tracing::debug!(command = %line, "running engine command");
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| TestbayError::Io {
            path: PathBuf::from(cmd.get_program()),
            source: e,
        })?;

    if !output.status.success() {
        return Err(TestbayError::CommandFailed {
            command: line,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_without_binary() -> DockerEngine {
        DockerEngine::new(TestbayConfig {
            docker_binary: "testbay-no-such-engine".into(),
            ..TestbayConfig::default()
        })
    }

    #[test]
    fn parse_ipv4_binding() {
        let binding = parse_port_output(22, "127.0.0.1:49153\n").unwrap();
        assert_eq!(binding.container_port, 22);
        assert_eq!(binding.host_ip, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(binding.host_port, 49153);
    }

    #[test]
    fn parse_prefers_first_parseable_line() {
        let binding = parse_port_output(22, "\n0.0.0.0:32768\n[::]:32768\n").unwrap();
        assert_eq!(binding.host_ip, "0.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(binding.host_port, 32768);
    }

    #[test]
    fn parse_ipv6_binding() {
        let binding = parse_port_output(22, "[::1]:32769").unwrap();
        assert!(binding.host_ip.is_loopback());
        assert_eq!(binding.host_port, 32769);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_port_output(22, "").is_none());
        assert!(parse_port_output(22, "Error: No public port '22/tcp' published").is_none());
    }

    #[test]
    fn publish_host_brackets_ipv6() {
        assert_eq!(publish_host("127.0.0.1".parse().unwrap()), "127.0.0.1");
        assert_eq!(publish_host("::1".parse().unwrap()), "[::1]");
    }

    #[test]
    fn describe_joins_program_and_args() {
        let mut cmd = Command::new("docker");
        let _ = cmd.args(["rm", "-f", "abc"]);
        assert_eq!(describe(&cmd), "docker rm -f abc");
    }

    #[test]
    fn missing_binary_is_unavailable() {
        assert!(!engine_without_binary().is_available());
    }

    #[test]
    fn host_comes_from_config() {
        let engine = DockerEngine::new(TestbayConfig {
            docker_host: Some("tcp://10.0.0.5:2376".into()),
            ..TestbayConfig::default()
        });
        assert_eq!(engine.host().unwrap(), "10.0.0.5");
    }

    #[test]
    fn build_without_context_is_a_start_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = DockerEngine::new(TestbayConfig {
            fixtures_dir: dir.path().to_path_buf(),
            ..TestbayConfig::default()
        });
        let err = engine
            .build(&ContainerType::new("SshdContainer", "sshd"))
            .unwrap_err();
        assert!(matches!(err, TestbayError::StartFailure { .. }));
        assert!(!err.is_environment_unavailable());
    }

    #[test]
    fn destroy_is_attempted_once() {
        let mut container = DockerContainer {
            id: ContainerId::new("deadbeef"),
            binary: "testbay-no-such-engine".into(),
            bindings: Vec::new(),
            log_follower: None,
            state: ContainerState::Running,
            started_at: Utc::now(),
        };

        assert!(container.destroy().is_err());
        assert_eq!(container.state(), ContainerState::Destroyed);
        container.destroy().expect("second destroy is a no-op");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn destroy_reaps_log_follower() {
        let follower = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        let pid = follower.id();
        let mut container = DockerContainer {
            id: ContainerId::new("deadbeef"),
            binary: "testbay-no-such-engine".into(),
            bindings: Vec::new(),
            log_follower: Some(follower),
            state: ContainerState::Running,
            started_at: Utc::now(),
        };

        assert!(container.destroy().is_err());
        assert!(container.log_follower.is_none());
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
    }
}
