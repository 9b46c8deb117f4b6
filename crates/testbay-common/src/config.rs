//! Configuration model for the testbay engine and lifecycle.
//!
//! Values come from built-in defaults, optionally a JSON file, and finally
//! environment variables, in that order of precedence (last wins).

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, TestbayError};

/// Root configuration for testbay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestbayConfig {
    /// Container engine binary, resolved on `PATH` when not absolute.
    pub docker_binary: String,
    /// Engine endpoint URL, as in `DOCKER_HOST`.
    pub docker_host: Option<String>,
    /// Directory holding one image build context per fixture id.
    pub fixtures_dir: PathBuf,
    /// Directory run logs are created in.
    pub log_dir: PathBuf,
    /// Host address published container ports bind to.
    pub bind_address: IpAddr,
}

impl Default for TestbayConfig {
    fn default() -> Self {
        Self {
            docker_binary: constants::DEFAULT_DOCKER_BINARY.to_string(),
            docker_host: None,
            fixtures_dir: PathBuf::from(constants::DEFAULT_FIXTURES_DIR),
            log_dir: std::env::temp_dir(),
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

impl TestbayConfig {
    /// Builds the configuration from defaults and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment override is malformed.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Loads a JSON configuration file, then applies environment overrides.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if an
    /// environment override is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Loads a JSON configuration file, then applies overrides from `lookup`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(path).map_err(|e| TestbayError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.overlay(lookup)
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    ///
    /// # Errors
    ///
    /// Returns [`TestbayError::Config`] if the bind address does not parse.
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(binary) = var(constants::DOCKER_BINARY_ENV) {
            self.docker_binary = binary;
        }
        if let Some(host) = var(constants::DOCKER_HOST_ENV) {
            self.docker_host = Some(host);
        }
        if let Some(dir) = var(constants::FIXTURES_DIR_ENV) {
            self.fixtures_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var(constants::LOG_DIR_ENV) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(addr) = var(constants::BIND_ADDRESS_ENV) {
            self.bind_address = addr.trim().parse().map_err(|_| TestbayError::Config {
                message: format!("{} is not an IP address: {addr}", constants::BIND_ADDRESS_ENV),
            })?;
        }
        Ok(self)
    }

    /// Returns the host name or address the engine runs on.
    #[must_use]
    pub fn engine_host(&self) -> String {
        engine_host(self.docker_host.as_deref())
    }
}

/// Extracts the engine host from a `DOCKER_HOST` style URL.
///
/// Only network endpoints (`tcp://`, `http://`, `https://` or a bare
/// `host:port`) name a remote host; unix sockets, named pipes and an unset
/// value all mean the local machine.
#[must_use]
pub fn engine_host(docker_host: Option<&str>) -> String {
    let Some(url) = docker_host.map(str::trim).filter(|s| !s.is_empty()) else {
        return constants::LOOPBACK_HOST.to_string();
    };

    let authority = match url.split_once("://") {
        Some((scheme, rest)) => {
            if !matches!(
                scheme.to_ascii_lowercase().as_str(),
                "tcp" | "http" | "https"
            ) {
                return constants::LOOPBACK_HOST.to_string();
            }
            rest
        }
        None => url,
    };
    let authority = authority.split('/').next().unwrap_or_default();

    let host = authority.strip_prefix('[').map_or_else(
        || authority.split(':').next().unwrap_or_default(),
        |rest| rest.split(']').next().unwrap_or_default(),
    );

    if host.is_empty() {
        constants::LOOPBACK_HOST.to_string()
    } else {
        host.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn unset_docker_host_is_loopback() {
        assert_eq!(engine_host(None), "127.0.0.1");
        assert_eq!(engine_host(Some("  ")), "127.0.0.1");
    }

    #[test]
    fn unix_socket_is_loopback() {
        assert_eq!(engine_host(Some("unix:///var/run/docker.sock")), "127.0.0.1");
        assert_eq!(engine_host(Some("npipe:////./pipe/docker_engine")), "127.0.0.1");
    }

    #[test]
    fn tcp_url_yields_host() {
        assert_eq!(engine_host(Some("tcp://10.0.0.5:2376")), "10.0.0.5");
        assert_eq!(engine_host(Some("TCP://docker.example.com:2375/")), "docker.example.com");
        assert_eq!(engine_host(Some("10.0.0.5:2376")), "10.0.0.5");
    }

    #[test]
    fn bracketed_ipv6_host() {
        assert_eq!(engine_host(Some("tcp://[::1]:2375")), "::1");
    }

    #[test]
    fn overlay_applies_environment() {
        let config = TestbayConfig::default()
            .overlay(env(&[
                ("TESTBAY_DOCKER_BINARY", "podman"),
                ("DOCKER_HOST", "tcp://10.0.0.5:2376"),
                ("TESTBAY_FIXTURES_DIR", "/srv/fixtures"),
                ("TESTBAY_BIND_ADDRESS", "0.0.0.0"),
            ]))
            .expect("overlay");
        assert_eq!(config.docker_binary, "podman");
        assert_eq!(config.engine_host(), "10.0.0.5");
        assert_eq!(config.fixtures_dir, PathBuf::from("/srv/fixtures"));
        assert_eq!(config.bind_address, "0.0.0.0".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn overlay_ignores_blank_values() {
        let config = TestbayConfig::default()
            .overlay(env(&[("TESTBAY_DOCKER_BINARY", "")]))
            .expect("overlay");
        assert_eq!(config.docker_binary, "docker");
    }

    #[test]
    fn overlay_rejects_bad_bind_address() {
        let err = TestbayConfig::default()
            .overlay(env(&[("TESTBAY_BIND_ADDRESS", "not-an-ip")]))
            .unwrap_err();
        assert!(matches!(err, TestbayError::Config { .. }));
    }

    #[test]
    fn config_file_fills_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("testbay.json");
        std::fs::write(&path, r#"{ "docker_binary": "/usr/local/bin/docker" }"#).expect("write");

        let config = TestbayConfig::load_with(&path, env(&[])).expect("load");
        assert_eq!(config.docker_binary, "/usr/local/bin/docker");
        assert_eq!(config.fixtures_dir, PathBuf::from("fixtures"));
        assert!(config.docker_host.is_none());
    }

    #[test]
    fn config_file_is_overridden_by_environment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("testbay.json");
        std::fs::write(&path, r#"{ "docker_host": "tcp://10.0.0.5:2376" }"#).expect("write");

        let docker_host = env(&[("DOCKER_HOST", "unix:///run/docker.sock")]);
        let config = TestbayConfig::load_with(&path, docker_host).expect("load");
        assert_eq!(config.docker_host.as_deref(), Some("unix:///run/docker.sock"));
        assert_eq!(config.engine_host(), "127.0.0.1");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TestbayConfig::load(Path::new("/nonexistent/testbay.json")).unwrap_err();
        assert!(matches!(err, TestbayError::Io { .. }));
    }
}
