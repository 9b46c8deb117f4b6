//! Contracts between the lifecycle and the container engine.
//!
//! The lifecycle never inspects a handle beyond these operations, so tests
//! can substitute an in-memory engine for the docker backend.

use std::net::{IpAddr, ToSocketAddrs};
use std::path::Path;

use testbay_common::error::{Result, TestbayError};
use testbay_common::types::{ContainerId, ContainerType, ImageId, PortBinding};

/// A built image, ready to be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Engine reference of the image.
    pub id: ImageId,
    /// Container type the image was built for.
    pub container_type: ContainerType,
}

/// A running container instance.
pub trait ContainerHandle {
    /// Returns the engine-assigned identifier.
    fn id(&self) -> &ContainerId;

    /// Returns the host bindings of every published port.
    fn bindings(&self) -> &[PortBinding];

    /// Returns the host port a container port is published on.
    fn port(&self, container_port: u16) -> Option<u16> {
        self.bindings()
            .iter()
            .find(|b| b.container_port == container_port)
            .map(|b| b.host_port)
    }

    /// Returns the host address a container port is published on.
    fn ip_bound(&self, container_port: u16) -> Option<IpAddr> {
        self.bindings()
            .iter()
            .find(|b| b.container_port == container_port)
            .map(|b| b.host_ip)
    }

    /// Stops and removes the container.
    ///
    /// Calling this on an already destroyed handle does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine fails to remove the container.
    fn destroy(&mut self) -> Result<()>;
}

/// A container engine able to build fixture images and start them.
pub trait ContainerEngine {
    /// Handle type returned by [`ContainerEngine::start`].
    type Handle: ContainerHandle;

    /// Returns whether the engine is installed and reachable.
    fn is_available(&self) -> bool;

    /// Returns the host name or address the engine runs on.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine endpoint is misconfigured.
    fn host(&self) -> Result<String>;

    /// Builds (or fetches) the image for a container type.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be produced.
    fn build(&self, container_type: &ContainerType) -> Result<Image>;

    /// Starts a container from `image`, directing its output to `log`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot create or launch the container.
    fn start(&self, image: &Image, log: &Path) -> Result<Self::Handle>;
}

/// Resolves an engine host name to an address.
///
/// Literal addresses are parsed directly; names go through the system
/// resolver and the first address wins.
///
/// # Errors
///
/// Returns [`TestbayError::Config`] if the host cannot be resolved; the
/// engine host setting is wrong rather than the engine being absent.
pub fn resolve_host(host: &str) -> Result<IpAddr> {
    let trimmed = host.trim().trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(ip);
    }

    let mut addrs = (trimmed, 0)
        .to_socket_addrs()
        .map_err(|e| TestbayError::Config {
            message: format!("cannot resolve engine host {host}: {e}"),
        })?;
    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| TestbayError::Config {
            message: format!("engine host {host} has no address"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bound(ContainerId, Vec<PortBinding>);

    impl ContainerHandle for Bound {
        fn id(&self) -> &ContainerId {
            &self.0
        }

        fn bindings(&self) -> &[PortBinding] {
            &self.1
        }

        fn destroy(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn port_accessors_find_binding() {
        let handle = Bound(
            ContainerId::new("c1"),
            vec![PortBinding {
                container_port: 22,
                host_ip: "127.0.0.1".parse().unwrap(),
                host_port: 32768,
            }],
        );
        assert_eq!(handle.port(22), Some(32768));
        assert_eq!(handle.ip_bound(22), Some("127.0.0.1".parse().unwrap()));
        assert_eq!(handle.port(80), None);
        assert_eq!(handle.ip_bound(80), None);
    }

    #[test]
    fn resolve_literal_addresses() {
        assert!(resolve_host("127.0.0.1").unwrap().is_loopback());
        assert!(resolve_host("::1").unwrap().is_loopback());
        assert!(resolve_host("[::1]").unwrap().is_loopback());
        assert!(!resolve_host("10.0.0.5").unwrap().is_loopback());
    }

    #[test]
    fn resolve_localhost_is_loopback() {
        assert!(resolve_host("localhost").unwrap().is_loopback());
    }

    #[test]
    fn unresolvable_host_is_a_configuration_error() {
        let err = resolve_host("no-such-host.invalid").unwrap_err();
        assert!(matches!(err, TestbayError::Config { .. }));
        assert!(!err.is_environment_unavailable());
    }
}
