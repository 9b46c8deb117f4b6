//! Domain primitive types used across the testbay workspace.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Identifier of a container instance, as assigned by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the abbreviated form engines print in listings.
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(self.0.as_str())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a built image, usually its tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(String);

impl ImageId {
    /// Creates a new image ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declares which fixture image to build and which ports it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerType {
    name: String,
    fixture_id: String,
    ports: Vec<u16>,
}

impl ContainerType {
    /// Creates a container type with no exposed ports.
    ///
    /// `name` is the display name embedded in log file names, `fixture_id`
    /// selects the image build context.
    #[must_use]
    pub fn new(name: impl Into<String>, fixture_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixture_id: fixture_id.into(),
            ports: Vec::new(),
        }
    }

    /// Declares an exposed container port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        if !self.ports.contains(&port) {
            self.ports.push(port);
        }
        self
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fixture id.
    #[must_use]
    pub fn fixture_id(&self) -> &str {
        &self.fixture_id
    }

    /// Returns the declared exposed ports.
    #[must_use]
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Returns the tag the fixture image is built under.
    #[must_use]
    pub fn image_tag(&self) -> String {
        format!("{}/{}", crate::constants::IMAGE_NAMESPACE, self.fixture_id)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Host side of a published container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortBinding {
    /// Port inside the container.
    pub container_port: u16,
    /// Host address the port is published on.
    pub host_ip: IpAddr,
    /// Port on the host.
    pub host_port: u16,
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host_ip {
            IpAddr::V4(ip) => write!(f, "{ip}:{}", self.host_port)?,
            IpAddr::V6(ip) => write!(f, "[{ip}]:{}", self.host_port)?,
        }
        write!(f, "->{}/tcp", self.container_port)
    }
}

/// Lifecycle state of a container handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Container is running.
    Running,
    /// Container has been removed; further destroys are no-ops.
    Destroyed,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_type_ignores_duplicate_ports() {
        let ty = ContainerType::new("SshdContainer", "sshd")
            .with_port(22)
            .with_port(22);
        assert_eq!(ty.ports(), &[22]);
        assert_eq!(ty.image_tag(), "testbay/sshd");
        assert_eq!(ty.to_string(), "SshdContainer");
    }

    #[test]
    fn short_id_truncates_long_ids() {
        let id = ContainerId::new("0123456789abcdef0123");
        assert_eq!(id.short(), "0123456789ab");
        assert_eq!(ContainerId::new("abc").short(), "abc");
    }

    #[test]
    fn port_binding_display() {
        let v4 = PortBinding {
            container_port: 22,
            host_ip: "127.0.0.1".parse().unwrap(),
            host_port: 49153,
        };
        assert_eq!(v4.to_string(), "127.0.0.1:49153->22/tcp");

        let v6 = PortBinding {
            container_port: 22,
            host_ip: "::1".parse().unwrap(),
            host_port: 49154,
        };
        assert_eq!(v6.to_string(), "[::1]:49154->22/tcp");
    }
}
