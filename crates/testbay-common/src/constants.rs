//! System-wide constants and environment variable names.

/// Binary name for the CLI.
pub const BIN_NAME: &str = "tbay";

/// Container engine binary looked up on `PATH` when nothing else is configured.
pub const DEFAULT_DOCKER_BINARY: &str = "docker";

/// Directory holding one image build context per fixture id.
pub const DEFAULT_FIXTURES_DIR: &str = "fixtures";

/// Host assumed for the engine when `DOCKER_HOST` is unset or points at a socket.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Namespace prefix of every image tag built for a fixture.
pub const IMAGE_NAMESPACE: &str = "testbay";

/// Prefix of per-run container log files.
pub const RUN_LOG_PREFIX: &str = "docker-";

/// Suffix of per-run container log files.
pub const RUN_LOG_SUFFIX: &str = ".log";

/// Standard engine endpoint variable, e.g. `tcp://10.0.0.5:2376`.
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";

/// Overrides the engine binary.
pub const DOCKER_BINARY_ENV: &str = "TESTBAY_DOCKER_BINARY";

/// Overrides the fixtures directory.
pub const FIXTURES_DIR_ENV: &str = "TESTBAY_FIXTURES_DIR";

/// Overrides the directory run logs are created in.
pub const LOG_DIR_ENV: &str = "TESTBAY_LOG_DIR";

/// Overrides the host address published container ports bind to.
pub const BIND_ADDRESS_ENV: &str = "TESTBAY_BIND_ADDRESS";
