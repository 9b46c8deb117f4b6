//! Test-scoped container lifecycle.
//!
//! ```text
//! Idle -> Resolving -> Building -> Started -> (in use) -> [log dumped] -> Released -> Idle
//! ```
//!
//! The container and its run log are created lazily on the first
//! [`ScopedContainerLifecycle::acquire`] and released when the guarded body
//! finishes, whatever its outcome.

use std::io::Write;
use std::path::{Path, PathBuf};

use testbay_common::error::{Result, TestbayError};
use testbay_common::types::ContainerType;

use crate::engine::{self, ContainerEngine, ContainerHandle, Image};
use crate::guard::{self, GuardError};
use crate::logs;

/// Resources held by the lifecycle.
enum Scope<H> {
    /// Nothing allocated.
    Idle,
    /// The run log exists but the container has not started.
    Provisioning { run_log: PathBuf },
    /// A started, not yet destroyed container and its run log.
    Active { handle: H, run_log: PathBuf },
}

impl<H> Scope<H> {
    const fn run_log(&self) -> Option<&PathBuf> {
        match self {
            Self::Idle => None,
            Self::Provisioning { run_log } | Self::Active { run_log, .. } => Some(run_log),
        }
    }
}

/// Owns at most one container of a given type for the duration of a test.
pub struct ScopedContainerLifecycle<E: ContainerEngine> {
    engine: E,
    container_type: ContainerType,
    local_only: bool,
    log_dir: PathBuf,
    diagnostics: Box<dyn Write + Send>,
    scope: Scope<E::Handle>,
}

impl<E: ContainerEngine> ScopedContainerLifecycle<E> {
    /// Creates an idle lifecycle for `container_type`.
    ///
    /// Run logs go to the system temp directory and failures are dumped to
    /// standard error until configured otherwise.
    #[must_use]
    pub fn new(engine: E, container_type: ContainerType) -> Self {
        Self {
            engine,
            container_type,
            local_only: false,
            log_dir: std::env::temp_dir(),
            diagnostics: Box::new(std::io::stderr()),
            scope: Scope::Idle,
        }
    }

    /// Requires the engine to run on the loopback interface.
    #[must_use]
    pub fn local_only(mut self) -> Self {
        self.local_only = true;
        self
    }

    /// Sets the directory run logs are created in.
    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Sets where captured container output is dumped on failure.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: impl Write + Send + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// Returns the managed container type.
    #[must_use]
    pub const fn container_type(&self) -> &ContainerType {
        &self.container_type
    }

    /// Returns whether a local engine is required.
    #[must_use]
    pub const fn is_local_only(&self) -> bool {
        self.local_only
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Returns whether a container or run log is currently held.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self.scope, Scope::Idle)
    }

    /// Returns the current run log, if one exists.
    #[must_use]
    pub fn run_log(&self) -> Option<&Path> {
        self.scope.run_log().map(PathBuf::as_path)
    }

    /// Checks the environment and produces the image for the container type.
    ///
    /// # Errors
    ///
    /// Returns [`TestbayError::EnvironmentUnavailable`] if the engine is
    /// unreachable, or if a local engine is required and the engine host is
    /// not a loopback address. An engine host that does not resolve is a
    /// [`TestbayError::Config`] error. Build errors are returned as
    /// [`TestbayError::StartFailure`] or the engine's own failure, never as
    /// a skip.
    pub fn resolve_image(&self) -> Result<Image> {
        tracing::debug!(container_type = %self.container_type, "resolving engine");
        if !self.engine.is_available() {
            return Err(TestbayError::unavailable(format!(
                "a container engine is needed for {}",
                self.container_type
            )));
        }

        if self.local_only {
            let host = self.engine.host().map_err(|e| self.hard_failure(e))?;
            let ip = engine::resolve_host(&host)?;
            if !ip.is_loopback() {
                return Err(TestbayError::unavailable(format!(
                    "a container engine is needed locally for {} but is running on {host}",
                    self.container_type
                )));
            }
        }

        tracing::info!(container_type = %self.container_type, "building image");
        self.engine
            .build(&self.container_type)
            .map_err(|e| self.hard_failure(e))
    }

    /// Returns the running container, building and starting it on first use.
    ///
    /// Later calls return the same handle without touching the engine.
    ///
    /// # Errors
    ///
    /// Returns the error of [`Self::resolve_image`], an I/O error if the run
    /// log cannot be created, or a start failure from the engine.
    pub fn acquire(&mut self) -> Result<&E::Handle> {
        self.provision()?;
        match &self.scope {
            Scope::Active { handle, .. } => Ok(handle),
            Scope::Idle | Scope::Provisioning { .. } => Err(TestbayError::StartFailure {
                container_type: self.container_type.to_string(),
                message: "container did not reach the running state".into(),
            }),
        }
    }

    /// Runs `body` with guaranteed release of the container and run log.
    ///
    /// A skip is returned untouched. A failure or panic first dumps the run
    /// log to the diagnostics sink, then propagates unchanged. Both cleanup
    /// steps are attempted on every path.
    ///
    /// # Errors
    ///
    /// Returns the body's own error, or a cleanup failure if the body
    /// succeeded but releasing the resources did not.
    pub fn run_guarded<T, F>(&mut self, body: F) -> std::result::Result<T, GuardError>
    where
        F: FnOnce(&mut Self) -> std::result::Result<T, GuardError>,
    {
        guard::run_scoped(self, body, Self::dump_run_log, Self::release)
    }

    /// Deletes the run log and destroys the container, returning to idle.
    ///
    /// Each step runs even if the other fails.
    ///
    /// # Errors
    ///
    /// Returns [`TestbayError::Cleanup`] listing every step that failed.
    pub fn release(&mut self) -> Result<()> {
        let (handle, run_log) = match std::mem::replace(&mut self.scope, Scope::Idle) {
            Scope::Idle => return Ok(()),
            Scope::Provisioning { run_log } => (None, run_log),
            Scope::Active { handle, run_log } => (Some(handle), run_log),
        };

        let mut failures = Vec::new();
        if let Err(e) = logs::remove_log(&run_log) {
            tracing::warn!(error = %e, path = %run_log.display(), "failed to remove run log");
            failures.push(e.to_string());
        }
        if let Some(mut handle) = handle {
            match handle.destroy() {
                Ok(()) => tracing::info!(id = %handle.id(), "container destroyed"),
                Err(e) => {
                    tracing::warn!(error = %e, id = %handle.id(), "failed to destroy container");
                    failures.push(e.to_string());
                }
            }
        }

        tracing::debug!(container_type = %self.container_type, "released");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TestbayError::Cleanup { failures })
        }
    }

    fn provision(&mut self) -> Result<()> {
        if matches!(self.scope, Scope::Active { .. }) {
            return Ok(());
        }

        let image = self.resolve_image()?;
        let run_log = match std::mem::replace(&mut self.scope, Scope::Idle) {
            Scope::Provisioning { run_log } => run_log,
            Scope::Idle => logs::create_run_log(&self.log_dir, &self.container_type)?,
            active @ Scope::Active { .. } => {
                self.scope = active;
                return Ok(());
            }
        };

        tracing::info!(image = %image.id, log = %run_log.display(), "starting container");
        match self.engine.start(&image, &run_log) {
            Ok(handle) => {
                tracing::info!(id = %handle.id(), container_type = %self.container_type, "container started");
                self.scope = Scope::Active { handle, run_log };
                Ok(())
            }
            Err(e) => {
                self.scope = Scope::Provisioning { run_log };
                Err(self.hard_failure(e))
            }
        }
    }

    fn dump_run_log(&mut self) {
        let Some(run_log) = self.scope.run_log() else {
            return;
        };
        tracing::info!(path = %run_log.display(), "dumping container output");
        if let Err(e) = logs::dump_log(run_log, &mut *self.diagnostics) {
            tracing::warn!(error = %e, "failed to dump run log");
        }
    }

    /// Engine errors after availability was confirmed are never skips.
    fn hard_failure(&self, err: TestbayError) -> TestbayError {
        match err {
            TestbayError::EnvironmentUnavailable { reason } => TestbayError::StartFailure {
                container_type: self.container_type.to_string(),
                message: reason,
            },
            other => other,
        }
    }
}

impl<E: ContainerEngine> Drop for ScopedContainerLifecycle<E> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release container on drop");
        }
    }
}

impl<E: ContainerEngine> std::fmt::Debug for ScopedContainerLifecycle<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedContainerLifecycle")
            .field("container_type", &self.container_type)
            .field("local_only", &self.local_only)
            .field("log_dir", &self.log_dir)
            .field("run_log", &self.scope.run_log())
            .field("active", &matches!(self.scope, Scope::Active { .. }))
            .finish_non_exhaustive()
    }
}
