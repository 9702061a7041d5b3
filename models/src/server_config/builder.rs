use crate::error::model_error::ModelError;
use crate::server_config::{DEFAULT_ACCEPT_BACKOFF_MAX, DEFAULT_DRAIN_TIMEOUT, DEFAULT_PREFIX};
use crate::{ErrorLocation, Scheme, ServerConfig, ShutdownMode};

use std::panic::Location;
use std::path::PathBuf;
use std::time::Duration;

/// Builder for creating validated ServerConfig instances.
///
/// Every field is optional; unset fields take the documented defaults.
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    scheme: Option<Scheme>,
    unix_dir: Option<PathBuf>,
    prefix: Option<String>,
    max_connections: Option<Option<usize>>,
    shutdown_mode: Option<ShutdownMode>,
    drain_timeout: Option<Duration>,
    accept_backoff_max: Option<Duration>,
}

impl ServerConfigBuilder {
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn with_unix_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.unix_dir = Some(dir.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Cap simultaneously served connections; `None` removes the cap.
    pub fn with_max_connections(mut self, max: Option<usize>) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn with_shutdown_mode(mut self, mode: ShutdownMode) -> Self {
        self.shutdown_mode = Some(mode);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    pub fn with_accept_backoff_max(mut self, window: Duration) -> Self {
        self.accept_backoff_max = Some(window);
        self
    }

    /// Build the ServerConfig with validation.
    #[track_caller]
    pub fn build(self) -> Result<ServerConfig, ModelError> {
        let prefix = self.prefix.unwrap_or_else(|| String::from(DEFAULT_PREFIX));

        if prefix.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Prefix cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if prefix.contains(['\n', '\r']) {
            return Err(ModelError::Validation {
                message: String::from("Prefix cannot contain line breaks"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let unix_dir = self.unix_dir.filter(|dir| !dir.as_os_str().is_empty());

        // Unbounded unless asked for.
        let max_connections = self.max_connections.flatten();

        if max_connections == Some(0) {
            return Err(ModelError::Validation {
                message: String::from("Max connections must be non-zero (use None for unbounded)"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let accept_backoff_max = self
            .accept_backoff_max
            .unwrap_or(DEFAULT_ACCEPT_BACKOFF_MAX);

        if accept_backoff_max.is_zero() {
            return Err(ModelError::Validation {
                message: String::from("Accept backoff window must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(ServerConfig {
            scheme: self.scheme.unwrap_or_default(),
            unix_dir,
            prefix,
            max_connections,
            shutdown_mode: self.shutdown_mode.unwrap_or_default(),
            drain_timeout: self.drain_timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT),
            accept_backoff_max,
        })
    }
}
