pub mod builder;

use crate::{Scheme, ShutdownMode};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

/// Default prefix for every handshake line.
pub const DEFAULT_PREFIX: &str = "pingo";

/// Default graceful drain window.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default window of consecutive accept failures tolerated before giving up.
pub const DEFAULT_ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Immutable plugin server configuration.
///
/// Built once through [`ServerConfigBuilder`](builder::ServerConfigBuilder) and
/// never modified afterwards. The resolved listen address is not part of the
/// configuration; it only exists after a successful bind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerConfig {
    scheme: Scheme,
    unix_dir: Option<PathBuf>,
    prefix: String,
    max_connections: Option<usize>,
    shutdown_mode: ShutdownMode,
    drain_timeout: Duration,
    accept_backoff_max: Duration,
}

impl ServerConfig {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Base directory for unix socket names, if one was configured.
    pub fn unix_dir(&self) -> Option<&Path> {
        self.unix_dir.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `None` means unbounded.
    pub fn max_connections(&self) -> Option<usize> {
        self.max_connections
    }

    pub fn shutdown_mode(&self) -> ShutdownMode {
        self.shutdown_mode
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn accept_backoff_max(&self) -> Duration {
        self.accept_backoff_max
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::default(),
            unix_dir: None,
            prefix: String::from(DEFAULT_PREFIX),
            max_connections: None,
            shutdown_mode: ShutdownMode::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            accept_backoff_max: DEFAULT_ACCEPT_BACKOFF_MAX,
        }
    }
}
