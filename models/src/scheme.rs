//! Transport scheme and shutdown policy.

use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;

const TCP_NAME: &str = "tcp";
const UNIX_NAME: &str = "unix";
const IMMEDIATE_NAME: &str = "immediate";
const GRACEFUL_NAME: &str = "graceful";

/// Socket scheme the plugin listens on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Loopback TCP (`127.0.0.1:<port>`).
    Tcp,
    /// Unix-domain socket with a random file name.
    #[default]
    Unix,
}

impl Scheme {
    /// Resolve a scheme from its textual selector.
    ///
    /// Only `tcp` selects TCP; every other value falls back to unix.
    pub fn from_selector(selector: &str) -> Self {
        if selector == TCP_NAME {
            Scheme::Tcp
        } else {
            Scheme::Unix
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Tcp => TCP_NAME,
            Scheme::Unix => UNIX_NAME,
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

/// What the control surface does when the host asks the plugin to exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Terminate the process on the spot with the requested status.
    #[default]
    Immediate,
    /// Stop accepting, let in-flight connections drain, then return the status.
    Graceful,
}

impl ShutdownMode {
    /// Resolve a mode from its textual selector, falling back to immediate.
    pub fn from_selector(selector: &str) -> Self {
        if selector == GRACEFUL_NAME {
            ShutdownMode::Graceful
        } else {
            ShutdownMode::Immediate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownMode::Immediate => IMMEDIATE_NAME,
            ShutdownMode::Graceful => GRACEFUL_NAME,
        }
    }
}

impl Display for ShutdownMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}
