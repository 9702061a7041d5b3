//! Line-oriented status channel towards the host process.
//!
//! Every line has the shape `<prefix>: <key>: <value>`. The host reads these
//! from the plugin's stdout to learn what was exposed, where to connect and
//! which secret to present.

use std::io::{Write, stdout};
use std::sync::{Mutex, PoisonError};

use log::error;

pub const KEY_OBJECTS: &str = "objects";
pub const KEY_FATAL: &str = "fatal";
pub const KEY_AUTH_TOKEN: &str = "auth-token";
pub const KEY_READY: &str = "ready";

/// Error code reported when no candidate address could be bound.
pub const ERR_CONNECTION_FAILED: &str = "err-connection-failed";

/// Error code reported when the listener fails to accept.
pub const ERR_HTTP_SERVE: &str = "err-http-serve";

/// Sink for handshake/status lines.
pub trait HandshakeChannel: Send + Sync {
    fn output(&self, key: &str, value: &str);
}

pub(crate) fn format_line(prefix: &str, key: &str, value: &str) -> String {
    format!("{prefix}: {key}: {value}")
}

/// Writes status lines to stdout, flushing after each one.
pub struct StdoutHandshake {
    prefix: String,
}

impl StdoutHandshake {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl HandshakeChannel for StdoutHandshake {
    fn output(&self, key: &str, value: &str) {
        let line = format_line(&self.prefix, key, value);
        let mut out = stdout().lock();

        // The host is gone if stdout is closed; nothing else can carry the message.
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            error!("Failed to write handshake line '{key}': {e}");
        }
    }
}

/// Keeps status lines in memory, for embedding hosts and tests.
#[derive(Default)]
pub struct MemoryHandshake {
    prefix: String,
    lines: Mutex<Vec<(String, String)>>,
}

impl MemoryHandshake {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    /// Rendered lines, in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.entries()
            .iter()
            .map(|(key, value)| format_line(&self.prefix, key, value))
            .collect()
    }

    /// Raw `(key, value)` pairs, in emission order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All values emitted under `key`.
    pub fn values(&self, key: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v)
            .collect()
    }

    /// First value emitted under `key`.
    pub fn first(&self, key: &str) -> Option<String> {
        self.values(key).into_iter().next()
    }
}

impl HandshakeChannel for MemoryHandshake {
    fn output(&self, key: &str, value: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), value.to_string()));
    }
}
