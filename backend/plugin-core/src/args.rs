//! Command-line options the host passes to every plugin.
//!
//! Options live in the `pingo:` namespace so they can sit next to the plugin's
//! own arguments. Both `-pingo:proto=tcp` and `--pingo:proto tcp` spellings are
//! accepted; anything outside the namespace is ignored here.

use models::server_config::DEFAULT_PREFIX;
use models::{ModelError, Scheme, ServerConfig, ServerConfigBuilder, ShutdownMode};

use std::env::args;
use std::time::Duration;

use clap::Parser;

const NAMESPACE: &str = "pingo:";
const DEFAULT_DRAIN_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(no_binary_name = true, disable_help_flag = true, disable_version_flag = true)]
pub struct PluginArgs {
    /// Protocol to use: unix or tcp
    #[arg(long = "pingo:proto", default_value = "unix")]
    pub proto: String,

    /// Alternative directory for unix sockets
    #[arg(long = "pingo:unixdir", default_value = "")]
    pub unixdir: String,

    /// Prefix of handshake output lines
    #[arg(long = "pingo:prefix", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Maximum simultaneously served connections, 0 for unbounded
    #[arg(long = "pingo:max-conns", default_value_t = 0)]
    pub max_conns: usize,

    /// What the Exit procedure does: immediate or graceful
    #[arg(long = "pingo:shutdown", default_value = "immediate")]
    pub shutdown: String,

    /// Graceful drain window in milliseconds
    #[arg(long = "pingo:drain-ms", default_value_t = DEFAULT_DRAIN_MS)]
    pub drain_ms: u64,
}

impl PluginArgs {
    /// Parse the current process arguments.
    pub fn from_env() -> Result<Self, clap::Error> {
        Self::parse_lenient(args().skip(1))
    }

    /// Parse `args` (without the binary name), keeping only `pingo:` options.
    pub fn parse_lenient<I, S>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::try_parse_from(namespaced(args.into_iter().map(Into::into)))
    }

    /// Turn the parsed options into a validated configuration.
    pub fn into_config(self) -> Result<ServerConfig, ModelError> {
        let max_connections = (self.max_conns > 0).then_some(self.max_conns);

        ServerConfigBuilder::default()
            .with_scheme(Scheme::from_selector(&self.proto))
            .with_unix_dir(self.unixdir)
            .with_prefix(self.prefix)
            .with_max_connections(max_connections)
            .with_shutdown_mode(ShutdownMode::from_selector(&self.shutdown))
            .with_drain_timeout(Duration::from_millis(self.drain_ms))
            .build()
    }
}

/// Keep `pingo:` options (and their detached values), normalized to `--` form.
fn namespaced(args: impl Iterator<Item = String>) -> Vec<String> {
    let mut kept = Vec::new();
    let mut args = args.peekable();

    while let Some(arg) = args.next() {
        let Some(option) = arg.trim_start_matches('-').strip_prefix(NAMESPACE) else {
            continue;
        };
        if !arg.starts_with('-') {
            continue;
        }

        let has_inline_value = option.contains('=');
        kept.push(format!("--{NAMESPACE}{option}"));

        if !has_inline_value {
            if let Some(value) = args.next_if(|next| !next.starts_with('-')) {
                kept.push(value);
            }
        }
    }

    kept
}
