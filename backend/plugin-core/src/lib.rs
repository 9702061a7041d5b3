pub mod args;
pub mod auth;
pub mod control;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod handshake;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod transport;

#[cfg(test)]
mod tests;

pub use engine::{CallEngine, JsonLineEngine, RpcObject};
pub use error::{RpcError, ServerError};
pub use handshake::{HandshakeChannel, MemoryHandshake, StdoutHandshake};
pub use server::{PluginServer, Shutdown};

/// Length of the auth secret, in bytes, both in the `auth-token` line and on the wire.
pub const SECRET_LEN: usize = 64;

/// Length of generated unix socket names.
pub const UNIX_NAME_LEN: usize = 8;

/// Host every TCP listener binds to.
pub const TCP_HOST: &str = "127.0.0.1";
