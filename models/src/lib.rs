//! Configuration models for the plugin server.
//!
//! Pure data: the transport scheme, the shutdown policy and the immutable
//! server configuration with its validating builder. No I/O lives here.

pub mod error;
pub mod scheme;
pub mod server_config;

#[cfg(test)]
mod tests;

pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use scheme::{Scheme, ShutdownMode};
pub use server_config::ServerConfig;
pub use server_config::builder::ServerConfigBuilder;
