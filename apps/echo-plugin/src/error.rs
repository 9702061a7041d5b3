use common::ErrorLocation;

use serde::Serialize;
use thiserror::Error;

/// Errors that end the plugin process with a non-zero status.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PluginError {
    /// Error from this binary (logger setup and the like)
    #[error("Plugin Error: {message} {location}")]
    Plugin {
        message: String,
        location: ErrorLocation,
    },

    /// Command line options could not be turned into a configuration
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The plugin server failed to bind or serve
    #[error("Server Error: {message} {location}")]
    Server {
        message: String,
        location: ErrorLocation,
    },
}
