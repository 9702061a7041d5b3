use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RpcError {
    #[error("Decode Error: {message} {location}")]
    Decode {
        message: String,
        location: ErrorLocation,
    },

    #[error("Encode Error: {message} {location}")]
    Encode {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    /// No registered object or method answers to the requested name.
    #[error("Unknown Method Error: {message} {location}")]
    UnknownMethod {
        message: String,
        location: ErrorLocation,
    },

    /// The procedure itself reported a failure.
    #[error("Call Error: {message} {location}")]
    Call {
        message: String,
        location: ErrorLocation,
    },
}

impl RpcError {
    /// Build a [`RpcError::Call`] from inside a procedure body.
    #[track_caller]
    pub fn call(message: impl Into<String>) -> Self {
        RpcError::Call {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Message without the location suffix, suitable for a reply to the peer.
    pub fn message(&self) -> &str {
        match self {
            RpcError::Decode { message, .. }
            | RpcError::Encode { message, .. }
            | RpcError::Io { message, .. }
            | RpcError::UnknownMethod { message, .. }
            | RpcError::Call { message, .. } => message,
        }
    }
}

impl From<IoError> for RpcError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        RpcError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        RpcError::Decode {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
