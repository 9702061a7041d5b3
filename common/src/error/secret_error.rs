use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Misuse of a [`crate::RedactedSecret`].
#[derive(Debug, ThisError)]
pub enum SecretError {
    /// Secrets refuse to be serialized; the holder must call `expose()` on purpose.
    #[error("Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },
}
