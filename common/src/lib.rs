//! Shared primitives for the plugin workspace.
//!
//! This crate holds the small pieces every other crate leans on:
//! source-located errors, the redacted auth secret and the random
//! name generator used for tokens and socket names.
//!
//! ## Architecture
//!
//! - **common** (this crate): Error plumbing and secret handling
//! - **models**: Configuration data with validated builders
//! - **plugin-core**: Transport, bootstrap and dispatch
//! - **echo-plugin**: Demo plugin binary wiring everything together

pub mod error;
pub mod random;
pub mod redacted_secret;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::secret_error::SecretError;
pub use random::random_alphanumeric;
pub use redacted_secret::RedactedSecret;
