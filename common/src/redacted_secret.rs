//! Auth secret handling with redacted Debug output.

use crate::{ErrorLocation, SecretError, random_alphanumeric};

use std::fmt;

use serde::ser::Error;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// A shared secret that never exposes its value in logs or debug output.
///
/// The value is printable ASCII so it can travel over a line-oriented
/// status channel unchanged.
#[derive(Clone)]
pub struct RedactedSecret {
    inner: String,
}

impl RedactedSecret {
    /// Wrap an existing secret value.
    pub fn new(secret: String) -> Self {
        Self { inner: secret }
    }

    /// Generate a fresh random secret of `len` bytes.
    pub fn generate(len: usize) -> Self {
        Self::new(random_alphanumeric(len))
    }

    /// Get the actual secret value.
    ///
    /// # Security Note
    /// Only call this when handing the secret to the host process.
    #[inline]
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Raw bytes of the secret, as they appear on the wire.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Get the secret length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the secret is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Compare `candidate` against the secret in constant time.
    ///
    /// Candidates of a different length never match.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        let expected = self.as_bytes();
        expected.len() == candidate.len() && bool::from(expected.ct_eq(candidate))
    }
}

impl fmt::Debug for RedactedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedSecret([REDACTED])")
    }
}

impl fmt::Display for RedactedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED SECRET]")
    }
}

impl Drop for RedactedSecret {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Prevent accidental serialization
impl serde::Serialize for RedactedSecret {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(SecretError::Serialization {
            message: String::from("RedactedSecret cannot be serialized - use expose() explicitly"),
            location: ErrorLocation::caller(),
        }))
    }
}
