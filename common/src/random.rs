//! Random printable identifiers.

use rand::Rng;
use rand::distributions::Alphanumeric;

/// Generate `len` unpredictable alphanumeric characters.
///
/// Backed by the thread-local CSPRNG, so the output is suitable for auth
/// secrets as well as socket names.
pub fn random_alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
