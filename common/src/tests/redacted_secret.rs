use crate::RedactedSecret;

/// **VALUE**: Verifies that the secret never leaks through Debug or Display.
///
/// **WHY THIS MATTERS**: The server logs its state at startup. A leaked secret in a
/// log file lets any local process impersonate the host.
///
/// **BUG THIS CATCHES**: Would catch a `#[derive(Debug)]` replacing the manual impl.
#[test]
fn given_secret_when_formatted_then_value_is_redacted() {
    // GIVEN: A secret with a recognizable value
    let secret = RedactedSecret::new(String::from("super-secret-value"));

    // WHEN: Formatting
    let debug = format!("{secret:?}");
    let display = format!("{secret}");

    // THEN: Value is absent
    assert!(!debug.contains("super-secret-value"));
    assert!(!display.contains("super-secret-value"));
}

/// **VALUE**: Verifies serialization is refused.
///
/// **BUG THIS CATCHES**: Would catch the secret being embedded in a JSON payload.
#[test]
fn given_secret_when_serialized_then_returns_error() {
    let secret = RedactedSecret::generate(64);

    let result = serde_json::to_string(&secret);

    assert!(result.is_err(), "Serialization must fail");
}

/// **VALUE**: Verifies `matches` is exact: same bytes pass, any difference or length change fails.
///
/// **WHY THIS MATTERS**: This is the comparison behind connection authentication.
///
/// **BUG THIS CATCHES**: Would catch prefix matching or length-insensitive comparison.
#[test]
fn given_candidates_when_matching_then_only_identical_bytes_pass() {
    // GIVEN: A generated 64-byte secret
    let secret = RedactedSecret::generate(64);
    let exact = secret.as_bytes().to_vec();

    let mut flipped = exact.clone();
    flipped[63] ^= 0x01;

    // THEN
    assert!(secret.matches(&exact));
    assert!(!secret.matches(&flipped));
    assert!(!secret.matches(&exact[..63]));
    assert!(!secret.matches(&[]));
    assert_eq!(secret.len(), 64);
}
