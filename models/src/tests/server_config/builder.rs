use crate::server_config::DEFAULT_PREFIX;
use crate::{ModelError, Scheme, ServerConfigBuilder, ShutdownMode};

use std::path::Path;
use std::time::Duration;

/// **VALUE**: Verifies that an empty builder yields the documented defaults.
///
/// **WHY THIS MATTERS**: A host that passes no options expects a unix socket in the
/// default location and `pingo`-prefixed status lines.
///
/// **BUG THIS CATCHES**: Would catch a default drifting (e.g. TCP by default, empty prefix).
#[test]
fn given_empty_builder_when_building_then_uses_defaults() {
    // GIVEN/WHEN: Building with nothing set
    let config = ServerConfigBuilder::default().build().unwrap();

    // THEN: Defaults apply
    assert_eq!(config.scheme(), Scheme::Unix);
    assert_eq!(config.unix_dir(), None);
    assert_eq!(config.prefix(), DEFAULT_PREFIX);
    assert_eq!(config.max_connections(), None);
    assert_eq!(config.shutdown_mode(), ShutdownMode::Immediate);
}

/// **VALUE**: Verifies every explicit setting is carried into the built config.
///
/// **BUG THIS CATCHES**: Would catch a `with_*` method writing to the wrong field.
#[test]
fn given_all_fields_when_building_then_config_reflects_them() {
    // GIVEN: Builder with every field set
    let config = ServerConfigBuilder::default()
        .with_scheme(Scheme::Tcp)
        .with_unix_dir("/run/plugins")
        .with_prefix("myhost")
        .with_max_connections(Some(8))
        .with_shutdown_mode(ShutdownMode::Graceful)
        .with_drain_timeout(Duration::from_millis(250))
        .with_accept_backoff_max(Duration::from_secs(3))
        .build()
        .unwrap();

    // THEN
    assert_eq!(config.scheme(), Scheme::Tcp);
    assert_eq!(config.unix_dir(), Some(Path::new("/run/plugins")));
    assert_eq!(config.prefix(), "myhost");
    assert_eq!(config.max_connections(), Some(8));
    assert_eq!(config.shutdown_mode(), ShutdownMode::Graceful);
    assert_eq!(config.drain_timeout(), Duration::from_millis(250));
    assert_eq!(config.accept_backoff_max(), Duration::from_secs(3));
}

/// **VALUE**: Verifies that an empty prefix is rejected.
///
/// **WHY THIS MATTERS**: The host locates status lines by prefix. An empty prefix makes
/// every line of stdout look like a plugin status line.
///
/// **BUG THIS CATCHES**: Would catch removal of the prefix validation.
#[test]
fn given_empty_prefix_when_building_then_returns_validation_error() {
    // GIVEN: Builder with an empty prefix
    let result = ServerConfigBuilder::default().with_prefix("").build();

    // THEN: Validation error
    match result.unwrap_err() {
        ModelError::Validation { message, .. } => {
            assert_eq!(message, "Prefix cannot be empty");
        }
    }
}

#[test]
fn given_prefix_with_newline_when_building_then_returns_validation_error() {
    let result = ServerConfigBuilder::default().with_prefix("a\nb").build();

    assert!(matches!(result, Err(ModelError::Validation { .. })));
}

/// **VALUE**: Verifies that an empty unix directory behaves as "not configured".
///
/// **WHY THIS MATTERS**: The CLI default for the directory is the empty string; joining
/// with an empty path must not happen.
///
/// **BUG THIS CATCHES**: Would catch `Some("")` leaking into the allocator.
#[test]
fn given_empty_unix_dir_when_building_then_dir_is_none() {
    let config = ServerConfigBuilder::default()
        .with_unix_dir("")
        .build()
        .unwrap();

    assert_eq!(config.unix_dir(), None);
}

#[test]
fn given_zero_max_connections_when_building_then_returns_validation_error() {
    let result = ServerConfigBuilder::default()
        .with_max_connections(Some(0))
        .build();

    assert!(matches!(result, Err(ModelError::Validation { .. })));
}

#[test]
fn given_zero_backoff_window_when_building_then_returns_validation_error() {
    let result = ServerConfigBuilder::default()
        .with_accept_backoff_max(Duration::ZERO)
        .build();

    assert!(matches!(result, Err(ModelError::Validation { .. })));
}
