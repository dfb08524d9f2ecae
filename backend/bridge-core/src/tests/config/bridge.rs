// Unit tests for BridgeConfig loading, validation and derived values

use crate::DEFAULT_WORKER_URL;
use crate::config::{BridgeConfig, OverflowPolicy, ReconnectConfig};
use crate::error::config::ConfigError;

use std::time::Duration;

use backoff::backoff::Backoff;
use tempfile::TempDir;

/// **VALUE**: Defaults point at the worker's well-known local endpoint.
///
/// **WHY THIS MATTERS**: A first run has no config file; the bridge must still
/// find a worker started on the standard port.
#[test]
fn given_default_config_when_ws_url_built_then_targets_local_worker_port() {
    // GIVEN: Default config
    let config = BridgeConfig::default();

    // WHEN: Building the endpoint
    let url = config.worker.ws_url().expect("default endpoint is valid");

    // THEN: ws://127.0.0.1:8765 with the documented timeouts
    assert_eq!(url.as_str(), "ws://127.0.0.1:8765/");
    assert_eq!(url.as_str().trim_end_matches('/'), DEFAULT_WORKER_URL);
    assert_eq!(config.worker.connect_timeout(), Duration::from_secs(15));
    assert!(!config.worker.auto_start);
    assert_eq!(config.queue.capacity, None);
    assert_eq!(config.queue.overflow, OverflowPolicy::DropOldest);
    assert!(config.validate().is_ok());
}

/// **VALUE**: A missing config file is not an error.
#[test]
fn given_empty_dir_when_load_then_returns_defaults() {
    // GIVEN: A directory without config.json
    let dir = TempDir::new().expect("temp dir");

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).expect("load should succeed");

    // THEN: Defaults
    assert_eq!(config, BridgeConfig::default());
}

/// **VALUE**: Saved configs load back unchanged and no temp file is left behind.
///
/// **BUG THIS CATCHES**: Would catch a save that forgets the rename step of the
/// atomic write, or a field that doesn't survive serialization.
#[test]
fn given_saved_config_when_load_then_values_survive() {
    // GIVEN: A customised config saved to disk
    let dir = TempDir::new().expect("temp dir");
    let mut config = BridgeConfig::default();
    config.worker.port = 9100;
    config.reconnect.multiplier = 1.0;
    config.queue.capacity = Some(50);
    config.queue.overflow = OverflowPolicy::Reject;
    config.save(dir.path()).expect("save should succeed");

    // WHEN: Loading it back
    let loaded = BridgeConfig::load(dir.path()).expect("load should succeed");

    // THEN: Same values, no leftover temp file
    assert_eq!(loaded, config);
    assert!(!dir.path().join("config.json.tmp").exists());
}

/// **VALUE**: Hand-edited files may set only the fields they care about.
#[test]
fn given_partial_json_when_load_then_missing_fields_use_defaults() {
    // GIVEN: config.json with only the worker port
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("config.json"), r#"{"worker":{"port":9001}}"#)
        .expect("write config");

    // WHEN: Loading
    let config = BridgeConfig::load(dir.path()).expect("load should succeed");

    // THEN: Port overridden, everything else default
    assert_eq!(config.worker.port, 9001);
    assert_eq!(config.worker.host, "127.0.0.1");
    assert_eq!(config.reconnect, ReconnectConfig::default());
}

/// **VALUE**: A corrupted file is reported, not silently replaced by defaults.
#[test]
fn given_corrupted_json_when_load_then_returns_parse_error() {
    // GIVEN: Garbage in config.json
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("config.json"), "{ not json").expect("write config");

    // WHEN: Loading
    let result = BridgeConfig::load(dir.path());

    // THEN: ParseError
    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

/// **VALUE**: Nonsensical reconnect and queue settings are rejected up front.
///
/// **BUG THIS CATCHES**: A multiplier below 1 would shrink delays towards zero
/// and turn the reconnect loop into a connection storm.
#[test]
fn given_invalid_values_when_validate_then_returns_validation_error() {
    // GIVEN: One broken value per config
    let mut shrinking = BridgeConfig::default();
    shrinking.reconnect.multiplier = 0.5;

    let mut inverted = BridgeConfig::default();
    inverted.reconnect.max_delay_ms = 1_000;

    let mut zero_capacity = BridgeConfig::default();
    zero_capacity.queue.capacity = Some(0);

    let mut no_program = BridgeConfig::default();
    no_program.worker.auto_start = true;

    // WHEN/THEN: Each fails validation
    for config in [shrinking, inverted, zero_capacity, no_program] {
        assert!(
            matches!(config.validate(), Err(ConfigError::ValidationError { .. })),
            "expected validation error for {config:?}"
        );
    }
}

/// **VALUE**: Reconnect delays grow geometrically and stop at the cap.
#[test]
fn given_default_reconnect_when_backoff_polled_then_doubles_until_cap() {
    // GIVEN: 5s initial, x2, 60s cap
    let mut backoff = ReconnectConfig::default().backoff();

    // WHEN: Polling six delays
    let delays: Vec<u128> = (0..6)
        .filter_map(|_| backoff.next_backoff())
        .map(|d| d.as_millis())
        .collect();

    // THEN: 5, 10, 20, 40, 60, 60 seconds
    assert_eq!(delays, vec![5_000, 10_000, 20_000, 40_000, 60_000, 60_000]);
}

/// **VALUE**: `multiplier = 1.0` reproduces the fixed 5 second delay.
#[test]
fn given_unit_multiplier_when_backoff_polled_then_delay_is_fixed() {
    // GIVEN: Fixed-delay policy
    let config = ReconnectConfig {
        multiplier: 1.0,
        ..Default::default()
    };
    let mut backoff = config.backoff();

    // WHEN: Polling three delays
    let delays: Vec<u128> = (0..3)
        .filter_map(|_| backoff.next_backoff())
        .map(|d| d.as_millis())
        .collect();

    // THEN: Always 5 seconds
    assert_eq!(delays, vec![5_000, 5_000, 5_000]);
}
