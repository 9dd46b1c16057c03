//! Loading AppConfig from files

use memodrops::config::{AppConfig, ConfigError};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_explicit_file_fills_missing_fields_with_defaults() {
    let file = config_file(
        r#"{
            "api_url": "http://localhost:3333",
            "item_delay_ms": 500,
            "drops": { "limit": 10 }
        }"#,
    );

    let config = AppConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.item_delay_ms, 500);
    assert_eq!(config.drops.limit, 10);
    assert!(config.drops.prioritize_by_incidence);
    assert_eq!(config.retry.max_retries, 2);
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.runner_config().delay, Duration::from_millis(500));
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let result = AppConfig::load(Some(missing.as_path()));
    assert!(matches!(result, Err(ConfigError::ValidationError(_))));
}

#[test]
fn test_malformed_json_is_a_parse_error() {
    let file = config_file("{ api_url: ");
    assert!(matches!(
        AppConfig::from_file(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = config_file(r#"{ "poll_interval_ms": 0 }"#);
    assert!(matches!(
        AppConfig::from_file(file.path()),
        Err(ConfigError::ValidationError(_))
    ));
}

#[test]
fn test_saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.test.json");

    let mut config = AppConfig::default();
    config.poll_interval_ms = 1500;
    config.retry.max_retries = 0;
    config.db_path = Some(dir.path().join("history.db"));
    config.save_to_file(&path).unwrap();

    let loaded = AppConfig::from_file(&path).unwrap();
    assert_eq!(loaded.poll_interval(), Duration::from_millis(1500));
    assert_eq!(loaded.retry.max_retries, 0);
    assert_eq!(loaded.history_db_path(), dir.path().join("history.db"));
}

#[test]
fn test_token_can_name_an_environment_variable() {
    std::env::set_var("MEMODROPS_CONFIG_TEST_TOKEN", "secret-from-env");
    let file = config_file(r#"{ "api_token": "MEMODROPS_CONFIG_TEST_TOKEN" }"#);

    let config = AppConfig::from_file(file.path()).unwrap();
    // an explicit MEMODROPS_API_TOKEN in the environment wins over the file
    if std::env::var("MEMODROPS_API_TOKEN").is_err() {
        assert_eq!(config.resolve_api_token().as_deref(), Some("secret-from-env"));
        assert_eq!(config.credential().unwrap().token(), "secret-from-env");
    }
}
