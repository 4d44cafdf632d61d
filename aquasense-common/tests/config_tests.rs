//! Configuration resolution and loading tests
//!
//! Uses serial_test to prevent environment variable races: tests that touch
//! AQUASENSE_TEST_CONFIG or RUST_LOG are marked #[serial].

use aquasense_common::config::{
    filter_directive, load_toml_config, resolve_config_path, LoggingConfig,
};
use aquasense_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

const ENV_VAR: &str = "AQUASENSE_TEST_CONFIG";

#[derive(Debug, Deserialize, Default, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    logging: Option<SampleLogging>,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
struct SampleLogging {
    level: String,
}

#[test]
#[serial]
fn test_cli_argument_overrides_environment() {
    env::set_var(ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")), ENV_VAR, "x.toml");
    assert_eq!(resolved, Some(PathBuf::from("/from/cli.toml")));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_environment_used_without_cli_argument() {
    env::set_var(ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(None, ENV_VAR, "x.toml");
    assert_eq!(resolved, Some(PathBuf::from("/from/env.toml")));

    env::remove_var(ENV_VAR);
}

#[test]
#[serial]
fn test_blank_environment_is_ignored() {
    env::set_var(ENV_VAR, "   ");

    let resolved = resolve_config_path(None, ENV_VAR, "definitely-not-present-aquasense.toml");
    assert_eq!(resolved, None);

    env::remove_var(ENV_VAR);
}

#[test]
fn test_missing_path_uses_defaults() {
    let config: SampleConfig = load_toml_config(None).unwrap();
    assert_eq!(config, SampleConfig::default());
}

#[test]
fn test_load_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aquasense.toml");
    std::fs::write(&path, "port = 9100\n\n[logging]\nlevel = \"debug\"\n").unwrap();

    let config: SampleConfig = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.port, Some(9100));
    assert_eq!(config.logging.unwrap().level, "debug");
}

#[test]
fn test_named_file_missing_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let result: Result<SampleConfig, Error> = load_toml_config(Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = [unclosed").unwrap();

    let result: Result<SampleConfig, Error> = load_toml_config(Some(&path));
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("Parse config")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_filter_directive_from_logging_level() {
    env::remove_var("RUST_LOG");
    let logging = LoggingConfig {
        level: "debug".to_string(),
    };

    let directive = filter_directive(&logging, "aquasense_ai");
    assert!(directive.starts_with("aquasense_ai=debug"));
    assert!(directive.contains("tower_http=info"));
}

#[test]
#[serial]
fn test_rust_log_overrides_logging_level() {
    env::set_var("RUST_LOG", "warn");

    let directive = filter_directive(&LoggingConfig::default(), "aquasense_ai");
    assert_eq!(directive, "warn");

    env::remove_var("RUST_LOG");
}

#[test]
fn test_logging_default_level() {
    assert_eq!(LoggingConfig::default().level, "info");
}
