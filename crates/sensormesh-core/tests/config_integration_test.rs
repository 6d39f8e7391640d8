//! Integration tests for layered configuration
//!
//! Precedence: overrides > environment variables > config file > defaults

use sensormesh_core::config::{ConfigOverrides, ConfigSource, EngineConfig};
use sensormesh_core::models::CalendarGranularity;
use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const ENV_KEYS: [&str; 5] = [
    "SENSORMESH_K",
    "SENSORMESH_QUERY_K",
    "SENSORMESH_VARIABLES",
    "SENSORMESH_GRANULARITY",
    "SENSORMESH_PARALLEL",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

#[test]
fn test_partial_file_configuration() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
k = 3
# Only the neighbour count, everything else stays default
"#
    )
    .unwrap();

    let config = EngineConfig::with_defaults().load_from_file(file.path()).unwrap();

    assert_eq!(config.k.value, 3);
    assert_eq!(config.k.source, ConfigSource::File);
    assert_eq!(config.query_k.value, 5);
    assert_eq!(config.query_k.source, ConfigSource::Default);
    assert_eq!(config.granularity.source, ConfigSource::Default);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    env::set_var("SENSORMESH_K", "7");
    env::set_var("SENSORMESH_VARIABLES", "NO2, O3");
    env::set_var("SENSORMESH_GRANULARITY", "hourly");

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
k = 3
variables = ["Temperature"]
granularity = "daily"
"#
    )
    .unwrap();

    let config = EngineConfig::with_defaults().load_from_file(file.path()).unwrap().load_from_env();

    assert_eq!(config.k.value, 7);
    assert_eq!(config.k.source, ConfigSource::Environment);
    assert_eq!(config.variables.value, vec!["NO2", "O3"]);
    assert_eq!(config.granularity.value, CalendarGranularity::Hourly);
    assert_eq!(config.granularity.source, ConfigSource::Environment);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_environment_values_are_ignored() {
    clear_env();
    env::set_var("SENSORMESH_K", "several");
    env::set_var("SENSORMESH_GRANULARITY", "fortnightly");
    env::set_var("SENSORMESH_PARALLEL", "FALSE");

    let config = EngineConfig::with_defaults().load_from_env();

    assert_eq!(config.k.value, 5);
    assert_eq!(config.k.source, ConfigSource::Default);
    assert_eq!(config.granularity.source, ConfigSource::Default);
    assert!(!config.parallel.value);
    assert_eq!(config.parallel.source, ConfigSource::Environment);

    clear_env();
}

#[test]
#[serial]
fn test_overrides_win() {
    clear_env();
    env::set_var("SENSORMESH_QUERY_K", "4");

    let mut config = EngineConfig::with_defaults().load_from_env();
    assert_eq!(config.query_k.source, ConfigSource::Environment);

    config.apply_overrides(ConfigOverrides { query_k: Some(2), ..Default::default() });

    assert_eq!(config.query_k.value, 2);
    assert_eq!(config.query_k.source, ConfigSource::Override);
    assert!(ConfigSource::Override.precedence() > ConfigSource::Environment.precedence());
    assert!(ConfigSource::Environment.precedence() > ConfigSource::File.precedence());
    assert!(ConfigSource::File.precedence() > ConfigSource::Default.precedence());

    clear_env();
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = EngineConfig::with_defaults().load_from_file(temp_dir.path().join("absent.toml"));
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_full_configuration_workflow() {
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("sensormesh.toml");
    fs::write(
        &config_path,
        r#"
k = 5
query_k = 5
variables = ["NO2.ugm3"]
line_categories = ["primary", "trunk"]
point_categories = ["traffic_signals"]
link_suffix = "_link"
variable_separator = "."
"#,
    )
    .unwrap();

    env::set_var("SENSORMESH_PARALLEL", "false");

    let mut config = EngineConfig::with_defaults().load_from_file(&config_path).unwrap().load_from_env();
    config.apply_overrides(ConfigOverrides { k: Some(3), query_k: Some(3), ..Default::default() });

    assert!(config.validate().is_ok());
    assert_eq!(config.k.value, 3);
    assert_eq!(config.line_categories.value, vec!["primary", "trunk"]);
    assert_eq!(config.variable_separator.source, ConfigSource::File);
    assert!(!config.parallel.value);

    let map = config.to_inspection_map();
    let (variables, source) = &map["variables"];
    assert_eq!(variables, "NO2.ugm3");
    assert_eq!(*source, ConfigSource::File);

    clear_env();
}
