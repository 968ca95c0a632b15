//! Config file loading.

use mullctrl::{ConfigError, ControlConfig, MullControl};
use std::fs;
use tempfile::TempDir;

#[test]
fn toml_file_is_loaded_and_validated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "binary = \"/opt/mullvad/bin/mullvad\"\nsettle_delay_ms = 250\n\n[probe]\nurl = \"http://127.0.0.1:8080/json\"\n",
    )
    .unwrap();

    let config = ControlConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.binary, "/opt/mullvad/bin/mullvad");
    assert_eq!(config.settle_delay_ms, 250);
    assert_eq!(config.probe.url, "http://127.0.0.1:8080/json");
    assert_eq!(config.probe.timeout_secs, 10);

    assert!(MullControl::from_config(&config).is_ok());
}

#[test]
fn json_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"probe": {"connect_timeout_secs": 3}}"#).unwrap();

    let config = ControlConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.probe.connect_timeout_secs, 3);
    assert_eq!(config.binary, "mullvad");
}

#[test]
fn invalid_values_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[probe]\ntimeout_secs = 0\n").unwrap();

    assert!(matches!(
        ControlConfig::load(Some(path.as_path())),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn unknown_extension_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "binary: mullvad\n").unwrap();

    assert!(matches!(
        ControlConfig::load(Some(path.as_path())),
        Err(ConfigError::UnsupportedFormat)
    ));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        ControlConfig::load(Some(path.as_path())),
        Err(ConfigError::Io(_))
    ));
}
