//! Unit tests for configuration resolution
//!
//! Covers root folder priority (CLI > ENV > TOML > default), TOML parsing and
//! generative API key collection order.
//!
//! Tests that manipulate process environment variables are marked #[serial].

use inn_common::config::{
    collect_api_keys, collect_api_keys_with, database_path, default_root_folder,
    ensure_root_folder, resolve_root_folder, TomlConfig,
};
use serial_test::serial;
use std::collections::HashMap;
use std::path::PathBuf;

fn toml_with_root(root: &str) -> TomlConfig {
    TomlConfig {
        root_folder: Some(root.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_cli_argument_wins() {
    let toml = toml_with_root("/from/toml");
    let resolved = resolve_root_folder(Some("/from/cli"), Some("/from/env"), &toml);
    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
fn test_env_beats_toml() {
    let toml = toml_with_root("/from/toml");
    let resolved = resolve_root_folder(None, Some("/from/env"), &toml);
    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
fn test_blank_env_is_ignored() {
    let toml = toml_with_root("/from/toml");
    let resolved = resolve_root_folder(None, Some("   "), &toml);
    assert_eq!(resolved, PathBuf::from("/from/toml"));
}

#[test]
fn test_default_when_nothing_configured() {
    let resolved = resolve_root_folder(None, None, &TomlConfig::default());
    assert_eq!(resolved, default_root_folder());
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_toml_parsing() {
    let toml = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/inn"
        port = 8080
        frontend_url = "http://localhost:3000"
        gemini_api_keys = ["k1", "k2"]
        "#,
    )
    .unwrap();

    assert_eq!(toml.root_folder.as_deref(), Some("/srv/inn"));
    assert_eq!(toml.port, Some(8080));
    assert_eq!(toml.frontend_url.as_deref(), Some("http://localhost:3000"));
    assert_eq!(toml.gemini_model, None);
    assert_eq!(toml.gemini_api_keys, vec!["k1", "k2"]);
}

#[test]
fn test_empty_toml_is_default() {
    assert_eq!(TomlConfig::from_toml_str("").unwrap(), TomlConfig::default());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_api_key_order_and_dedup() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("GEMINI_API_KEYS", "alpha, beta,,"),
        ("GEMINI_API_KEY", "gamma"),
        ("GEMINI_API_KEY_2", "beta"),
        ("GEMINI_API_KEY_3", "delta"),
    ]);
    let toml = TomlConfig {
        gemini_api_keys: vec!["epsilon".into(), "alpha".into()],
        ..Default::default()
    };

    let keys = collect_api_keys_with(|name| env.get(name).map(|v| v.to_string()), &toml);

    assert_eq!(keys, vec!["alpha", "beta", "gamma", "delta", "epsilon"]);
}

#[test]
fn test_no_keys_configured() {
    let keys = collect_api_keys_with(|_| None, &TomlConfig::default());
    assert!(keys.is_empty());
}

#[test]
#[serial]
fn test_collect_api_keys_reads_process_env() {
    std::env::set_var("GEMINI_API_KEY", "from-process-env");
    let keys = collect_api_keys(&TomlConfig::default());
    std::env::remove_var("GEMINI_API_KEY");

    assert!(keys.contains(&"from-process-env".to_string()));
}

#[test]
fn test_ensure_root_folder_creates_uploads_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = dir.path().join("nested").join("inn");

    ensure_root_folder(&root).unwrap();

    assert!(root.join("uploads").is_dir());
    assert_eq!(database_path(&root), root.join("inn.db"));
}
