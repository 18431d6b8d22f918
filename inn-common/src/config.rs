//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "INN_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "inn.db";

/// Contents of the optional `config.toml`
///
/// Every field is optional; a missing file is equivalent to `TomlConfig::default()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<String>,
    pub port: Option<u16>,
    pub frontend_url: Option<String>,
    pub gemini_model: Option<String>,
    #[serde(default)]
    pub gemini_api_keys: Vec<String>,
}

impl TomlConfig {
    /// Parse TOML text into a config
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load the platform config file, falling back to defaults when absent or invalid
    ///
    /// A missing or malformed file never aborts startup.
    pub fn load() -> Self {
        let path = match config_file_path() {
            Ok(path) => path,
            Err(_) => {
                info!("No config.toml found, using environment and defaults");
                return Self::default();
            }
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_value: Option<&str>,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Some(path) = env_value.filter(|p| !p.trim().is_empty()) {
        return PathBuf::from(path);
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// Create the root folder (and the uploads directory) if missing
pub fn ensure_root_folder(root_folder: &Path) -> Result<()> {
    std::fs::create_dir_all(root_folder.join("uploads"))?;
    Ok(())
}

/// Path of the SQLite database inside `root_folder`
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Get the configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // ~/.config/inn/config.toml first, then /etc/inn/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("inn").join("config.toml"));
        let system_config = PathBuf::from("/etc/inn/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("inn").join("config.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", path)))
    }
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("inn"))
        .unwrap_or_else(|| PathBuf::from("./inn_data"))
}

/// Collect generative API keys from the process environment and TOML
///
/// See [`collect_api_keys_with`].
pub fn collect_api_keys(toml_config: &TomlConfig) -> Vec<String> {
    collect_api_keys_with(|name| std::env::var(name).ok(), toml_config)
}

/// Collect generative API keys in fallback order
///
/// Order: `GEMINI_API_KEYS` (comma separated), `GEMINI_API_KEY`,
/// `GEMINI_API_KEY_2` .. `GEMINI_API_KEY_9`, then TOML `gemini_api_keys`.
/// Blank entries are skipped and duplicates keep their first position.
pub fn collect_api_keys_with<F>(lookup: F, toml_config: &TomlConfig) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: &str| {
        let key = key.trim();
        if !key.is_empty() && !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    };

    if let Some(list) = lookup("GEMINI_API_KEYS") {
        list.split(',').for_each(&mut push);
    }
    if let Some(key) = lookup("GEMINI_API_KEY") {
        push(&key);
    }
    for n in 2..=9 {
        if let Some(key) = lookup(&format!("GEMINI_API_KEY_{}", n)) {
            push(&key);
        }
    }
    for key in &toml_config.gemini_api_keys {
        push(key);
    }

    keys
}
