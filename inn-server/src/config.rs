//! Server configuration
//!
//! Command line (with environment fallbacks via clap) merged with the
//! optional `config.toml`. Resolved once at startup.

use clap::Parser;
use std::path::PathBuf;

use inn_common::config::{collect_api_keys, resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV};
use inn_common::{Error, Result};

use crate::grading::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Port used when neither CLI, `PORT` nor TOML set one
pub const DEFAULT_PORT: u16 = 5000;

/// Command-line arguments for inn-server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "inn-server")]
#[command(about = "Contest backend for I'M GOING INN")]
#[command(version)]
pub struct Args {
    /// Root folder holding the database and uploads
    #[arg(short, long)]
    pub root_folder: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Allowed CORS origin (permissive when unset)
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend_url: Option<String>,

    /// Password for the admin console
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Generative model name
    #[arg(long, env = "GEMINI_MODEL")]
    pub gemini_model: Option<String>,

    /// Generative API base URL
    #[arg(long, env = "GEMINI_BASE_URL")]
    pub gemini_base_url: Option<String>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root_folder: PathBuf,
    pub port: u16,
    pub frontend_url: Option<String>,
    pub admin_password: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub api_keys: Vec<String>,
}

impl ServerConfig {
    /// Resolve from the process environment and the platform config file
    pub fn load(args: Args) -> Result<Self> {
        let toml_config = TomlConfig::load();
        let env_root = std::env::var(ROOT_FOLDER_ENV).ok();
        let api_keys = collect_api_keys(&toml_config);
        Self::resolve(args, env_root.as_deref(), &toml_config, api_keys)
    }

    /// Merge already-gathered sources; CLI/env values win over TOML
    pub fn resolve(
        args: Args,
        env_root: Option<&str>,
        toml_config: &TomlConfig,
        api_keys: Vec<String>,
    ) -> Result<Self> {
        let admin_password = args
            .admin_password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::Config("ADMIN_PASSWORD must be set".to_string()))?;

        let root_folder = resolve_root_folder(args.root_folder.as_deref(), env_root, toml_config);

        let frontend_url = args
            .frontend_url
            .or_else(|| toml_config.frontend_url.clone())
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());

        Ok(Self {
            root_folder,
            port: args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            frontend_url,
            admin_password,
            gemini_model: args
                .gemini_model
                .or_else(|| toml_config.gemini_model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: args
                .gemini_base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_keys,
        })
    }
}
