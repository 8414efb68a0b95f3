use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

fn default_caption() -> String {
    "Shared via mediarelay".to_string()
}

/// Where the gateway listens and spools uploads.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding per-request upload spools. Defaults to the OS temp
    /// directory.
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            spool_dir: None,
        }
    }
}

/// Upstream bot API access.
#[derive(Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot token. Prefer MEDIARELAY_TELEGRAM_TOKEN over putting it on disk.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field(
                "token",
                &if self.token.is_empty() {
                    "[empty]"
                } else {
                    "[REDACTED]"
                },
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Request policy: who may call the endpoint and what caption rides along.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Exact `Origin` (and `Referer` prefix) allowed to call the endpoint.
    /// Empty means no browser origin is accepted; clients sending neither
    /// header are always allowed through the gate.
    #[serde(default)]
    pub allowed_origin: String,
    /// Caption attached to every relayed file. Clients cannot override it.
    #[serde(default = "default_caption")]
    pub caption: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allowed_origin: String::new(),
            caption: default_caption(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    pub policy: PolicyConfig,
}

impl Config {
    /// Root directory under which per-request spools are created.
    pub fn spool_root(&self) -> PathBuf {
        self.server
            .spool_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("mediarelay.json")
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let default_path = default_config_path();
    let path = config_path.unwrap_or(default_path.as_path());

    if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?;
        return Ok(config);
    }

    Ok(Config::default())
}

/// Environment overrides, applied after the file: a variable set to a
/// non-empty value wins over the corresponding config field.
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(token) = std::env::var("MEDIARELAY_TELEGRAM_TOKEN") {
        if !token.is_empty() {
            config.telegram.token = token;
        }
    }
    if let Ok(origin) = std::env::var("MEDIARELAY_ALLOWED_ORIGIN") {
        if !origin.is_empty() {
            config.policy.allowed_origin = origin;
        }
    }
    if let Ok(caption) = std::env::var("MEDIARELAY_CAPTION") {
        if !caption.is_empty() {
            config.policy.caption = caption;
        }
    }
}
