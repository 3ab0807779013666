//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MBOXSCOPE_CONFIG` (environment variable)
//! 2. `~/.config/mboxscope/config.toml` (Linux/macOS)
//!    `%APPDATA%\mboxscope\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! The loaded [`Config`] is constructed once at process start and passed by
//! reference into the import pipeline and the report generator. There is no
//! ambient global configuration state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Import pipeline settings.
    pub import: ImportConfig,
    /// Report generation settings.
    pub report: ReportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for log files.
    pub cache_dir: Option<PathBuf>,
}

/// Import pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Number of messages per storage transaction.
    pub batch_size: u64,
    /// Replace real identities with surrogate identities during import.
    pub pseudonymize: bool,
    /// Domains whose local parts ignore `.` characters (e.g. `gmail.com`,
    /// where `a.lice@gmail.com` and `alice@gmail.com` are the same mailbox).
    pub dot_insensitive_providers: Vec<String>,
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// The archive owner's own address, excluded from top-sender and
    /// top-recipient charts.
    pub owner_address: String,
    /// How many senders/recipients the "top" charts show.
    pub top_limit: usize,
    /// Also render the cumulative chat-vs-mail usage chart.
    pub cumulative: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: 5000,
            pseudonymize: false,
            dot_insensitive_providers: vec!["gmail.com".to_string()],
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            owner_address: String::new(),
            top_limit: 10,
            cumulative: true,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location.
pub fn save_config(config: &Config) -> anyhow::Result<()> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(())
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    // 1. Environment variable override
    if let Ok(env_path) = std::env::var("MBOXSCOPE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    // 2. Standard config directory
    dirs::config_dir().map(|d| d.join("mboxscope").join("config.toml"))
}

/// Return the cache directory for log files.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mboxscope")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mboxscope.log")
}
