//! Configuration management for stylecrate.
//!
//! Loads configuration from ${STYLECRATE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default config template with comments, embedded at compile time.
const DEFAULT_CONFIG_TEMPLATE: &str = include_str!("default_config.toml");

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "STYLECRATE_API_URL";

pub mod paths {
    //! Path resolution for stylecrate configuration and data files.
    //!
    //! STYLECRATE_HOME resolution order:
    //! 1. STYLECRATE_HOME environment variable (if set)
    //! 2. ~/.config/stylecrate (default)

    use std::path::PathBuf;

    /// Returns the stylecrate home directory.
    ///
    /// Checks STYLECRATE_HOME env var first, falls back to ~/.config/stylecrate.
    /// Falls back to a relative `.stylecrate` directory when no home exists.
    pub fn stylecrate_home() -> PathBuf {
        if let Ok(home) = std::env::var("STYLECRATE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".stylecrate"),
            |h| h.join(".config").join("stylecrate"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        stylecrate_home().join("config.toml")
    }

    /// Durable client storage (`token`, `user`).
    pub fn storage_path() -> PathBuf {
        stylecrate_home().join("storage.json")
    }

    /// Cookie file holding the `auth` cookie.
    pub fn cookies_path() -> PathBuf {
        stylecrate_home().join("cookies.json")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GraphQL endpoint of the Crate API
    pub api_url: String,

    /// HTTP request timeout in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// Optional log file path
    pub log_file: Option<String>,
}

impl Config {
    const DEFAULT_API_URL: &str = "http://localhost:8000/";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Returns the API endpoint, preferring `STYLECRATE_API_URL` over the file.
    /// Empty values are treated as unset.
    pub fn effective_api_url(&self) -> Result<Url> {
        let from_env = std::env::var(API_URL_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty());
        let raw = from_env.as_deref().unwrap_or(self.api_url.as_str()).trim();
        Url::parse(raw).with_context(|| format!("Invalid API URL: {raw}"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Returns the configured log file, if any. Empty strings are treated as unset.
    pub fn effective_log_file(&self) -> Option<&str> {
        self.log_file.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Saves only the api_url field to a specific config file path.
    ///
    /// Creates the file with default template if it doesn't exist.
    /// Preserves existing fields and comments using toml_edit.
    pub fn save_api_url_to(path: &Path, api_url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        Url::parse(api_url).with_context(|| format!("Invalid API URL: {api_url}"))?;

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            DEFAULT_CONFIG_TEMPLATE.to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["api_url"] = value(api_url);

        Self::write_config(path, &doc.to_string())
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, DEFAULT_CONFIG_TEMPLATE)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            request_timeout_secs: 0,
            log_file: None,
        }
    }
}
