use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use gmloader_engine::LoaderConfig;
use gmloader_engine::config::{DEFAULT_STORE_NAME, DEFAULT_STORE_VERSION, DEFAULT_TABLE_NAME};
use serde::{Deserialize, Serialize};
use url::Url;

const APP_NAME: &str = "gmloader";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the server listens on
    pub listen: SocketAddr,

    /// Directory holding the manifest store (system temp dir if unset)
    pub store_dir: Option<PathBuf>,

    /// Name of the manifest store
    pub store_name: String,

    /// Schema version of the manifest store
    pub store_version: i64,

    /// Table holding bundle records
    pub table_name: String,

    /// Preflight cache lifetime advertised to browsers, in seconds
    pub preflight_max_age_secs: u64,

    /// Origin receiving requests that are not claimed
    pub upstream: Option<String>,

    /// Take over clients as soon as the server starts
    pub take_over_on_install: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8787)),
            store_dir: None,
            store_name: DEFAULT_STORE_NAME.to_string(),
            store_version: DEFAULT_STORE_VERSION,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            preflight_max_age_secs: 86400,
            upstream: None,
            take_over_on_install: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from file, or from the default location
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    /// Get default configuration file path
    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    /// Show current configuration as a formatted string
    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }

    /// Settings for the engine
    pub fn loader_config(&self) -> LoaderConfig {
        let mut config = LoaderConfig {
            store_name: self.store_name.clone(),
            store_version: self.store_version,
            table_name: self.table_name.clone(),
            preflight_max_age: Duration::from_secs(self.preflight_max_age_secs),
            ..Default::default()
        };
        if let Some(dir) = &self.store_dir {
            config.store_dir = dir.clone();
        }
        config
    }

    /// Parsed upstream origin, if one is configured
    pub fn upstream_url(&self) -> Result<Option<Url>> {
        self.upstream
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid upstream URL '{raw}'")))
            .transpose()
    }
}
