use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::view::{DEFAULT_TABLE, ViewOptions};

pub const DEFAULT_CONFIG_PATH: &str = "taskdeck.toml";
pub const DEFAULT_API_KEY_ENV: &str = "TASKDECK_API_KEY";
pub const DEFAULT_SESSION_FILE: &str = ".taskdeck/session.toml";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub api_key_env: Option<String>,
    pub table: Option<String>,
    pub session_file: Option<String>,
    pub search_debounce_ms: Option<u64>,
    pub toast_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub url: String,
    pub api_key_env: String,
    pub table: String,
    pub session_file: String,
    pub search_debounce_ms: u64,
    pub toast_ms: u64,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = Path::new(cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));
        let file_config = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            parse_config(&content)?
        } else if cli.config.is_some() {
            return Err(Error::ConfigNotFound(config_path.to_path_buf()));
        } else {
            ConfigFile::default()
        };

        merge(file_config, cli)
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            table: self.table.clone(),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            toast_duration: Duration::from_millis(self.toast_ms),
        }
    }

    /// Read the project's public API key from the configured env var.
    pub fn api_key(&self) -> Result<String> {
        resolve_api_key(&self.api_key_env)
    }
}

pub fn resolve_api_key(api_key_env: &str) -> Result<String> {
    match std::env::var(api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(Error::ConfigValidation(format!(
            "API key not found in ${api_key_env}"
        ))),
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(ref url) = config.url {
        validate_url(url)?;
    }
    if let Some(ref table) = config.table
        && table.trim().is_empty()
    {
        return Err(Error::ConfigValidation("table must not be empty".to_string()));
    }
    if config.search_debounce_ms == Some(0) {
        return Err(Error::ConfigValidation(
            "search_debounce_ms must be > 0".to_string(),
        ));
    }
    if config.toast_ms == Some(0) {
        return Err(Error::ConfigValidation("toast_ms must be > 0".to_string()));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<()> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(Error::ConfigValidation(format!(
            "url must start with http:// or https://: {url}"
        )))
    }
}

/// Apply CLI overrides on top of the file, validate the result, and fill
/// defaults. Overrides go through the same checks as file values.
pub fn merge(file: ConfigFile, cli: &Cli) -> Result<Config> {
    let merged = ConfigFile {
        url: cli.url.clone().or(file.url),
        table: cli.table.clone().or(file.table),
        session_file: cli.session_file.clone().or(file.session_file),
        search_debounce_ms: cli.search_debounce_ms.or(file.search_debounce_ms),
        ..file
    };
    validate(&merged)?;

    let url = merged.url.ok_or_else(|| {
        Error::ConfigValidation(
            "url is required (set it in the config file or pass --url)".to_string(),
        )
    })?;

    Ok(Config {
        url,
        api_key_env: merged
            .api_key_env
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
        table: merged.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        session_file: merged
            .session_file
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_string()),
        search_debounce_ms: merged.search_debounce_ms.unwrap_or(500),
        toast_ms: merged.toast_ms.unwrap_or(3000),
    })
}
