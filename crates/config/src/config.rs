//! Core configuration struct and loading logic.
//!
//! This module provides the main [`Config`] struct which aggregates all
//! configuration options for ghtt.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, Result};
use crate::persistence::{
    default_credentials_path, find_config_file, read_config_file, write_config_file,
};

/// Default GitHub API root.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default number of items requested per page.
pub const DEFAULT_PER_PAGE: u8 = 30;

/// Default description tag and filename of the state gist.
pub const DEFAULT_GIST_NAME: &str = "GHTT-state";

/// Environment variable overriding [`Config::api_base_url`].
pub const ENV_API_URL: &str = "GHTT_API_URL";
/// Environment variable overriding [`GistConfig::environment`].
pub const ENV_ENVIRONMENT: &str = "GHTT_ENVIRONMENT";
/// Environment variable overriding [`Config::per_page`].
pub const ENV_PER_PAGE: &str = "GHTT_PER_PAGE";
/// Environment variable supplying [`Config::github_token`] when the file
/// sets none.
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_per_page() -> u8 {
    DEFAULT_PER_PAGE
}

fn default_gist_name() -> String {
    DEFAULT_GIST_NAME.to_string()
}

fn default_true() -> bool {
    true
}

/// Where the state document is kept.
///
/// # Examples
///
/// ```
/// use ghtt_config::config::GistConfig;
///
/// let gist = GistConfig {
///     environment: Some("staging".to_string()),
///     ..Default::default()
/// };
/// assert_eq!(gist.tag(), "GHTT-state-staging");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistConfig {
    /// Description tag identifying the state gist.
    #[serde(default = "default_gist_name")]
    pub description: String,

    /// Name of the file holding the document.
    #[serde(default = "default_gist_name")]
    pub filename: String,

    /// Deployment environment, appended to the description tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl Default for GistConfig {
    fn default() -> Self {
        Self {
            description: default_gist_name(),
            filename: default_gist_name(),
            environment: None,
        }
    }
}

impl GistConfig {
    /// Returns the effective description tag, including the environment
    /// suffix.
    #[must_use]
    pub fn tag(&self) -> String {
        match self.environment.as_deref().filter(|env| !env.is_empty()) {
            Some(env) => format!("{}-{env}", self.description),
            None => self.description.clone(),
        }
    }
}

/// The main configuration struct for ghtt.
///
/// # Examples
///
/// ```
/// use ghtt_config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.api_base_url, "https://api.github.com");
/// assert_eq!(config.per_page, 30);
/// assert!(config.staleness_check);
///
/// let config = Config {
///     per_page: 100,
///     github_token: Some("ghp_xxx".to_string()),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// GitHub API root; point it at a GitHub Enterprise server if needed.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Page size for list endpoints, between 1 and 100.
    #[serde(default = "default_per_page")]
    pub per_page: u8,

    /// Location of the state document.
    #[serde(default)]
    pub gist: GistConfig,

    /// Whether to re-read the remote document before every write and warn
    /// when another device changed it.
    #[serde(default = "default_true")]
    pub staleness_check: bool,

    /// GitHub token used when none was given on the command line or stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Where the encrypted token is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            per_page: default_per_page(),
            gist: GistConfig::default(),
            staleness_check: true,
            github_token: None,
            credentials_path: None,
        }
    }
}

impl Config {
    /// Creates a default configuration.
    ///
    /// This is equivalent to `Config::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the default file locations, then applies
    /// environment overrides.
    ///
    /// Searches for configuration files in the following order:
    ///
    /// 1. Local: `./ghtt.json5` or `./ghtt.json`
    /// 2. User: `~/.config/ghtt/config.json5` or `~/.config/ghtt/config.json`
    ///
    /// If no configuration file is found, the defaults are used.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is found but cannot be
    /// read or parsed, or if the result is invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ghtt_config::Config;
    ///
    /// # async fn example() -> ghtt_config::Result<()> {
    /// let config = Config::load().await?;
    /// println!("Using {}", config.api_base_url);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load() -> Result<Self> {
        let mut config = match find_config_file() {
            Some(path) => read_config_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a specific file, then applies environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// result is invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config: Config = read_config_file(path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        write_config_file(path, self)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// `GHTT_API_URL`, `GHTT_ENVIRONMENT` and `GHTT_PER_PAGE` replace the
    /// file values. `GITHUB_TOKEN` only fills in a missing `github_token`.
    /// Empty variables are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `GHTT_PER_PAGE` is not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use ghtt_config::Config;
    ///
    /// let mut config = Config::default();
    /// config
    ///     .apply_env_overrides(|name| (name == "GHTT_ENVIRONMENT").then(|| "dev".to_string()))
    ///     .unwrap();
    /// assert_eq!(config.gist.tag(), "GHTT-state-dev");
    /// ```
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(url) = var(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(environment) = var(ENV_ENVIRONMENT) {
            self.gist.environment = Some(environment);
        }
        if let Some(value) = var(ENV_PER_PAGE) {
            self.per_page = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnvVar {
                    name: ENV_PER_PAGE,
                    value,
                })?;
        }
        if self.github_token.is_none() {
            self.github_token = var(ENV_GITHUB_TOKEN);
        }
        Ok(())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is not an absolute http(s) URL or
    /// the page size is outside `1..=100`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ghtt_config::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.per_page = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        let invalid_url = |reason: &str| ConfigError::InvalidApiUrl {
            url: self.api_base_url.clone(),
            reason: reason.to_string(),
        };
        let url = Url::parse(&self.api_base_url).map_err(|e| invalid_url(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid_url("scheme must be http or https"));
        }
        if url.cannot_be_a_base() {
            return Err(invalid_url("URL cannot be a base"));
        }

        if !(1..=100).contains(&self.per_page) {
            return Err(ConfigError::InvalidPerPage {
                value: i64::from(self.per_page),
            });
        }
        Ok(())
    }

    /// Returns the credential file, falling back to the user data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the home directory
    /// cannot be determined.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        match &self.credentials_path {
            Some(path) => Ok(path.clone()),
            None => default_credentials_path(),
        }
    }
}
