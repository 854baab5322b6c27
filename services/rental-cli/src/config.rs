//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Passwords never live in the TOML; they come from the BOOKRENTAL_PASSWORD
//! env var or an interactive prompt at the moment they are needed.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Backend connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Where the signed-in session is kept between runs
#[derive(Debug, Default, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    rental_auth::DEFAULT_BASE_URL.to_owned()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Overrides:
    /// - BOOKRENTAL_API_URL replaces api.base_url
    /// - BOOKRENTAL_SESSION_FILE replaces session.file
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like [`Config::load`], but a missing file yields the built-in defaults.
    /// Only the default config path gets this treatment; a path the user asked
    /// for explicitly must exist.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Config::default().finish()
        }
    }

    fn finish(mut self) -> common::Result<Self> {
        if let Ok(url) = std::env::var("BOOKRENTAL_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(file) = std::env::var("BOOKRENTAL_SESSION_FILE") {
            self.session.file = Some(PathBuf::from(file));
        }

        // Validate base_url is a valid URL with http(s) scheme
        if !self.api.base_url.starts_with("http://")
            && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        // Validate timeout_secs is non-zero
        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(self)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("bookrental.toml")
    }
}

impl SessionConfig {
    /// Resolved location of the session document. Falls back to
    /// $HOME/.config/bookrental/session.json when nothing is configured.
    pub fn resolved_file(&self) -> PathBuf {
        if let Some(file) = &self.file {
            return file.clone();
        }
        match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home)
                .join(".config")
                .join("bookrental")
                .join(rental_auth::DEFAULT_SESSION_FILE),
            None => PathBuf::from(rental_auth::DEFAULT_SESSION_FILE),
        }
    }
}
