//! Configuration and on-disk locations

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::inactivity::DEFAULT_INACTIVITY_TIMEOUT;
use crate::session::SessionSettings;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Campus Virtual REST API
    pub api_url: String,
    /// Idle time before a forced logout
    pub inactivity_timeout_secs: u64,
    /// Routes reachable without a session
    pub public_routes: Vec<String>,
    /// Where forced logouts land
    pub entry_path: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT.as_secs(),
            public_routes: vec![
                "/".to_string(),
                "/login".to_string(),
                "/registro".to_string(),
                "/recuperar".to_string(),
            ],
            entry_path: "/".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "campus-virtual", "campus-cli")
            .context("Could not determine config directory")
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Session state file (token mirror, cached profile, refresh cookie)
    pub fn session_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join("session.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn with_api_url(mut self, api_url: Option<String>) -> Result<Self> {
        if let Some(url) = api_url {
            self.api_url = url;
            self.validate()?;
        }
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url)
            .with_context(|| format!("Invalid api_url: {}", self.api_url))?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "api_url must be http or https, got {}",
            url.scheme()
        );
        anyhow::ensure!(
            self.inactivity_timeout_secs > 0,
            "inactivity_timeout_secs must be positive"
        );
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            api_url: self.api_url.clone(),
            public_routes: self.public_routes.clone(),
            entry_path: self.entry_path.clone(),
            inactivity_timeout: Duration::from_secs(self.inactivity_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
