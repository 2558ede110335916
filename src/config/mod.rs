//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::client::DEFAULT_TIMEOUT;
use crate::auth::{Credentials, Endpoints, DEFAULT_API_BASE, DEFAULT_AUTH_BASE};

/// Application configuration
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Developer app client ID (consumer key)
    pub client_id: Option<String>,
    /// Developer app client secret
    pub client_secret: Option<String>,
    /// Registered OAuth2 redirect URI
    pub redirect_uri: Option<String>,
    /// Override for the OAuth2 base URL
    pub auth_base: Option<String>,
    /// Override for the device API base URL
    pub api_base: Option<String>,
    /// Per-request timeout
    pub timeout_secs: Option<u64>,
    /// Where tokens are persisted (default: tokens.json next to the config)
    pub token_file: Option<PathBuf>,
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "resideo-cli", "resideo-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Holds the client secret
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Credentials from explicit values, falling back to the config file.
    pub fn credentials(
        &self,
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Result<Credentials> {
        let client_id = client_id.or_else(|| self.client_id.clone()).context(
            "No client ID configured. Pass --client-id, set RESIDEO_CLIENT_ID, \
             or run 'resideo-cli configure'.",
        )?;
        let client_secret = client_secret.or_else(|| self.client_secret.clone()).context(
            "No client secret configured. Pass --client-secret, set RESIDEO_CLIENT_SECRET, \
             or run 'resideo-cli configure'.",
        )?;

        let mut credentials = Credentials::new(client_id, client_secret);
        if let Some(uri) = redirect_uri.or_else(|| self.redirect_uri.clone()) {
            credentials = credentials.with_redirect_uri(uri);
        }
        Ok(credentials)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            self.auth_base.as_deref().unwrap_or(DEFAULT_AUTH_BASE),
            self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
        )
    }

    /// Per-request timeout. Zero would fail every request, so it means
    /// the default.
    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Token file path, defaulting to the config directory.
    pub fn token_file(&self) -> Result<PathBuf> {
        match self.token_file {
            Some(ref path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("tokens.json")),
        }
    }
}
