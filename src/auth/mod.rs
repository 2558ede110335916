//! Authentication module for the Resideo API
//!
//! Implements the OAuth2 authorization-code flow against the Honeywell
//! Home token endpoint, plus refresh-token renewal and token persistence.

pub mod oauth;
pub mod tokens;

use std::fmt;

pub use oauth::{authorization_url, TokenGrant};
pub use tokens::{FileTokenStore, MemoryTokenStore, PersistedTokens, TokenRecord, TokenStore};

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8080/callback";
pub const DEFAULT_AUTH_BASE: &str = "https://api.honeywell.com/oauth2";
pub const DEFAULT_API_BASE: &str = "https://api.honeywell.com/v2";

/// Developer-app credentials, fixed for the lifetime of a session
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth2 client ID (also sent as the `apikey` query parameter)
    pub client_id: String,
    /// OAuth2 client secret (confidential client)
    pub client_secret: String,
    /// Redirect URI registered with the developer app
    pub redirect_uri: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Base URLs for the OAuth2 and device APIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Hosts `/authorize` and `/token`
    pub auth_base: String,
    /// Hosts `/locations` and `/devices/...`
    pub api_base: String,
}

impl Endpoints {
    pub fn new(auth_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            auth_base: auth_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Both APIs under one root, e.g. a local mock server.
    pub fn from_root(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self::new(format!("{}/oauth2", root), format!("{}/v2", root))
    }

    pub fn token_url(&self) -> String {
        format!("{}/token", self.auth_base)
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.auth_base)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }
}
