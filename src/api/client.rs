//! Authenticated HTTP client for the Resideo API
//!
//! Wraps reqwest::Client with proactive token refresh, bearer and
//! `apikey` injection, and uniform response handling.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use url::Url;

use crate::auth::{oauth, Credentials, Endpoints, TokenRecord, TokenStore};
use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Field wrapping a 2xx body that is not JSON
pub const RAW_RESPONSE_FIELD: &str = "response_text";

/// One account session: credentials, the current token record, and the
/// HTTP client every call goes through.
pub struct ResideoClient {
    http: reqwest::Client,
    credentials: Credentials,
    endpoints: Endpoints,
    /// Held across check-then-refresh so concurrent callers refresh once.
    tokens: Mutex<TokenRecord>,
}

impl ResideoClient {
    /// Build a client with an explicit request timeout.
    pub fn new(credentials: Credentials, endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, credentials, endpoints))
    }

    /// Use a preconfigured reqwest client.
    pub fn with_client(
        http: reqwest::Client,
        credentials: Credentials,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            http,
            credentials,
            endpoints,
            tokens: Mutex::new(TokenRecord::default()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Consent URL for the first step of the authorization flow.
    pub fn authorization_url(&self) -> Result<Url> {
        oauth::authorization_url(&self.credentials, &self.endpoints)
    }

    /// Exchange an authorization code and replace the token record with
    /// the result.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenRecord> {
        let grant =
            oauth::exchange_code(&self.http, &self.credentials, &self.endpoints, code).await?;
        let record = TokenRecord::from_grant(grant, Utc::now());
        *self.tokens.lock().await = record.clone();
        tracing::info!("Authorization code exchanged for tokens");
        Ok(record)
    }

    /// Snapshot of the current token record.
    pub async fn tokens(&self) -> TokenRecord {
        self.tokens.lock().await.clone()
    }

    pub async fn set_tokens(&self, record: TokenRecord) {
        *self.tokens.lock().await = record;
    }

    pub async fn clear_tokens(&self) {
        *self.tokens.lock().await = TokenRecord::default();
    }

    pub async fn is_valid(&self) -> bool {
        self.tokens.lock().await.is_valid()
    }

    /// Make sure a usable access token is held, refreshing it if it is
    /// within five minutes of expiry.
    pub async fn ensure_valid(&self) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        self.ensure_valid_locked(&mut tokens).await
    }

    async fn ensure_valid_locked(&self, tokens: &mut TokenRecord) -> Result<()> {
        if !tokens.has_access_token() {
            return Err(Error::NoToken);
        }
        if tokens.is_valid() {
            return Ok(());
        }
        tracing::info!("Access token expired or expiring, refreshing...");
        self.refresh_locked(tokens).await
    }

    /// Refresh the access token unconditionally.
    pub async fn refresh(&self) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        self.refresh_locked(&mut tokens).await
    }

    async fn refresh_locked(&self, tokens: &mut TokenRecord) -> Result<()> {
        let refresh_token = tokens.refresh_token.clone().ok_or(Error::RefreshUnavailable)?;
        let grant = oauth::refresh_token(
            &self.http,
            &self.credentials,
            &self.endpoints,
            &refresh_token,
        )
        .await?;
        tokens.apply_refresh(grant, Utc::now());
        tracing::info!("Token refreshed");
        Ok(())
    }

    /// Write the token record to `store`. Failures are logged, not raised.
    pub async fn persist(&self, store: &dyn TokenStore) -> bool {
        let persisted = self
            .tokens
            .lock()
            .await
            .to_persisted(&self.credentials.client_id);
        match store.save(&persisted) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save tokens: {}", e);
                false
            }
        }
    }

    /// Load the token record from `store`. On failure the in-memory
    /// record is left as it was.
    pub async fn restore(&self, store: &dyn TokenStore) -> bool {
        let loaded = store.load().and_then(|persisted| {
            let record = TokenRecord::from_persisted(&persisted)?;
            Ok::<_, Error>((record, persisted))
        });
        match loaded {
            Ok((record, persisted)) => {
                if let Some(ref cid) = persisted.client_id {
                    if *cid != self.credentials.client_id {
                        tracing::warn!(
                            "Stored tokens were issued to client {}, not {}",
                            cid,
                            self.credentials.client_id
                        );
                    }
                }
                *self.tokens.lock().await = record;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load tokens: {}", e);
                false
            }
        }
    }

    /// Perform one authenticated API call.
    ///
    /// `path` is relative to the API base and may carry its own query
    /// string; `apikey` is appended after it.
    pub async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let access_token = {
            let mut tokens = self.tokens.lock().await;
            self.ensure_valid_locked(&mut tokens).await?;
            tokens.access_token.clone().ok_or(Error::NoToken)?
        };

        let supported = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
        if !supported.contains(&method) {
            return Err(Error::UnsupportedMethod(method.to_string()));
        }

        let url = self.api_url(path);
        tracing::debug!("API {} {}", method, redact_apikey(&url));

        let req = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&access_token);
        let req = match body {
            Some(body) if method == Method::POST || method == Method::PUT => req.json(body),
            _ => req.header(CONTENT_TYPE, "application/json"),
        };

        let resp = req.send().await?;
        normalize_response(resp).await
    }

    /// API base + path, with the client ID appended as `apikey`. The API
    /// rejects the key as a header.
    fn api_url(&self, path: &str) -> String {
        let separator = if path.contains('?') { '&' } else { '?' };
        format!(
            "{}{}{}apikey={}",
            self.endpoints.api_base, path, separator, self.credentials.client_id
        )
    }
}

fn redact_apikey(url: &str) -> &str {
    url.rsplit_once("apikey=").map_or(url, |(head, _)| head)
}

/// Map a response to a JSON payload or a classified error.
async fn normalize_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let text = resp.text().await?;

    if status.is_success() {
        if text.is_empty() {
            return Ok(json!({}));
        }
        let value = serde_json::from_str::<Value>(&text)
            .unwrap_or_else(|_| json!({ RAW_RESPONSE_FIELD: text }));
        return Ok(value);
    }

    let message = match serde_json::from_str::<Value>(&text) {
        Ok(err_body) => format!("API error: {}", err_body),
        Err(_) => format!("HTTP {}: {}", status.as_u16(), text),
    };
    Err(Error::Http {
        status: status.as_u16(),
        message,
    })
}
