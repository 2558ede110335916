//! Token storage and management

use chrono::{DateTime, Duration, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::oauth::TokenGrant;
use crate::error::{Error, Result};

/// Refresh this long before the server-side expiry.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Longest lifetime we accept from `expires_in` (ten years).
const MAX_EXPIRES_IN_SECS: u64 = 10 * 365 * 24 * 3600;

/// Access token, refresh token and absolute expiry held by a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenRecord {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Fresh record from an authorization-code exchange.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: Some(expiry_from(now, grant.expires_in)),
            access_token: Some(grant.access_token),
            refresh_token: grant.refresh_token,
        }
    }

    /// Apply a refresh response. The refresh token is only replaced when
    /// the server rotated it.
    pub fn apply_refresh(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.expires_at = Some(expiry_from(now, grant.expires_in));
        self.access_token = Some(grant.access_token);
        if let Some(rt) = grant.refresh_token {
            self.refresh_token = Some(rt);
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Valid only with an access token and a known expiry more than
    /// five minutes away. An unknown expiry counts as expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.access_token, self.expires_at) {
            (Some(_), Some(exp)) => now < exp - Duration::seconds(EXPIRY_MARGIN_SECS),
            _ => false,
        }
    }

    pub fn to_persisted(&self, client_id: &str) -> PersistedTokens {
        PersistedTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires: self.expires_at.map(format_timestamp),
            client_id: Some(client_id.to_string()),
        }
    }

    pub fn from_persisted(persisted: &PersistedTokens) -> Result<Self> {
        let expires_at = persisted
            .expires
            .as_deref()
            .map(parse_timestamp)
            .transpose()?;

        Ok(Self {
            access_token: persisted.access_token.clone(),
            refresh_token: persisted.refresh_token.clone(),
            expires_at,
        })
    }
}

fn expiry_from(now: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
    // Bounded above, so the cast cannot wrap
    now + Duration::seconds(expires_in.min(MAX_EXPIRES_IN_SECS) as i64)
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as local time.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let naive: NaiveDateTime = raw
        .parse()
        .map_err(|e| Error::TokenStore(format!("Invalid expiry timestamp {:?}: {}", raw, e)))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
        .ok_or_else(|| Error::TokenStore(format!("Nonexistent local time {:?}", raw)))
}

/// On-disk shape of a token record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute expiry as an ISO-8601 timestamp
    pub expires: Option<String>,
    /// Client the tokens were issued to
    pub client_id: Option<String>,
}

/// Durable storage for a persisted token record
pub trait TokenStore {
    fn load(&self) -> Result<PersistedTokens>;
    fn save(&self, tokens: &PersistedTokens) -> Result<()>;
}

/// JSON token file, readable only by the owner on Unix
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the token file. A missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(store_err("Failed to remove token file", &self.path, e)),
        }
    }
}

fn store_err(what: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::TokenStore(format!("{} {}: {}", what, path.display(), e))
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<PersistedTokens> {
        let content = fs::read_to_string(&self.path)
            .map_err(|e| store_err("Failed to read token file", &self.path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| store_err("Failed to parse token file", &self.path, e))
    }

    fn save(&self, tokens: &PersistedTokens) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| store_err("Failed to create token directory", dir, e))?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| store_err("Failed to serialize tokens for", &self.path, e))?;
        fs::write(&self.path, content)
            .map_err(|e| store_err("Failed to write token file", &self.path, e))?;

        // Tokens grant full account access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .map_err(|e| store_err("Failed to set permissions on", &self.path, e))?;
        }

        Ok(())
    }
}

/// In-process store, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<PersistedTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: PersistedTokens) -> Self {
        Self {
            slot: Mutex::new(Some(tokens)),
        }
    }

    pub fn snapshot(&self) -> Option<PersistedTokens> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<PersistedTokens> {
        self.slot
            .lock()
            .map_err(|_| Error::TokenStore("memory store lock poisoned".into()))?
            .clone()
            .ok_or_else(|| Error::TokenStore("no tokens stored".into()))
    }

    fn save(&self, tokens: &PersistedTokens) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| Error::TokenStore("memory store lock poisoned".into()))?;
        *slot = Some(tokens.clone());
        Ok(())
    }
}
