//! Access token storage and inspection

use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::storage::{keys, SessionStorage};

/// Holder of the current bearer token.
///
/// Two tiers: an in-memory cell and a mirror in session storage. Writes
/// update both while the cell's write lock is held, so readers never see
/// them disagree.
pub struct TokenStore {
    cell: RwLock<Option<String>>,
    storage: Arc<dyn SessionStorage>,
}

impl TokenStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            cell: RwLock::new(None),
            storage,
        }
    }

    /// Store `token`, or remove it when `None`. No shape validation.
    pub fn set_token(&self, token: Option<&str>) {
        let mut cell = self.cell.write().unwrap_or_else(|e| e.into_inner());
        match token {
            Some(token) => self.storage.set(keys::ACCESS_TOKEN, token),
            None => self.storage.remove(keys::ACCESS_TOKEN),
        }
        *cell = token.map(str::to_string);
    }

    /// Current token. Falls back to the persisted mirror when the cell is
    /// empty (fresh process, same session).
    pub fn get_token(&self) -> Option<String> {
        {
            let cell = self.cell.read().unwrap_or_else(|e| e.into_inner());
            if cell.is_some() {
                return cell.clone();
            }
        }

        let mut cell = self.cell.write().unwrap_or_else(|e| e.into_inner());
        if cell.is_none() {
            *cell = self.storage.get(keys::ACCESS_TOKEN);
        }
        cell.clone()
    }

    pub fn clear(&self) {
        self.set_token(None);
    }
}

/// Unverified claims read from a JWT payload. Display only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenClaims {
    pub sub: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
}

impl TokenClaims {
    /// Decode the payload segment of a JWT. Returns `None` for anything
    /// that does not look like one.
    pub fn decode(token: &str) -> Option<Self> {
        let payload = token.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(false, |exp| exp <= now)
    }
}
