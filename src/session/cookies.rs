//! Refresh cookie persistence
//!
//! The backend authenticates `/auth/refresh` with an HTTP-only cookie set at
//! login. A browser keeps that cookie across reloads; this jar does the same
//! across CLI invocations by keeping it in session storage. Cookies are
//! scoped to the single configured backend, so domain and path attributes
//! are ignored.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderValue;
use url::Url;

use super::storage::{keys, SessionStorage};

pub struct SessionCookieJar {
    storage: Arc<dyn SessionStorage>,
}

impl SessionCookieJar {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    fn load(&self) -> BTreeMap<String, String> {
        self.storage
            .get(keys::COOKIES)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    fn save(&self, jar: &BTreeMap<String, String>) {
        if jar.is_empty() {
            self.storage.remove(keys::COOKIES);
            return;
        }
        match serde_json::to_string(jar) {
            Ok(raw) => self.storage.set(keys::COOKIES, &raw),
            Err(e) => tracing::warn!("Failed to serialize cookies: {}", e),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.load().is_empty()
    }

    pub fn clear(&self) {
        self.storage.remove(keys::COOKIES);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CookieUpdate {
    Set { name: String, value: String },
    Remove { name: String },
}

/// Interpret one `Set-Cookie` header value.
fn parse_set_cookie(raw: &str, now: DateTime<Utc>) -> Option<CookieUpdate> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim().to_string();
    let value = value.trim().trim_matches('"').to_string();
    if name.is_empty() {
        return None;
    }

    let expired = parts.any(|attr| {
        let Some((key, val)) = attr.split_once('=') else {
            return false;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "max-age" => val.trim().parse::<i64>().map_or(false, |secs| secs <= 0),
            "expires" => DateTime::parse_from_rfc2822(val.trim())
                .map_or(false, |at| at.with_timezone(&Utc) <= now),
            _ => false,
        }
    });

    if expired || value.is_empty() {
        Some(CookieUpdate::Remove { name })
    } else {
        Some(CookieUpdate::Set { name, value })
    }
}

impl reqwest::cookie::CookieStore for SessionCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        let now = Utc::now();
        let mut jar = self.load();
        let mut changed = false;

        for header in cookie_headers {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            match parse_set_cookie(raw, now) {
                Some(CookieUpdate::Set { name, value }) => {
                    tracing::debug!("Storing cookie {}", name);
                    jar.insert(name, value);
                    changed = true;
                }
                Some(CookieUpdate::Remove { name }) => {
                    changed |= jar.remove(&name).is_some();
                }
                None => {}
            }
        }

        if changed {
            self.save(&jar);
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        let jar = self.load();
        if jar.is_empty() {
            return None;
        }
        let header = jar
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&header).ok()
    }
}
