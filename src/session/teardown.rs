//! Centralized clearing of session state

use std::sync::Arc;

use super::cookies::SessionCookieJar;
use super::profile::ProfileCache;
use super::tokens::TokenStore;

/// Clears the token (both tiers), the cached profile and the refresh cookie.
/// Idempotent; every logout path goes through here.
pub struct SessionTeardown {
    tokens: Arc<TokenStore>,
    profile: Arc<ProfileCache>,
    cookies: Arc<SessionCookieJar>,
}

impl SessionTeardown {
    pub fn new(
        tokens: Arc<TokenStore>,
        profile: Arc<ProfileCache>,
        cookies: Arc<SessionCookieJar>,
    ) -> Self {
        Self {
            tokens,
            profile,
            cookies,
        }
    }

    pub fn run(&self) {
        self.tokens.clear();
        self.profile.clear();
        self.cookies.clear();
        tracing::debug!("Session state cleared");
    }
}
