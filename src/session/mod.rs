//! Session lifecycle for the Campus Virtual API
//!
//! [`SessionManager`] owns every piece of session state (token store,
//! cached profile, readiness flag, refresh guard) and is handed to whatever
//! builds the UI root. Nothing here is a global.

pub mod bootstrap;
pub mod client;
pub mod cookies;
pub mod error;
pub mod inactivity;
pub mod navigation;
pub mod profile;
pub mod queue;
pub mod readiness;
pub mod routes;
pub mod storage;
pub mod teardown;
pub mod tokens;

use std::sync::Arc;
use std::time::Duration;

pub use bootstrap::{BootstrapOutcome, SessionBootstrapper};
pub use client::{ApiRequest, SessionClient};
pub use error::SessionError;
pub use inactivity::{ActivityKind, InactivityMonitor, MonitorState};
pub use navigation::{ChannelNavigator, LogNavigator, LogoutReason, Navigator};
pub use profile::{Role, SessionProfile};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};

use cookies::SessionCookieJar;
use navigation::SessionExit;
use profile::ProfileCache;
use readiness::AuthReadiness;
use routes::Routes;
use teardown::SessionTeardown;
use tokens::TokenStore;

/// Everything the session core needs from configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub api_url: String,
    pub public_routes: Vec<String>,
    pub entry_path: String,
    pub inactivity_timeout: Duration,
    pub request_timeout: Duration,
}

pub struct SessionManager {
    tokens: Arc<TokenStore>,
    profile: Arc<ProfileCache>,
    readiness: Arc<AuthReadiness>,
    routes: Arc<Routes>,
    cookies: Arc<SessionCookieJar>,
    exit: Arc<SessionExit>,
    client: Arc<SessionClient>,
    bootstrapper: SessionBootstrapper,
    inactivity_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        settings: &SessionSettings,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Arc<Self>, SessionError> {
        let tokens = Arc::new(TokenStore::new(storage.clone()));
        let profile = Arc::new(ProfileCache::new(storage.clone()));
        let cookies = Arc::new(SessionCookieJar::new(storage.clone()));
        let readiness = Arc::new(AuthReadiness::new());
        let routes = Arc::new(Routes::new(
            settings.public_routes.clone(),
            settings.entry_path.clone(),
        ));
        let teardown = Arc::new(SessionTeardown::new(
            tokens.clone(),
            profile.clone(),
            cookies.clone(),
        ));
        let exit = Arc::new(SessionExit::new(
            teardown,
            storage,
            routes.clone(),
            navigator,
        ));
        let client = Arc::new(SessionClient::new(
            &settings.api_url,
            settings.request_timeout,
            cookies.clone(),
            tokens.clone(),
            profile.clone(),
            routes.clone(),
            exit.clone(),
        )?);
        let bootstrapper = SessionBootstrapper::new(
            client.clone(),
            routes.clone(),
            profile.clone(),
            readiness.clone(),
        );

        Ok(Arc::new(Self {
            tokens,
            profile,
            readiness,
            routes,
            cookies,
            exit,
            client,
            bootstrapper,
            inactivity_timeout: settings.inactivity_timeout,
        }))
    }

    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn profile(&self) -> &ProfileCache {
        &self.profile
    }

    pub fn readiness(&self) -> &AuthReadiness {
        &self.readiness
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    pub fn has_refresh_cookie(&self) -> bool {
        !self.cookies.is_empty()
    }

    /// Navigation hook: bootstrap the session for `path`.
    pub async fn enter_route(&self, path: &str) -> BootstrapOutcome {
        self.bootstrapper.on_route(path).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionProfile, SessionError> {
        let profile = self.client.login(email, password).await?;
        tracing::info!(
            "Logged in as {}",
            profile.email.as_deref().unwrap_or("(unknown)")
        );
        Ok(profile)
    }

    /// Explicit logout. The backend call is best-effort; local state is
    /// cleared regardless.
    pub async fn logout(&self) {
        if let Err(e) = self.client.logout_request().await {
            tracing::warn!("Logout request failed: {}", e);
        }
        self.exit.logout();
    }

    /// Trip action of the inactivity monitor.
    pub async fn logout_for_inactivity(&self) {
        if let Err(e) = self.client.logout_request().await {
            tracing::warn!("Logout request failed: {}", e);
        }
        self.exit.force_logout(LogoutReason::Inactivity);
    }

    /// Arm an inactivity monitor that logs this session out when it trips.
    pub fn mount_inactivity_monitor(self: &Arc<Self>) -> InactivityMonitor {
        let session = Arc::clone(self);
        InactivityMonitor::mount(self.inactivity_timeout, move || async move {
            session.logout_for_inactivity().await;
        })
    }

    /// Why the last session ended, without consuming the marker.
    pub fn logout_reason(&self) -> Option<LogoutReason> {
        self.exit.peek_reason()
    }

    /// Read and clear the logout marker, for one-time display.
    pub fn take_logout_reason(&self) -> Option<LogoutReason> {
        self.exit.take_reason()
    }

    /// Start over as if the page had been reloaded: readiness goes back to
    /// undetermined and the next navigation bootstraps again.
    pub fn reload(&self) {
        self.readiness.reset();
        self.bootstrapper.forget_route();
        self.routes.set_current(self.routes.entry_path());
    }
}


#[cfg(test)]
mod tests {
    use super::storage::keys;
    use super::testing::harness;
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let h = harness().await;
        h.session.tokens().set_token(Some("abc"));
        h.storage.set("rol", "ADMIN");
        Mock::given(method("POST"))
            .and(path(client::LOGOUT_PATH))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&h.server)
            .await;

        h.session.logout().await;

        assert_eq!(h.session.tokens().get_token(), None);
        assert!(!h.session.profile().has_hints());
        assert_eq!(h.session.logout_reason(), None);
        assert_eq!(h.navigator.redirects(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_inactivity_logout_marks_reason() {
        let h = harness().await;
        h.session.tokens().set_token(Some("abc"));
        Mock::given(method("POST"))
            .and(path(client::LOGOUT_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&h.server)
            .await;

        h.session.logout_for_inactivity().await;

        assert_eq!(h.storage.get(keys::ACCESS_TOKEN), None);
        assert_eq!(
            h.storage.get(keys::LOGOUT_REASON).as_deref(),
            Some("INACTIVITY")
        );
        assert_eq!(h.session.take_logout_reason(), Some(LogoutReason::Inactivity));
        assert_eq!(h.session.take_logout_reason(), None);
        assert_eq!(h.navigator.redirects(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_reload_restarts_bootstrap_cycle() {
        let h = harness().await;
        Mock::given(method("POST"))
            .and(path(client::REFRESH_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "abc" })))
            .expect(2)
            .mount(&h.server)
            .await;

        h.session.enter_route("/alumno").await;
        assert!(h.session.readiness().is_ready());

        h.session.reload();
        assert!(!h.session.readiness().is_ready());
        assert_eq!(h.session.routes().current(), "/");

        assert_eq!(
            h.session.enter_route("/alumno").await,
            BootstrapOutcome::Refreshed
        );
        assert!(h.session.readiness().is_ready());
    }

    #[tokio::test]
    async fn test_expired_refresh_cookie_scenario() {
        let h = harness().await;
        h.session.tokens().set_token(Some("stale"));
        Mock::given(method("GET"))
            .and(path("/matriculas"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path(client::REFRESH_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;

        let result = h
            .session
            .client()
            .send(ApiRequest::get("/matriculas"))
            .await;

        assert!(result.is_err());
        assert_eq!(h.storage.get(keys::ACCESS_TOKEN), None);
        assert_eq!(h.session.logout_reason(), Some(LogoutReason::SessionExpired));
        assert_eq!(h.navigator.redirects(), vec!["/"]);
        assert_eq!(h.session.routes().current(), "/");
    }
}
