//! Authenticated HTTP client for the Campus Virtual API
//!
//! Wraps reqwest::Client with bearer injection and single-flight token
//! refresh. A 401/403 on a business request starts (or joins) a refresh
//! episode; every request that stalled behind the episode is replayed with
//! the token it produced, or fails with the error it produced.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use reqwest::Method;
use serde_json::{json, Value};
use uuid::Uuid;

use super::cookies::SessionCookieJar;
use super::error::SessionError;
use super::navigation::{LogoutReason, SessionExit};
use super::profile::{ProfileCache, SessionProfile};
use super::queue::{RefreshOutcome, RefreshWaitQueue};
use super::routes::{normalize, Routes};
use super::tokens::TokenStore;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Field names the backend has used for the access token, in lookup order.
const TOKEN_FIELDS: [&str; 3] = ["token", "accessToken", "jwt"];

/// One logical request. Replays reuse the same value, so the retry budget
/// travels with the request and never leaks to unrelated ones.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    id: Uuid,
    method: Method,
    path: String,
    body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// What a failed refresh does to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshMode {
    /// A request was rejected; a failed refresh the server answered ends
    /// the session.
    Fatal,
    /// Startup check; failure only means there is no session yet.
    Quiet,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    /// A fatal-mode caller joined the current episode.
    escalate: bool,
    queue: RefreshWaitQueue,
}

/// How an episode ended for the queue.
struct Settled {
    resumed: usize,
    escalate: bool,
}

/// Clears the in-flight flag and settles the queue exactly once, even when
/// the refreshing future is dropped part-way.
struct RefreshEpisode<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl<'a> RefreshEpisode<'a> {
    fn begin(state: &'a Mutex<RefreshState>) -> Self {
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, outcome: &RefreshOutcome) -> Settled {
        self.settled = true;
        finish_episode(self.state, outcome)
    }
}

impl Drop for RefreshEpisode<'_> {
    fn drop(&mut self) {
        if !self.settled {
            finish_episode(self.state, &Err(SessionError::RefreshAbandoned));
        }
    }
}

/// Flags and queue change under one lock: nothing can enqueue onto a queue
/// that has already been drained.
fn finish_episode(state: &Mutex<RefreshState>, outcome: &RefreshOutcome) -> Settled {
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    state.in_flight = false;
    let escalate = std::mem::take(&mut state.escalate);
    let resumed = std::mem::take(&mut state.queue).settle(outcome);
    Settled { resumed, escalate }
}

/// First non-empty token field of a login/refresh response.
pub fn extract_token(body: &Value) -> Option<String> {
    TOKEN_FIELDS.iter().find_map(|field| {
        body.get(*field)
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

fn is_refresh_path(path: &str) -> bool {
    normalize(path) == REFRESH_PATH
}

pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    profile: Arc<ProfileCache>,
    routes: Arc<Routes>,
    exit: Arc<SessionExit>,
    refresh: Mutex<RefreshState>,
}

impl SessionClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cookies: Arc<SessionCookieJar>,
        tokens: Arc<TokenStore>,
        profile: Arc<ProfileCache>,
        routes: Arc<Routes>,
        exit: Arc<SessionExit>,
    ) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .cookie_provider(cookies)
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            profile,
            routes,
            exit,
            refresh: Mutex::new(RefreshState::default()),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn lock_refresh(&self) -> MutexGuard<'_, RefreshState> {
        self.refresh.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Put one request on the wire, with `token` as bearer when present.
    async fn dispatch(
        &self,
        req: &ApiRequest,
        token: Option<&str>,
    ) -> Result<reqwest::Response, SessionError> {
        let url = self.url(&req.path);
        tracing::debug!(request_id = %req.id, retried = req.retried, "{} {}", req.method, url);

        let mut builder = self.http.request(req.method.clone(), &url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = req.body {
            builder = builder.json(body);
        }

        builder
            .send()
            .await
            .map_err(|e| SessionError::transport(&url, e))
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value, SessionError> {
        let url = resp.url().to_string();
        resp.json().await.map_err(|e| SessionError::decode(&url, e))
    }

    /// Send a business request. Non-2xx responses become
    /// [`SessionError::Status`] unless the refresh protocol recovers them.
    pub async fn send(&self, mut req: ApiRequest) -> Result<reqwest::Response, SessionError> {
        let mut token = self.tokens.get_token();
        loop {
            let resp = self.dispatch(&req, token.as_deref()).await?;
            if resp.status().is_success() {
                return Ok(resp);
            }
            let error = SessionError::from_response(resp).await;
            token = Some(self.recover(&mut req, error).await?);
        }
    }

    /// [`SessionClient::send`] and decode the body as JSON. An empty body
    /// decodes to `null`.
    pub async fn send_json(&self, req: ApiRequest) -> Result<Value, SessionError> {
        let resp = self.send(req).await?;
        let url = resp.url().to_string();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SessionError::decode(&url, e))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| SessionError::Decode {
            url,
            message: e.to_string(),
        })
    }

    /// Decide what a failed response means. Returns the token to replay
    /// with, or the error to hand back to the caller.
    async fn recover(&self, req: &mut ApiRequest, error: SessionError) -> RefreshOutcome {
        if is_refresh_path(&req.path) {
            // Never refresh to fix a refresh
            self.exit.force_logout(LogoutReason::SessionExpired);
            return Err(error);
        }
        if self.routes.is_current_public() {
            return Err(error);
        }
        if !error.is_auth_failure() || req.retried {
            return Err(error);
        }

        req.retried = true;
        tracing::debug!(
            request_id = %req.id,
            "Authorization failed for {}, refreshing token",
            req.path
        );
        self.refresh_token().await
    }

    /// Obtain a fresh access token. At most one refresh call is in flight;
    /// callers arriving during an episode wait for its outcome. A refresh
    /// the server rejects ends the session; one that got no response does
    /// not.
    pub async fn refresh_token(&self) -> RefreshOutcome {
        self.refresh(RefreshMode::Fatal).await
    }

    /// Like [`SessionClient::refresh_token`], but a failure leaves the
    /// session alone unless a rejected request joined the episode.
    pub async fn try_refresh(&self) -> RefreshOutcome {
        self.refresh(RefreshMode::Quiet).await
    }

    async fn refresh(&self, mode: RefreshMode) -> RefreshOutcome {
        let waiter = {
            let mut state = self.lock_refresh();
            if state.in_flight {
                state.escalate |= mode == RefreshMode::Fatal;
                Some(state.queue.push())
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(rx) = waiter {
            tracing::debug!("Refresh already in flight, waiting for it");
            return rx.await.unwrap_or(Err(SessionError::RefreshAbandoned));
        }

        let episode = RefreshEpisode::begin(&self.refresh);
        let outcome = self.request_new_token().await;
        let settled = episode.settle(&outcome);

        match &outcome {
            Ok(_) => {
                tracing::info!(
                    "Access token refreshed ({} queued requests resumed)",
                    settled.resumed
                );
            }
            Err(e) if !e.ends_session() => {
                tracing::warn!("Token refresh got no answer, keeping session: {}", e);
            }
            Err(e) if mode == RefreshMode::Fatal || settled.escalate => {
                tracing::warn!("Token refresh failed: {}", e);
                self.exit.force_logout(LogoutReason::SessionExpired);
            }
            Err(e) => {
                tracing::debug!("No session to refresh: {}", e);
            }
        }
        outcome
    }

    async fn request_new_token(&self) -> RefreshOutcome {
        tracing::info!("Refreshing access token...");

        let req = ApiRequest::new(Method::POST, REFRESH_PATH);
        let current = self.tokens.get_token();
        let resp = self.dispatch(&req, current.as_deref()).await?;
        if !resp.status().is_success() {
            return Err(SessionError::from_response(resp).await);
        }

        let body = Self::read_json(resp).await?;
        let token = extract_token(&body).ok_or(SessionError::MissingToken)?;
        self.tokens.set_token(Some(&token));
        self.profile.store(&SessionProfile::from_response(&body));
        Ok(token)
    }

    /// `POST /auth/login`. Failures go straight back to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionProfile, SessionError> {
        let req = ApiRequest::post(LOGIN_PATH, json!({ "email": email, "password": password }));
        let resp = self.dispatch(&req, None).await?;
        if !resp.status().is_success() {
            return Err(SessionError::from_response(resp).await);
        }

        let body = Self::read_json(resp).await?;
        let token = extract_token(&body).ok_or(SessionError::MissingToken)?;
        let profile = SessionProfile::from_response(&body);
        self.tokens.set_token(Some(&token));
        self.profile.store(&profile);
        Ok(profile)
    }

    /// `POST /auth/logout` with the current token. Callers treat this as
    /// best-effort.
    pub async fn logout_request(&self) -> Result<(), SessionError> {
        let req = ApiRequest::new(Method::POST, LOGOUT_PATH);
        let token = self.tokens.get_token();
        let resp = self.dispatch(&req, token.as_deref()).await?;
        if !resp.status().is_success() {
            return Err(SessionError::from_response(resp).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::{keys, SessionStorage};
    use crate::session::testing::{harness, harness_at, Harness};
    use reqwest::StatusCode;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{header, method, path, path_regex};
    use wiremock::{Mock, ResponseTemplate};

    async fn refresh_calls(h: &Harness) -> usize {
        h.server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == REFRESH_PATH)
            .count()
    }

    async fn mount_refresh(h: &Harness, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .respond_with(response)
            .mount(&h.server)
            .await;
    }

    /// `/cursos/*` answers 200 for `Bearer new`, `status` otherwise.
    async fn mount_courses(h: &Harness, status: u16) {
        Mock::given(method("GET"))
            .and(path_regex("^/cursos/"))
            .and(header("Authorization", "Bearer new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .mount(&h.server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/cursos/"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&h.server)
            .await;
    }

    #[test]
    fn test_extract_token_field_order() {
        assert_eq!(
            extract_token(&json!({ "token": "t", "accessToken": "a" })).as_deref(),
            Some("t")
        );
        assert_eq!(
            extract_token(&json!({ "accessToken": "a", "jwt": "j" })).as_deref(),
            Some("a")
        );
        assert_eq!(
            extract_token(&json!({ "token": "", "jwt": "j" })).as_deref(),
            Some("j")
        );
        assert_eq!(extract_token(&json!({ "token": 5 })), None);
        assert_eq!(extract_token(&json!({})), None);
    }

    #[tokio::test]
    async fn test_attaches_bearer_only_with_token() {
        let h = harness().await;
        Mock::given(method("GET"))
            .and(path("/secciones"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&h.server)
            .await;

        let client = h.session.client();
        assert_ok!(client.send(ApiRequest::get("/secciones")).await);
        h.session.tokens().set_token(Some("abc"));
        assert_ok!(client.send(ApiRequest::get("/secciones")).await);

        let requests = h.server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].headers.get("Authorization"), None);
        assert_eq!(
            requests[1]
                .headers
                .get("Authorization")
                .map(|v| v.to_str().unwrap()),
            Some("Bearer abc")
        );
    }

    #[tokio::test]
    async fn test_concurrent_failures_share_one_refresh() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        mount_courses(&h, 403).await;
        mount_refresh(
            &h,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "new" }))
                .set_delay(Duration::from_millis(200)),
        )
        .await;

        let client = h.session.client();
        let (a, b, c) = tokio::join!(
            client.send_json(ApiRequest::get("/cursos/1")),
            client.send_json(ApiRequest::get("/cursos/2")),
            client.send_json(ApiRequest::get("/cursos/3")),
        );

        for result in [a, b, c] {
            assert_eq!(result.unwrap(), json!({ "ok": true }));
        }
        assert_eq!(refresh_calls(&h).await, 1);
        assert_eq!(h.session.tokens().get_token().as_deref(), Some("new"));
        assert!(h.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_rejects_everyone_and_tears_down() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        h.storage.set("nombre", "Ana");
        mount_courses(&h, 401).await;
        mount_refresh(
            &h,
            ResponseTemplate::new(401).set_delay(Duration::from_millis(200)),
        )
        .await;

        let client = h.session.client();
        let (a, b, c) = tokio::join!(
            client.send(ApiRequest::get("/cursos/1")),
            client.send(ApiRequest::get("/cursos/2")),
            client.send(ApiRequest::get("/cursos/3")),
        );

        for result in [a, b, c] {
            let err = result.unwrap_err();
            assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
            assert!(err.to_string().contains(REFRESH_PATH));
        }
        assert_eq!(refresh_calls(&h).await, 1);
        assert_eq!(h.storage.get(keys::ACCESS_TOKEN), None);
        assert_eq!(h.storage.get("nombre"), None);
        assert_eq!(
            h.storage.get(keys::LOGOUT_REASON).as_deref(),
            Some("SESSION_EXPIRED")
        );
        assert_eq!(h.navigator.redirects(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_request_is_retried_at_most_once() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        Mock::given(method("GET"))
            .and(path("/usuarios"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;
        mount_refresh(
            &h,
            ResponseTemplate::new(200).set_body_json(json!({ "token": "new" })),
        )
        .await;

        let err = h
            .session
            .client()
            .send(ApiRequest::get("/usuarios"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(refresh_calls(&h).await, 1);

        let business = h
            .server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/usuarios")
            .count();
        assert_eq!(business, 2);
        // The refresh itself succeeded, so the session survives
        assert_eq!(h.session.tokens().get_token().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_failing_refresh_endpoint_never_refreshes() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        mount_refresh(&h, ResponseTemplate::new(401)).await;

        let result = h
            .session
            .client()
            .send(ApiRequest::new(Method::POST, REFRESH_PATH))
            .await;

        assert_err!(result);
        assert_eq!(refresh_calls(&h).await, 1);
        assert_eq!(h.session.tokens().get_token(), None);
        assert_eq!(
            h.storage.get(keys::LOGOUT_REASON).as_deref(),
            Some("SESSION_EXPIRED")
        );
        assert_eq!(h.navigator.redirects(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_public_route_suppresses_refresh() {
        let h = harness().await;
        h.session.routes().set_current("/login");
        h.session.tokens().set_token(Some("old"));
        mount_courses(&h, 401).await;
        mount_refresh(
            &h,
            ResponseTemplate::new(200).set_body_json(json!({ "token": "new" })),
        )
        .await;

        let err = h
            .session
            .client()
            .send(ApiRequest::get("/cursos/1"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(refresh_calls(&h).await, 0);
        assert_eq!(h.session.tokens().get_token().as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_other_statuses_propagate_untouched() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        mount_courses(&h, 500).await;

        let err = h
            .session
            .client()
            .send(ApiRequest::get("/cursos/1"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(refresh_calls(&h).await, 0);
        assert!(h.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_skips_recovery() {
        // Nothing listens on port 1
        let h = harness_at("http://127.0.0.1:1").await;
        h.session.tokens().set_token(Some("old"));

        let err = h
            .session
            .client()
            .send(ApiRequest::get("/cursos/1"))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Transport { .. }));
        assert_eq!(h.session.tokens().get_token().as_deref(), Some("old"));
        assert!(h.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_refresh_keeps_session() {
        let h = harness_at("http://127.0.0.1:1").await;
        h.session.tokens().set_token(Some("old"));
        h.storage.set("nombre", "Ana");

        let err = h.session.client().refresh_token().await.unwrap_err();

        assert!(matches!(err, SessionError::Transport { .. }));
        assert_eq!(h.session.tokens().get_token().as_deref(), Some("old"));
        assert_eq!(h.storage.get("nombre").as_deref(), Some("Ana"));
        assert_eq!(h.storage.get(keys::LOGOUT_REASON), None);
        assert!(h.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_request_joining_quiet_refresh_ends_session() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        mount_courses(&h, 401).await;
        mount_refresh(
            &h,
            ResponseTemplate::new(401).set_delay(Duration::from_millis(300)),
        )
        .await;

        let client = h.session.client();
        let (quiet, business) = tokio::join!(client.try_refresh(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            client.send(ApiRequest::get("/cursos/1")).await
        });

        assert_err!(quiet);
        assert_eq!(business.unwrap_err().status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(refresh_calls(&h).await, 1);
        assert_eq!(h.session.tokens().get_token(), None);
        assert_eq!(h.session.logout_reason(), Some(LogoutReason::SessionExpired));
        assert_eq!(h.navigator.redirects(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_stalled_requests_replay_in_arrival_order() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        mount_courses(&h, 401).await;
        mount_refresh(
            &h,
            ResponseTemplate::new(200)
                .set_body_json(json!({ "token": "new" }))
                .set_delay(Duration::from_millis(300)),
        )
        .await;

        let client = h.session.client().clone();
        let leader = {
            let client = client.clone();
            tokio::spawn(async move { client.refresh_token().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut stalled = Vec::new();
        for course in ["/cursos/a", "/cursos/b"] {
            let client = client.clone();
            stalled.push(tokio::spawn(async move {
                client.send(ApiRequest::get(course)).await
            }));
            // Let each one hit its 401 and queue before the next starts
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        assert_ok!(leader.await.unwrap());
        for task in stalled {
            assert_ok!(task.await.unwrap());
        }

        let replays: Vec<String> = h
            .server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| {
                r.url.path().starts_with("/cursos/")
                    && r.headers
                        .get("Authorization")
                        .is_some_and(|v| v.as_bytes() == b"Bearer new")
            })
            .map(|r| r.url.path().to_string())
            .collect();
        assert_eq!(replays, vec!["/cursos/a", "/cursos/b"]);
        assert_eq!(refresh_calls(&h).await, 1);
    }

    #[tokio::test]
    async fn test_refresh_without_token_is_fatal() {
        let h = harness().await;
        h.session.tokens().set_token(Some("old"));
        mount_courses(&h, 403).await;
        mount_refresh(
            &h,
            ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" })),
        )
        .await;

        let err = h
            .session
            .client()
            .send(ApiRequest::get("/cursos/1"))
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::MissingToken));
        assert_eq!(h.session.tokens().get_token(), None);
        assert_eq!(h.navigator.redirects(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_login_stores_token_profile_and_cookie() {
        let h = harness().await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "refreshToken=rt1; Path=/; HttpOnly")
                    .set_body_json(json!({
                        "jwt": "abc",
                        "nombre": "Ana",
                        "rol": "ALUMNO",
                        "email": "ana@colegio.edu"
                    })),
            )
            .mount(&h.server)
            .await;
        Mock::given(method("POST"))
            .and(path(REFRESH_PATH))
            .and(header("Cookie", "refreshToken=rt1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "def" })))
            .mount(&h.server)
            .await;

        let client = h.session.client();
        let profile = client.login("ana@colegio.edu", "secret").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Ana"));
        assert_eq!(h.session.tokens().get_token().as_deref(), Some("abc"));
        assert!(h.session.profile().has_hints());

        // The refresh cookie rides along on the next refresh
        assert_eq!(client.refresh_token().await.unwrap(), "def");
        assert_eq!(h.session.profile().load().name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn test_login_failure_does_not_refresh() {
        let h = harness().await;
        h.session.routes().set_current("/alumno");
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&h.server)
            .await;

        let err = h
            .session
            .client()
            .login("ana@colegio.edu", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(refresh_calls(&h).await, 0);
        assert!(h.navigator.redirects().is_empty());
    }
}
