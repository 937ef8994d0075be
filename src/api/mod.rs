//! Ad-hoc calls against the Campus Virtual API

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::auth::open_session;
use crate::config::Config;
use crate::session::{
    ApiRequest, BootstrapOutcome, ChannelNavigator, LogoutReason, SessionError, SessionManager,
};

fn parse_method(raw: &str) -> Result<Method> {
    Method::from_bytes(raw.to_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {}", raw))
}

fn parse_body(data: Option<&str>) -> Result<Option<Value>> {
    data.map(serde_json::from_str)
        .transpose()
        .context("--data is not valid JSON")
}

/// Send one request through the session client and print the JSON reply.
///
/// `route` is the screen the request is made from; it decides whether the
/// session is bootstrapped first and whether a 401 may trigger a refresh.
pub async fn request(
    config: &Config,
    method: &str,
    path: &str,
    data: Option<&str>,
    route: &str,
) -> Result<()> {
    let method = parse_method(method)?;
    let body = parse_body(data)?;

    let (navigator, mut redirects) = ChannelNavigator::new();
    let session = open_session(config, Arc::new(navigator))?;

    let mut req = ApiRequest::new(method.clone(), path);
    if let Some(body) = body {
        req = req.with_body(body);
    }
    tracing::debug!("{} {} (request {})", method, path, req.id());

    let (result, ended) = run_request(&session, &mut redirects, route, req).await;
    if let Some(reason) = ended {
        eprintln!("{}", reason.message());
    }
    let value = result.with_context(|| format!("{} {} failed", method, path))?;

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

/// Bootstrap for `route`, then send `req`. The logout reason is returned
/// only when the session ended during this call; a marker left by an
/// earlier run stays where it is for `status` to report.
async fn run_request(
    session: &SessionManager,
    redirects: &mut mpsc::UnboundedReceiver<String>,
    route: &str,
    req: ApiRequest,
) -> (Result<Value, SessionError>, Option<LogoutReason>) {
    match session.enter_route(route).await {
        BootstrapOutcome::Refreshed => tracing::debug!("Session refreshed"),
        BootstrapOutcome::RefreshFailed => tracing::debug!("No session to refresh"),
        _ => {}
    }
    session.readiness().wait_ready().await;

    let result = session.client().send_json(req).await;
    let ended = match redirects.try_recv() {
        Ok(path) => {
            tracing::info!("Session ended, returning to {}", path);
            session.take_logout_reason()
        }
        Err(_) => None,
    };
    (result, ended)
}
