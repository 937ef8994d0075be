//! Session client errors

use reqwest::StatusCode;

/// Errors surfaced by [`super::SessionClient`].
///
/// `Clone` so a single refresh outcome can be handed to every request
/// waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No response at all (connection refused, DNS, timeout).
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {} for {url}: {body}", .status.as_u16())]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("response did not carry an access token")]
    MissingToken,

    /// The task driving a refresh went away before settling it.
    #[error("token refresh was abandoned before it completed")]
    RefreshAbandoned,

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl SessionError {
    pub(crate) fn transport(url: &str, err: reqwest::Error) -> Self {
        SessionError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(url: &str, err: reqwest::Error) -> Self {
        SessionError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Build a `Status` error from a non-success response, consuming its body.
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let url = resp.url().to_string();
        let body = resp.text().await.unwrap_or_default();
        SessionError::Status { status, url, body }
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SessionError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        )
    }

    /// Whether a failed refresh with this error means the session is gone.
    /// Only answers from the server count; no response says nothing about
    /// the session.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            SessionError::Status { .. } | SessionError::Decode { .. } | SessionError::MissingToken
        )
    }
}
