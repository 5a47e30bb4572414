//! Identity-provider integration — session resolution for inbound requests.
//!
//! The provider is a black box that issues sessions and answers introspection
//! calls; this module only asks "who is the caller". Provider failures never
//! fail the request: resolution fails closed to an anonymous session and the
//! error is logged.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Deserialize;
use tracing::warn;

use crate::config::IdentityConfig;

/// Name of the session cookie the identity provider sets on login.
pub const SESSION_COOKIE: &str = "campus_session";

// ─── Session ──────────────────────────────────────────────────────────────────

/// Read-only view of the caller's authentication state for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub is_authenticated: bool,
    /// The provider's subject identifier. `None` for anonymous callers.
    pub user_id: Option<String>,
    pub two_factor_enabled: bool,
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            is_authenticated: false,
            user_id: None,
            two_factor_enabled: false,
        }
    }

    pub fn authenticated(user_id: impl Into<String>, two_factor_enabled: bool) -> Self {
        Self {
            is_authenticated: true,
            user_id: Some(user_id.into()),
            two_factor_enabled,
        }
    }
}

// ─── Request credentials ──────────────────────────────────────────────────────

/// Credential material extracted from a request, decoupled from the HTTP
/// framework so the resolver can be exercised without a server.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    /// `Authorization: Bearer <token>`, if present.
    pub bearer: Option<String>,
    /// The session cookie value, if present.
    pub session_cookie: Option<String>,
}

impl RequestCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);

        let session_cookie = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| cookie_value(raw, SESSION_COOKIE));

        Self {
            bearer,
            session_cookie,
        }
    }

    /// The token to introspect: bearer wins over the cookie.
    pub fn token(&self) -> Option<&str> {
        self.bearer.as_deref().or(self.session_cookie.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.token().is_none()
    }
}

/// Extract a single cookie value from a `Cookie` header.
pub fn cookie_value(raw: &str, name: &str) -> Option<String> {
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

// ─── Provider trait ───────────────────────────────────────────────────────────

/// Narrow capability interface over the identity provider, so the concrete
/// provider is swappable without touching gate logic.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, credentials: &RequestCredentials) -> Result<Session>;
}

/// Resolve the caller's session, failing closed on provider errors.
///
/// This is the only resolution entry point the gate and handlers use: it can
/// not fail, and an errored provider call surfaces as an anonymous session.
pub async fn resolve_or_anonymous(
    provider: &dyn IdentityProvider,
    credentials: &RequestCredentials,
) -> Session {
    if credentials.is_empty() {
        return Session::anonymous();
    }
    match provider.resolve(credentials).await {
        Ok(session) => session,
        Err(e) => {
            warn!("session resolution failed, treating caller as anonymous: {e:#}");
            Session::anonymous()
        }
    }
}

// ─── HTTP implementation ──────────────────────────────────────────────────────

/// Introspection response from `POST {base_url}/v1/sessions/introspect`.
#[derive(Debug, Deserialize)]
struct IntrospectResponse {
    active: bool,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    two_factor_enabled: bool,
}

pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("build identity provider HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, credentials: &RequestCredentials) -> Result<Session> {
        let Some(token) = credentials.token() else {
            return Ok(Session::anonymous());
        };

        let url = format!("{}/v1/sessions/introspect", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .context("identity introspection request")?
            .error_for_status()
            .context("identity introspection status")?;

        let body: IntrospectResponse = resp
            .json()
            .await
            .context("identity introspection body")?;

        // A session without a subject is unusable even if the provider calls
        // it active.
        match (body.active, body.sub) {
            (true, Some(sub)) => Ok(Session::authenticated(sub, body.two_factor_enabled)),
            _ => Ok(Session::anonymous()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let raw = "theme=dark; campus_session=tok123; exp_hero_headline=A";
        assert_eq!(cookie_value(raw, SESSION_COOKIE).as_deref(), Some("tok123"));
        assert_eq!(cookie_value(raw, "exp_hero_headline").as_deref(), Some("A"));
        assert_eq!(cookie_value(raw, "missing"), None);
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let creds = RequestCredentials {
            bearer: Some("b".into()),
            session_cookie: Some("c".into()),
        };
        assert_eq!(creds.token(), Some("b"));
    }
}
