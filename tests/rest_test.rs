//! REST handler tests with fake identity/billing providers — status codes,
//! degradation rules, and validation errors.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::Json;

use campusd::billing::{BillingProvider, PortalSession};
use campusd::config::DaemonConfig;
use campusd::identity::{IdentityProvider, RequestCredentials, Session};
use campusd::rest::routes;
use campusd::storage::Storage;
use campusd::tracker::sink;
use campusd::AppContext;

// ─── Fakes ────────────────────────────────────────────────────────────────────

struct StaticIdentity(Session);

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn resolve(&self, _credentials: &RequestCredentials) -> Result<Session> {
        Ok(self.0.clone())
    }
}

struct FailingIdentity;

#[async_trait]
impl IdentityProvider for FailingIdentity {
    async fn resolve(&self, _credentials: &RequestCredentials) -> Result<Session> {
        Err(anyhow!("identity provider unreachable"))
    }
}

struct StaticBilling;

#[async_trait]
impl BillingProvider for StaticBilling {
    async fn create_portal_session(
        &self,
        customer_ref: &str,
        _return_url: &str,
    ) -> Result<PortalSession> {
        Ok(PortalSession {
            url: format!("https://billing.example/portal/{customer_ref}"),
        })
    }
}

// ─── Fixture ──────────────────────────────────────────────────────────────────

async fn test_ctx(
    identity: Arc<dyn IdentityProvider>,
) -> (
    tempfile::TempDir,
    Arc<AppContext>,
    tokio::sync::mpsc::Receiver<campusd::tracker::AnalyticsEvent>,
) {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let storage = Storage::new(dir.path()).await.expect("open storage");
    let (analytics, rx) = sink::channel(64);

    let config = DaemonConfig {
        port: 0,
        bind_address: "127.0.0.1".to_string(),
        data_dir: dir.path().to_path_buf(),
        log: "info".to_string(),
        log_format: "compact".to_string(),
        login_path: "/login".to_string(),
        identity: Default::default(),
        billing: Default::default(),
        analytics: Default::default(),
    };

    let ctx = Arc::new(AppContext {
        config: Arc::new(config),
        storage: Arc::new(storage),
        identity,
        billing: Arc::new(StaticBilling),
        analytics,
        started_at: std::time::Instant::now(),
    });
    (dir, ctx, rx)
}

fn bearer_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_static("Bearer test-token"),
    );
    headers
}

// ─── Session introspection ────────────────────────────────────────────────────

#[tokio::test]
async fn introspection_reports_anonymous_without_credentials() {
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(Session::anonymous()))).await;

    let Json(body) = routes::session::introspect(State(ctx), HeaderMap::new()).await;
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn introspection_degrades_when_provider_fails() {
    // The bootstrap path must never see a 5xx: a dead identity provider
    // reads as "not logged in".
    let (_dir, ctx, _rx) = test_ctx(Arc::new(FailingIdentity)).await;

    let Json(body) = routes::session::introspect(State(ctx), bearer_headers()).await;
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn introspection_reconciles_and_reports_the_user() {
    let session = Session::authenticated("auth0|alice", true);
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(session))).await;

    let Json(body) = routes::session::introspect(State(ctx.clone()), bearer_headers()).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user_id"], "auth0|alice");
    assert_eq!(body["role"], "user");
    assert_eq!(body["two_factor_enabled"], true);
    assert!(body["onboarding_completed_at"].is_null());

    // The record now exists — introspection created it exactly once.
    let row = ctx
        .storage
        .get_user_by_external_id("auth0|alice")
        .await
        .unwrap()
        .expect("record created");
    assert!(row.last_seen_at.is_some());
}

// ─── Onboarding ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn onboarding_requires_authentication() {
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(Session::anonymous()))).await;

    let err = routes::onboarding::complete(State(ctx), HeaderMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn onboarding_completion_returns_the_timestamp() {
    let session = Session::authenticated("auth0|bob", false);
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(session))).await;

    let Json(body) = routes::onboarding::complete(State(ctx), bearer_headers())
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert!(body["onboarding_completed_at"].is_string());
}

// ─── Billing portal ───────────────────────────────────────────────────────────

#[tokio::test]
async fn billing_portal_requires_authentication() {
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(Session::anonymous()))).await;

    let err = routes::billing::create_portal(State(ctx), HeaderMap::new())
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn billing_portal_404s_without_a_subscription() {
    let session = Session::authenticated("auth0|carol", false);
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(session))).await;

    let err = routes::billing::create_portal(State(ctx), bearer_headers())
        .await
        .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn billing_portal_returns_the_provider_url() {
    let session = Session::authenticated("auth0|dave", false);
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(session))).await;

    // Subscription arrives via the provider webhook.
    let Json(received) = routes::webhooks::billing_event(
        State(ctx.clone()),
        Json(routes::webhooks::BillingEventRequest {
            external_id: "auth0|dave".to_string(),
            customer_ref: "cus_42".to_string(),
            plan: "pro".to_string(),
            status: "active".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(received["received"], true);

    let Json(body) = routes::billing::create_portal(State(ctx), bearer_headers())
        .await
        .unwrap();
    assert_eq!(body["url"], "https://billing.example/portal/cus_42");
}

// ─── Lead capture ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn lead_capture_validates_the_payload() {
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(Session::anonymous()))).await;

    let err = routes::leads::capture(
        State(ctx),
        Json(routes::leads::LeadRequest {
            email: Some("not-an-email".to_string()),
            name: Some("   ".to_string()),
            source: None,
        }),
    )
    .await
    .unwrap_err();

    assert_eq!(err.0, StatusCode::BAD_REQUEST);
    let body = err.1 .0;
    assert_eq!(body["error"], "validation failed");
    assert!(body["fields"]["email"].is_string());
    assert!(body["fields"]["name"].is_string());
}

#[tokio::test]
async fn lead_capture_persists_valid_leads() {
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(Session::anonymous()))).await;

    let Json(body) = routes::leads::capture(
        State(ctx),
        Json(routes::leads::LeadRequest {
            email: Some("ada@example.com".to_string()),
            name: Some("Ada".to_string()),
            source: Some("pricing".to_string()),
        }),
    )
    .await
    .unwrap();
    assert_eq!(body["success"], true);
}

// ─── Event relay ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn track_rejects_blank_event_names() {
    let (_dir, ctx, _rx) = test_ctx(Arc::new(StaticIdentity(Session::anonymous()))).await;

    let err = routes::track::ingest(
        State(ctx),
        Json(routes::track::TrackRequest {
            event: "  ".to_string(),
            properties: serde_json::Value::Null,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn track_enqueues_and_accepts() {
    let (_dir, ctx, mut rx) = test_ctx(Arc::new(StaticIdentity(Session::anonymous()))).await;

    let (status, Json(body)) = routes::track::ingest(
        State(ctx),
        Json(routes::track::TrackRequest {
            event: "lesson_hint_opened".to_string(),
            properties: serde_json::json!({ "lesson": "rust-101/3" }),
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], true);

    let event = rx.try_recv().expect("event queued for the sink");
    assert_eq!(event.event, "lesson_hint_opened");
    assert_eq!(event.properties["lesson"], "rust-101/3");
}
