// rest/routes/billing.rs — Billing portal session creation.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::account;
use crate::identity::{self, RequestCredentials};
use crate::AppContext;

/// `POST /api/v1/billing/portal` — hand the authenticated subscriber a portal
/// URL. 401 unauthenticated, 404 when no subscription exists, 500 when the
/// payment provider misbehaves.
pub async fn create_portal(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let credentials = RequestCredentials::from_headers(&headers);
    let session = identity::resolve_or_anonymous(ctx.identity.as_ref(), &credentials).await;

    let Some(external_id) = session.user_id.as_deref() else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication required" })),
        ));
    };

    let record = account::ensure_user_record(&ctx.storage, external_id)
        .await
        .map_err(|e| {
            error!("billing portal: reconciliation failed: {e:#}");
            internal_error()
        })?;

    let subscription = ctx
        .storage
        .active_subscription(&record.id)
        .await
        .map_err(|e| {
            error!("billing portal: subscription lookup failed: {e:#}");
            internal_error()
        })?;

    let Some(subscription) = subscription else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no subscription" })),
        ));
    };

    let portal = ctx
        .billing
        .create_portal_session(
            &subscription.customer_ref,
            &ctx.config.billing.portal_return_url,
        )
        .await
        .map_err(|e| {
            error!("billing portal: provider call failed: {e:#}");
            internal_error()
        })?;

    Ok(Json(json!({ "url": portal.url })))
}

fn internal_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}
