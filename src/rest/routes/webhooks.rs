// rest/routes/webhooks.rs — Payment-provider callbacks.
//
// The provider pushes subscription state changes here; the daemon persists
// them so the billing-portal endpoint can answer "does this user have a
// subscription" without a provider round-trip. Payload verification beyond
// shape is the provider integration's concern, not ours.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::AppContext;

#[derive(Debug, Deserialize)]
pub struct BillingEventRequest {
    /// Identity-provider subject of the affected user.
    pub external_id: String,
    pub customer_ref: String,
    pub plan: String,
    /// Provider vocabulary: `active`, `trialing`, `past_due`, `canceled`.
    pub status: String,
}

pub async fn billing_event(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<BillingEventRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    // The callback can land before the user's first session resolution, so
    // reconcile here too — same idempotent upsert as everywhere else.
    let user = ctx
        .storage
        .ensure_user(&body.external_id)
        .await
        .map_err(|e| {
            error!("billing webhook: reconciliation failed: {e:#}");
            internal_error()
        })?;

    ctx.storage
        .record_subscription(&user.id, &body.customer_ref, &body.plan, &body.status)
        .await
        .map_err(|e| {
            error!("billing webhook: subscription upsert failed: {e:#}");
            internal_error()
        })?;

    info!(
        user = %user.id,
        status = %body.status,
        "billing webhook: subscription updated"
    );
    Ok(Json(json!({ "received": true })))
}

fn internal_error() -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal error" })),
    )
}
