// rest/routes/session.rs — Session introspection.
//
// The client bootstrap calls this before anything else, so it always answers
// 200: provider or storage trouble degrades to `authenticated: false` rather
// than a 5xx that would wedge the page.

use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::account;
use crate::identity::{self, RequestCredentials};
use crate::AppContext;

pub async fn introspect(State(ctx): State<Arc<AppContext>>, headers: HeaderMap) -> Json<Value> {
    let credentials = RequestCredentials::from_headers(&headers);
    let session = identity::resolve_or_anonymous(ctx.identity.as_ref(), &credentials).await;

    let Some(external_id) = session.user_id.as_deref() else {
        return Json(json!({ "authenticated": false }));
    };

    match account::ensure_user_record(&ctx.storage, external_id).await {
        Ok(record) => {
            if let Err(e) = ctx.storage.touch_last_seen(&record.id).await {
                warn!("session introspection: last_seen update failed: {e:#}");
            }
            Json(json!({
                "authenticated": true,
                "user_id": record.external_id,
                "role": record.role.to_string(),
                "two_factor_enabled": session.two_factor_enabled,
                "onboarding_completed_at": record.onboarding_completed_at,
            }))
        }
        Err(e) => {
            warn!("session introspection: reconciliation failed: {e:#}");
            Json(json!({ "authenticated": false }))
        }
    }
}
