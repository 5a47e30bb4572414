// rest/routes/onboarding.rs — Onboarding completion.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::account::{self, AccountError};
use crate::identity::{self, RequestCredentials};
use crate::AppContext;

pub async fn complete(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let credentials = RequestCredentials::from_headers(&headers);
    let session = identity::resolve_or_anonymous(ctx.identity.as_ref(), &credentials).await;

    match account::complete_onboarding(&ctx.storage, &session).await {
        Ok(record) => Ok(Json(json!({
            "success": true,
            "onboarding_completed_at": record.onboarding_completed_at,
        }))),
        Err(AccountError::Unauthorized) => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "authentication required" })),
        )),
        Err(AccountError::Storage(e)) => {
            error!("onboarding completion failed: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            ))
        }
    }
}
