// rest/routes/leads.rs — Lead capture from marketing pages.

use axum::{extract::State, http::StatusCode, Json};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::error;

use crate::AppContext;

const MAX_NAME_LEN: usize = 200;
const MAX_SOURCE_LEN: usize = 100;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Debug, Deserialize)]
pub struct LeadRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Page or campaign the form lives on, e.g. `"pricing"`.
    #[serde(default)]
    pub source: Option<String>,
}

/// `POST /api/v1/leads` — validate and persist a marketing lead.
/// Malformed payloads get a 400 with per-field reasons.
pub async fn capture(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<LeadRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut fields = Map::new();

    let email = body.email.as_deref().map(str::trim).unwrap_or("");
    if email.is_empty() {
        fields.insert("email".into(), json!("required"));
    } else if !EMAIL_RE.is_match(email) {
        fields.insert("email".into(), json!("not a valid email address"));
    }

    if let Some(name) = body.name.as_deref() {
        if name.trim().is_empty() {
            fields.insert("name".into(), json!("must not be blank"));
        } else if name.len() > MAX_NAME_LEN {
            fields.insert("name".into(), json!("too long"));
        }
    }

    if let Some(source) = body.source.as_deref() {
        if source.len() > MAX_SOURCE_LEN {
            fields.insert("source".into(), json!("too long"));
        }
    }

    if !fields.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "validation failed", "fields": fields })),
        ));
    }

    ctx.storage
        .insert_lead(
            email,
            body.name.as_deref().map(str::trim),
            body.source.as_deref(),
        )
        .await
        .map_err(|e| {
            error!("lead capture failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal error" })),
            )
        })?;

    Ok(Json(json!({ "success": true })))
}
