// rest/routes/track.rs — Client event relay.
//
// Accepts fire-and-forget events from the browser (lesson_hint_opened and
// friends) and enqueues them for the analytics flush task. Always 202 on a
// well-formed body — delivery to the sink is best-effort by design.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::tracker::AnalyticsEvent;
use crate::AppContext;

const MAX_EVENT_NAME_LEN: usize = 64;

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub event: String,
    #[serde(default)]
    pub properties: Value,
}

pub async fn ingest(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<TrackRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let name = body.event.trim();
    if name.is_empty() || name.len() > MAX_EVENT_NAME_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid event name" })),
        ));
    }

    ctx.analytics
        .send(AnalyticsEvent::new(name, body.properties));

    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}
