//! Access gate — route protection applied before any handler runs.
//!
//! The decision itself is a pure function over `(RouteClass, Session, Role)`;
//! the axum middleware only extracts inputs, invokes it, and renders the
//! outcome. The gate never mutates user records — reconciliation happens
//! lazily in the handlers that need it.

pub mod classifier;

pub use classifier::{classify, RouteClass};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::account::Role;
use crate::identity::{self, RequestCredentials, Session};
use crate::AppContext;

// ─── Decision ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Send the caller to the login page, preserving the original path so
    /// they return to it after authenticating.
    RedirectToLogin { return_to: String },
    /// Authenticated, but the role does not grant access.
    Forbidden,
}

/// The access-control state machine.
///
/// | RouteClass       | Session            | Decision              |
/// |------------------|--------------------|-----------------------|
/// | Public           | any                | Allow                 |
/// | Admin            | unauthenticated    | RedirectToLogin       |
/// | Admin            | non-admin role     | Forbidden             |
/// | Admin            | admin role         | Allow                 |
/// | ProtectedDefault | unauthenticated    | RedirectToLogin       |
/// | ProtectedDefault | authenticated      | Allow                 |
pub fn decide(class: RouteClass, session: &Session, role: Role, path: &str) -> GateDecision {
    match class {
        RouteClass::Public => GateDecision::Allow,
        RouteClass::Admin => {
            if !session.is_authenticated {
                GateDecision::RedirectToLogin {
                    return_to: path.to_string(),
                }
            } else if role != Role::Admin {
                GateDecision::Forbidden
            } else {
                GateDecision::Allow
            }
        }
        RouteClass::ProtectedDefault => {
            if session.is_authenticated {
                GateDecision::Allow
            } else {
                GateDecision::RedirectToLogin {
                    return_to: path.to_string(),
                }
            }
        }
    }
}

// ─── Middleware ───────────────────────────────────────────────────────────────

/// Axum middleware applying the gate to every inbound request.
///
/// API paths render `RedirectToLogin` as a 401 JSON body instead of a 307 —
/// an XHR caller cannot follow a login redirect, it re-authenticates and
/// retries on its own.
pub async fn require_route_access(
    State(ctx): State<Arc<AppContext>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let class = classifier::classify(&path);

    if class == RouteClass::Public {
        return next.run(req).await;
    }

    let credentials = RequestCredentials::from_headers(req.headers());
    let session = identity::resolve_or_anonymous(ctx.identity.as_ref(), &credentials).await;
    let role = lookup_role(&ctx, &session).await;

    match decide(class, &session, role, &path) {
        GateDecision::Allow => next.run(req).await,
        GateDecision::RedirectToLogin { return_to } => {
            debug!(path = %return_to, "gate: unauthenticated, sending to login");
            if path.starts_with("/api/") {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "authentication required" })),
                )
                    .into_response()
            } else {
                let to = format!("{}?return_to={}", ctx.config.login_path, return_to);
                Redirect::temporary(&to).into_response()
            }
        }
        GateDecision::Forbidden => {
            debug!(path = %path, role = %role, "gate: role denied");
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "insufficient role" })),
            )
                .into_response()
        }
    }
}

/// Read the caller's role from the stored record, without creating one.
///
/// Missing record or storage error both degrade to the least-privileged role
/// — a read failure must deny admin access, not grant it.
async fn lookup_role(ctx: &AppContext, session: &Session) -> Role {
    let Some(external_id) = session.user_id.as_deref() else {
        return Role::User;
    };
    match ctx.storage.get_user_by_external_id(external_id).await {
        Ok(Some(row)) => Role::from_str(&row.role),
        Ok(None) => Role::User,
        Err(e) => {
            warn!("gate: role lookup failed, denying elevated access: {e:#}");
            Role::User
        }
    }
}
