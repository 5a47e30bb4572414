// rest/mod.rs — Public REST API server.
//
// Axum HTTP server fronting the course platform. Every request passes the
// access-gate middleware before reaching a handler; public routes (health,
// leads, track, webhooks, session introspection) pass through ungated.
//
// Endpoints:
//   GET  /api/v1/health
//   GET  /api/v1/session
//   POST /api/v1/onboarding/complete
//   POST /api/v1/billing/portal
//   POST /api/v1/leads
//   POST /api/v1/track
//   POST /api/v1/webhooks/billing

pub mod routes;

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::gate;
use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/session", get(routes::session::introspect))
        .route(
            "/api/v1/onboarding/complete",
            post(routes::onboarding::complete),
        )
        .route("/api/v1/billing/portal", post(routes::billing::create_portal))
        .route("/api/v1/leads", post(routes::leads::capture))
        .route("/api/v1/track", post(routes::track::ingest))
        .route(
            "/api/v1/webhooks/billing",
            post(routes::webhooks::billing_event),
        )
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            gate::require_route_access,
        ))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
