//! HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use axum::Router;
use livepoll_hub::PollHub;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::resolver::CredentialVerifier;
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub hub: PollHub,
    pub verifier: Arc<dyn CredentialVerifier>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route("/ws", axum::routing::get(ws::poll_socket))
        .route("/api/profile", axum::routing::get(api::session::profile))
        .route("/auth/logout", axum::routing::post(api::session::logout))
        .route("/api/results", axum::routing::get(api::results::results))
        .route("/api/health", axum::routing::get(api::results::health))
        .layer(trace_layer)
        .with_state(state)
}
