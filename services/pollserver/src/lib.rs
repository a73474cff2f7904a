//! Poll service library crate.
//!
//! # Purpose
//! Exposes the HTTP/WebSocket surface, session-token auth helpers,
//! configuration, and observability wiring for use by the binary and tests.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod observability;
pub mod ws;

use app::{AppState, build_router};
use auth::resolver::JwtVerifier;
use config::PollServerConfig;
use livepoll_hub::PollHub;
use std::future::Future;
use std::sync::Arc;

/// Build the shared application state, spawning the hub task.
pub fn build_state(config: &PollServerConfig) -> AppState {
    AppState {
        hub: PollHub::spawn(),
        verifier: Arc::new(JwtVerifier::new(config.session_secret.as_bytes())),
    }
}

/// Run the service until the shutdown future resolves.
pub async fn run_with_shutdown<F>(config: PollServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability();
    let state = build_state(&config);
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "poll server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}
