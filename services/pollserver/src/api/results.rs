//! Tally and health API handlers.
use axum::Json;
use axum::extract::State;
use livepoll_hub::Tally;

use crate::api::error::{ApiError, api_internal_message};
use crate::api::types::HealthStatus;
use crate::app::AppState;

/// Read-only tally snapshot, no auth required. Debug surface: the real-time
/// channel is how clients are expected to follow results.
pub(crate) async fn results(State(state): State<AppState>) -> Result<Json<Tally>, ApiError> {
    match state.hub.tally().await {
        Ok(tally) => Ok(Json(tally)),
        Err(err) => {
            tracing::error!(error = %err, "tally query failed");
            Err(api_internal_message("poll hub unavailable"))
        }
    }
}

/// Liveness probe. Round-trips the hub so a wedged hub task shows up here
/// rather than only on the socket path.
pub(crate) async fn health(State(state): State<AppState>) -> Result<Json<HealthStatus>, ApiError> {
    if let Err(err) = state.hub.tally().await {
        tracing::error!(error = %err, "hub health check failed");
        return Err(api_internal_message("poll hub unavailable"));
    }
    Ok(Json(HealthStatus {
        status: "ok".to_string(),
    }))
}
