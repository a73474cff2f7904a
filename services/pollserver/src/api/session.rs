//! Session-facing API handlers: profile lookup and logout.
//!
//! # Purpose
//! Thin HTTP surface over the session credential. The profile endpoint is the
//! one place where a bad credential is surfaced as an explicit 401 instead of
//! degrading to anonymous.
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;

use crate::api::error::{ApiError, api_unauthorized};
use crate::api::types::{LogoutResponse, ProfileResponse};
use crate::app::AppState;
use crate::auth::resolver::{SESSION_COOKIE, resolve_identity};

/// Return the signed-in user for a valid session cookie, else 401.
pub(crate) async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ProfileResponse>, ApiError> {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());
    match resolve_identity(state.verifier.as_ref(), cookie_header) {
        Some(user) => Ok(Json(ProfileResponse { user })),
        None => Err(api_unauthorized("missing or invalid session token")),
    }
}

/// Clear the session cookie.
///
/// The token is self-contained, so there is nothing to invalidate server-side;
/// an expired `Set-Cookie` is the entire logout.
pub(crate) async fn logout() -> impl IntoResponse {
    let expired = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    (
        [(header::SET_COOKIE, expired)],
        Json(LogoutResponse { ok: true }),
    )
}
