//! Session token minting and verification.
//!
//! # Purpose
//! Define the claim structure and helpers for signing/verifying the
//! self-contained session tokens carried in the `token` cookie.
//!
//! # Key invariants
//! - Tokens are HS256, signed with one shared secret; there is no key
//!   rotation and no server-side session state.
//! - `exp` is mandatory and validated on every verification, so logout can be
//!   purely client-side (the credential dies of natural expiry).
//!
//! # Callers / consumers
//! - The upstream sign-in callback mints a token after the OAuth exchange.
//! - [`crate::auth::resolver`] verifies tokens on HTTP requests and WebSocket
//!   handshakes.
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Claims carried by session tokens, as minted by the sign-in callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Profile fields available after the upstream OAuth exchange.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
    pub username: String,
    pub avatar: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Mint a session token for a signed-in profile.
///
/// The `name` claim falls back to the username when the upstream profile has
/// no display name set.
pub fn mint_session_token(
    secret: &[u8],
    profile: &UserProfile,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = now_epoch_seconds();
    let claims = SessionClaims {
        sub: profile.id.clone(),
        name: profile
            .display_name
            .clone()
            .unwrap_or_else(|| profile.username.clone()),
        username: Some(profile.username.clone()),
        avatar: profile.avatar.clone(),
        iat: now,
        exp: now + ttl.as_secs() as i64,
    };
    let header = Header::new(Algorithm::HS256);
    Ok(jsonwebtoken::encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Verify a session token's signature and expiry.
pub fn verify_session_token(secret: &[u8], token: &str) -> Result<SessionClaims, TokenError> {
    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation,
    )?;
    Ok(data.claims)
}

fn now_epoch_seconds() -> i64 {
    // Wall-clock time; verification leeway absorbs small skews. Clamp to
    // zero rather than panic if the clock sits before the epoch.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_secs() as i64
}
