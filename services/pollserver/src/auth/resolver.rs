//! Connection-time identity resolution.
//!
//! # Purpose
//! Turn the credential attached to an inbound request or WebSocket handshake
//! into a [`Voter`], or into "anonymous" when the credential is missing,
//! malformed, or expired. Resolution never rejects a connection: anonymous
//! observers are allowed by design, they just cannot vote.
use livepoll_hub::Voter;

use crate::auth::token::{TokenError, verify_session_token};

/// Cookie that carries the session token.
pub const SESSION_COOKIE: &str = "token";

/// Pluggable verification capability, so the identity mechanism can be
/// swapped without touching the hub or the transport layer.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, raw_token: &str) -> Result<Voter, TokenError>;
}

/// Production verifier: HS256 session tokens signed with a shared secret.
#[derive(Debug, Clone)]
pub struct JwtVerifier {
    secret: Vec<u8>,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl CredentialVerifier for JwtVerifier {
    fn verify(&self, raw_token: &str) -> Result<Voter, TokenError> {
        let claims = verify_session_token(&self.secret, raw_token)?;
        Ok(Voter {
            id: claims.sub,
            display_name: claims.name,
        })
    }
}

/// Resolve the identity for a connection from its Cookie header.
///
/// Any failure degrades to `None` rather than an error: the caller keeps the
/// connection and treats it as an anonymous observer.
pub fn resolve_identity(
    verifier: &dyn CredentialVerifier,
    cookie_header: Option<&str>,
) -> Option<Voter> {
    let token = cookie_header.and_then(|header| cookie_value(header, SESSION_COOKIE))?;
    match verifier.verify(token) {
        Ok(voter) => Some(voter),
        Err(err) => {
            tracing::debug!(error = %err, "session credential rejected, continuing as anonymous");
            None
        }
    }
}

fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
