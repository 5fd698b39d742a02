//! Centralized error types for the RPC client subsystem.
//!
//! The taxonomy is deliberately small: callers pattern-match on these
//! variants to decide between retry, escalation, and client-visible
//! status codes. Anything outside this set propagates untouched.

use thiserror::Error;
use uuid::Uuid;

/// An outbound RPC call that did not complete successfully.
///
/// `status` is a best-effort classification: the real HTTP status when the
/// transport produced one, otherwise `502 Bad Gateway`. Every instance
/// carries a generated id so individual failures can be located in logs.
#[derive(Debug, Error)]
#[error("RPC failed: id={id} status={status} message=[{message}] url={url}")]
pub struct RpcError {
    /// Unique id for this failure instance.
    pub id: String,
    /// The URL the call was issued against.
    pub url: String,
    /// Diagnostic text describing the failure.
    pub message: String,
    /// Best-effort HTTP status classification.
    pub status: u16,
}

impl RpcError {
    /// Create a new error for a failed call against `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.into(),
            message: message.into(),
            status,
        }
    }
}

/// Identity token verification or signing failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Required claims (`sub`, `role`) are absent. A caller-side bug,
    /// not a security event.
    #[error("token is missing required claims")]
    MalformedClaims,

    /// Signature mismatch, wrong algorithm, or timestamp outside the
    /// validity window. Never distinguished further.
    #[error("token signature invalid or outside validity window")]
    InvalidSignatureOrExpired,

    /// Token could not be signed during minting.
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    /// HTTP status a boundary should map this failure to.
    ///
    /// Missing claims signal a malformed request (400); everything else
    /// is an authentication failure (401).
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MalformedClaims => 400,
            Self::InvalidSignatureOrExpired | Self::Signing(_) => 401,
        }
    }
}

/// Inbound authorization failure, produced by [`crate::token::authorize`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header was supplied. Treated as a
    /// missing-credential case, so it maps to 401.
    #[error("missing Authorization header")]
    MissingAuthorization,

    /// The bearer token failed verification.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The token verified but its role is not in the allowed set.
    #[error("role {role} is not allowed")]
    RoleNotAllowed {
        /// The role carried by the rejected token.
        role: String,
    },
}

impl AuthError {
    /// HTTP status a boundary should map this failure to.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MissingAuthorization => 401,
            Self::Token(e) => e.http_status(),
            Self::RoleNotAllowed { .. } => 403,
        }
    }
}

/// Correlation context was required but never established.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// The inbound boundary did not run before this code path. A
    /// programming-contract violation, fatal to the call.
    #[error("no request context established for the current call")]
    MissingContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_display() {
        let err = RpcError::new("http://svc/items", "connection refused", 502);
        let text = err.to_string();
        assert!(text.contains("status=502"));
        assert!(text.contains("url=http://svc/items"));
        assert!(text.contains("message=[connection refused]"));
    }

    #[test]
    fn test_rpc_error_ids_are_unique() {
        let a = RpcError::new("http://svc", "x", 502);
        let b = RpcError::new("http://svc", "x", 502);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_token_error_status_mapping() {
        assert_eq!(TokenError::MalformedClaims.http_status(), 400);
        assert_eq!(TokenError::InvalidSignatureOrExpired.http_status(), 401);
    }

    #[test]
    fn test_auth_error_status_mapping() {
        assert_eq!(AuthError::MissingAuthorization.http_status(), 401);
        assert_eq!(AuthError::Token(TokenError::MalformedClaims).http_status(), 400);
        assert_eq!(
            AuthError::RoleNotAllowed {
                role: "USER".to_string()
            }
            .http_status(),
            403
        );
    }
}
