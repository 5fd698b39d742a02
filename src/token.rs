//! Signed, time-bound identity tokens for machine-to-machine calls.
//!
//! Tokens are minted fresh for every authenticated outbound call and are
//! never cached: they are short-lived credentials, not session tokens, so
//! minimizing reuse limits the blast radius of a leaked token. `nbf` is
//! backdated 60 seconds to absorb clock skew between services.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, TokenError};

/// Default token lifetime: 24 hours.
pub const DEFAULT_EXPIRY_SECS: i64 = 24 * 3600;

/// How far `nbf` is backdated at mint time.
pub const CLOCK_SKEW_SECS: i64 = 60;

/// Default signing algorithm.
pub const DEFAULT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by an identity token.
///
/// All timestamps are integer seconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject the token asserts an identity for.
    pub sub: String,
    /// Role granted to the subject for this call.
    pub role: String,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Not-before timestamp, backdated by [`CLOCK_SKEW_SECS`].
    pub nbf: i64,
    /// Expiry timestamp.
    pub exp: i64,
}

/// Mint a signed identity token for `subject` with `role`.
///
/// Sets `iat = now`, `nbf = now - 60s`, `exp = now + expiry_secs`.
/// Signing is deterministic given identical inputs and timestamp.
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if the token cannot be encoded.
pub fn mint(
    subject: &str,
    role: &str,
    secret: &SecretString,
    expiry_secs: i64,
    algorithm: Algorithm,
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        iat: now,
        nbf: now - CLOCK_SKEW_SECS,
        exp: now + expiry_secs,
    };
    encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Mint a token with the default 24h expiry and HS256 signature.
///
/// # Errors
///
/// Returns [`TokenError::Signing`] if the token cannot be encoded.
pub fn mint_with_defaults(
    subject: &str,
    role: &str,
    secret: &SecretString,
) -> Result<String, TokenError> {
    mint(subject, role, secret, DEFAULT_EXPIRY_SECS, DEFAULT_ALGORITHM)
}

/// Verify a token signature and validity window, returning its claims.
///
/// # Errors
///
/// - [`TokenError::MalformedClaims`] when `sub` or `role` is absent.
/// - [`TokenError::InvalidSignatureOrExpired`] for signature mismatch,
///   wrong algorithm, or a timestamp outside `[nbf, exp]`. These are
///   never distinguished further, to avoid oracle attacks on why a
///   token failed.
pub fn verify(
    token: &str,
    secret: &SecretString,
    algorithm: Algorithm,
) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(algorithm);
    validation.leeway = 0;
    validation.validate_nbf = true;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => TokenError::MalformedClaims,
        _ => TokenError::InvalidSignatureOrExpired,
    })
}

/// Authorize an inbound request from its `Authorization` header.
///
/// Strips the `Bearer ` prefix, verifies the token with HS256, and checks
/// role membership. An empty `allowed_roles` set forbids every caller.
///
/// # Errors
///
/// - [`AuthError::MissingAuthorization`] when no header was supplied (401).
/// - [`AuthError::Token`] when verification fails (400 or 401 per kind).
/// - [`AuthError::RoleNotAllowed`] when the role is not in the set (403).
pub fn authorize(
    auth_header: Option<&str>,
    secret: &SecretString,
    allowed_roles: &[&str],
) -> Result<Claims, AuthError> {
    let header = auth_header.ok_or(AuthError::MissingAuthorization)?;
    let encoded = header.strip_prefix("Bearer ").unwrap_or(header);
    let claims = verify(encoded, secret, DEFAULT_ALGORITHM)?;
    if !allowed_roles.contains(&claims.role.as_str()) {
        return Err(AuthError::RoleNotAllowed {
            role: claims.role.clone(),
        });
    }
    Ok(claims)
}
