//! JWT decoding utilities for extracting claims from ID tokens.
//!
//! Decodes the claims segment of a Cognito ID token without signature or
//! expiry verification. The token arrives over TLS straight from the identity
//! endpoint; the API server performs real verification.

use crate::User;
use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing;

/// Error returned when a token is structurally invalid.
#[derive(Debug, thiserror::Error)]
pub enum MalformedTokenError {
    /// Token is not `header.payload.signature`
    #[error("Invalid JWT format: expected 3 parts separated by dots, got {0}")]
    SegmentCount(usize),

    /// Claims segment is not valid base64url
    #[error("Failed to decode base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded claims are not UTF-8
    #[error("JWT claims are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Claims are not valid JSON, or do not fit the expected shape
    #[error("Failed to parse JWT claims: {0}")]
    Json(#[from] serde_json::Error),

    /// Claims are valid JSON but not an object
    #[error("JWT claims are not a JSON object")]
    NotAnObject,

    /// A claim needed to build the user is absent
    #[error("JWT claims missing required '{0}' claim")]
    MissingClaim(&'static str),
}

/// Claims carried by a Cognito ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject - unique user identifier (required)
    pub sub: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(
        rename = "cognito:username",
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,

    /// `id` for ID tokens, `access` for access tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    /// Expiration timestamp. Carried along, never checked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl IdTokenClaims {
    /// Converts ID token claims into a User.
    ///
    /// Fails with `MissingClaim("email")` when the token has no email claim.
    pub fn into_user(self) -> Result<User, MalformedTokenError> {
        let email = self.email.ok_or(MalformedTokenError::MissingClaim("email"))?;

        tracing::trace!("Initializing User from ID token claims: sub={}", self.sub);

        Ok(User::new(self.sub, email))
    }
}

/// Decodes the claims segment of a JWT into a JSON object.
///
/// Accepts both the URL-safe and the standard base64 alphabet, with or
/// without `=` padding.
///
/// # Example
///
/// ```ignore
/// let claims = decode_claims(&id_token)?;
/// assert_eq!(claims["sub"], "123");
/// ```
pub fn decode_claims(token: &str) -> Result<Map<String, Value>, MalformedTokenError> {
    tracing::trace!("Decoding JWT claims segment");

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        tracing::error!("Invalid JWT format: expected 3 parts, got {}", parts.len());
        return Err(MalformedTokenError::SegmentCount(parts.len()));
    }

    let payload = parts[1].replace('-', "+").replace('_', "/");
    let decoded_bytes = STANDARD_NO_PAD.decode(payload.trim_end_matches('='))?;
    let decoded = String::from_utf8(decoded_bytes)?;

    match serde_json::from_str::<Value>(&decoded)? {
        Value::Object(claims) => Ok(claims),
        _ => Err(MalformedTokenError::NotAnObject),
    }
}

/// Decodes a JWT ID token and extracts the typed claims.
pub fn decode_id_token(token: &str) -> Result<IdTokenClaims, MalformedTokenError> {
    let claims: IdTokenClaims = serde_json::from_value(Value::Object(decode_claims(token)?))?;

    tracing::trace!("Successfully decoded ID token: sub={}", claims.sub);

    Ok(claims)
}

/// Decodes a JWT ID token and converts it directly to a User.
pub fn decode_id_token_to_user(token: &str) -> Result<User, MalformedTokenError> {
    decode_id_token(token)?.into_user()
}
