//! Token issuance and validation
//!
//! Stateless HMAC-SHA256 signed tokens. A token embeds the account's current
//! password hash alongside its identity claims; validation later compares
//! that embedded hash against the live stored hash, so changing the password
//! silently revokes every outstanding token for the account without any
//! server-side token state.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use warden_core::config::AuthConfig;
use warden_core::User;

/// Claims embedded in an access token.
///
/// The claim shape is fixed: a token with a missing or extra field fails to
/// decode, it is never treated as a partially-present map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenClaims {
    /// Token issuer
    pub iss: String,
    /// Subject - the account id
    pub sub: i64,
    /// The account's email at issue time
    pub email: String,
    /// The account's password hash at issue time; the revocation binding
    pub password_hash: String,
    /// Issued at (Unix epoch seconds)
    pub iat: u64,
    /// Expiration (Unix epoch seconds)
    pub exp: u64,
}

/// Token encode/decode errors
///
/// Callers must collapse all decode failures into one generic response;
/// the variants exist for logging and tests, not for the wire.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode token: {0}")]
    Encoding(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    SignatureMismatch,

    #[error("Malformed token")]
    Malformed,

    #[error("System time error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),
}

/// Issues and decodes signed access tokens with a process-wide secret.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: String,
    ttl_secs: u64,
    issuer: String,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            ttl_secs: config.token_ttl_secs,
            issuer: config.issuer.clone(),
        }
    }

    /// Access token lifetime in seconds.
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Issue a signed token for the given account.
    ///
    /// The embedded `password_hash` is the stored hash, not the plaintext;
    /// it binds the token to the account's credential state at issue time.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: user.id,
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Decode a token, checking signature integrity first, then expiry, then
    /// the claim shape. Credential staleness against the live account record
    /// is the authentication dispatcher's job.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let token_data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
            _ => TokenError::Malformed,
        })?;

        Ok(token_data.claims)
    }
}
