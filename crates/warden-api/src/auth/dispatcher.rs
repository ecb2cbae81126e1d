//! Request authentication
//!
//! Two verification paths, selected by which credential material the request
//! presents: a bearer token goes through the token codec plus a liveness
//! check against the stored password hash, a username/password pair goes
//! through the credential store. Either path produces exactly one
//! [`Identity`] per request; the identity is never mutated after creation.

use std::sync::Arc;
use thiserror::Error;
use warden_core::{User, UserStore};

use super::password::verify_password;
use super::token::{TokenCodec, TokenError};

/// Which scheme authenticated the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Password,
    Token,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Password => "password",
            AuthScheme::Token => "token",
        }
    }
}

/// Credential material parsed from a request.
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { email: String, password: String },
    Token(String),
}

/// Resolved caller identity for one request.
///
/// Created by [`Authenticator::authenticate`], read by the access guard and
/// the resource handlers, dropped at end of request.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub scheme: AuthScheme,
}

/// Authentication failures.
///
/// Every variant except `Store` collapses to the same generic 401 response;
/// the distinctions exist only for audit logging.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credentials presented")]
    MissingCredentials,

    #[error("malformed authorization header")]
    MalformedHeader,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token no longer matches the stored credential")]
    StaleCredential,

    #[error("unknown account or wrong password")]
    BadCredentials,

    #[error("storage error: {0}")]
    Store(String),
}

/// Authentication dispatcher.
///
/// Constructed once at startup and shared through the application state;
/// the token secret is the only long-lived piece of auth state and it is
/// immutable.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn UserStore>,
    codec: TokenCodec,
}

impl Authenticator {
    pub fn new(store: Arc<dyn UserStore>, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    /// Verify the presented credentials and resolve the caller's account.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        match credentials {
            Credentials::Token(token) => self.authenticate_token(token).await,
            Credentials::Password { email, password } => {
                self.authenticate_password(email, password).await
            }
        }
    }

    /// Token scheme: signature and expiry first, then re-read the account
    /// and compare the embedded password hash byte-for-byte against the
    /// live one. A vanished account or a hash mismatch both mean the token
    /// was issued against credential state that no longer exists.
    async fn authenticate_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.codec.decode(token)?;

        let user = self
            .store
            .find_user_by_id(claims.sub)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
            .ok_or(AuthError::StaleCredential)?;

        if claims.password_hash.as_bytes() != user.password_hash.as_bytes() {
            return Err(AuthError::StaleCredential);
        }

        Ok(Identity {
            user,
            scheme: AuthScheme::Token,
        })
    }

    /// Password scheme: look up the account by its unique email and verify
    /// the password. A missing account and a wrong password are deliberately
    /// indistinguishable.
    async fn authenticate_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        if email.is_empty() {
            return Err(AuthError::BadCredentials);
        }

        let user = self
            .store
            .find_user_by_email(email)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
            .ok_or(AuthError::BadCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::BadCredentials);
        }

        Ok(Identity {
            user,
            scheme: AuthScheme::Password,
        })
    }
}
