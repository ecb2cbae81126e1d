/// Authentication middleware for protecting routes
///
/// Parses the Authorization header into one of the two accepted credential
/// forms, runs the authentication dispatcher, and on success adds the
/// resolved [`Identity`] to the request extensions for downstream handlers.
use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::Engine;
use std::sync::Arc;

use crate::audit::{audit_log, extract_ip_address, AuditEvent};
use crate::error::AppError;
use crate::state::AppState;

use super::dispatcher::{AuthError, Credentials};

/// Parse an Authorization header value into credential material.
///
/// `Bearer <token>` selects the token scheme; `Basic <base64(email:pw)>`
/// selects the password scheme. The two forms are mutually exclusive.
pub fn parse_authorization(value: &str) -> Result<Credentials, AuthError> {
    if let Some(token) = value.strip_prefix("Bearer ") {
        if token.is_empty() {
            return Err(AuthError::MalformedHeader);
        }
        return Ok(Credentials::Token(token.to_string()));
    }

    if let Some(encoded) = value.strip_prefix("Basic ") {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| AuthError::MalformedHeader)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;
        let (email, password) = decoded.split_once(':').ok_or(AuthError::MalformedHeader)?;
        return Ok(Credentials::Password {
            email: email.to_string(),
            password: password.to_string(),
        });
    }

    Err(AuthError::MalformedHeader)
}

/// Authentication middleware that requires valid credentials.
///
/// In handlers, extract the caller:
///
/// ```ignore
/// use axum::Extension;
/// use warden_api::auth::Identity;
///
/// async fn protected_handler(Extension(identity): Extension<Identity>) -> String {
///     format!("Hello, {}!", identity.user.username)
/// }
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let ip_address = extract_ip_address(request.headers());

    // No credential material at all: fail without touching storage.
    let Some(header_value) = request.headers().get(header::AUTHORIZATION) else {
        audit_log(&AuditEvent::InvalidCredential {
            ip_address,
            reason: AuthError::MissingCredentials.to_string(),
        });
        return Err(AppError::Authentication);
    };

    let credentials = header_value
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)
        .and_then(parse_authorization);

    let credentials = match credentials {
        Ok(credentials) => credentials,
        Err(e) => {
            audit_log(&AuditEvent::InvalidCredential {
                ip_address,
                reason: e.to_string(),
            });
            return Err(AppError::Authentication);
        }
    };

    match state.authenticator.authenticate(&credentials).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(AuthError::Store(message)) => Err(AppError::Internal(message)),
        Err(e) => {
            audit_log(&AuditEvent::InvalidCredential {
                ip_address,
                reason: e.to_string(),
            });
            Err(AppError::Authentication)
        }
    }
}
