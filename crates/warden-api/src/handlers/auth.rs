//! Registration and sign-in handlers
//!
//! Both endpoints are public and answer success with `{"token": ...}`; the
//! token is the only session artifact the service ever hands out.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use warden_core::{NewUser, Role};

use crate::audit::{audit_log, AuditEvent};
use crate::auth::{hash_password, AuthError, Credentials};
use crate::error::AppError;
use crate::state::AppState;

/// Registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Grants the admin role when it matches the configured admin secret;
    /// otherwise the account is created as a regular user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
}

/// Sign-in request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token issued on successful registration or sign-in
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
}

/// Register a new account
///
/// Creates the account and signs the caller in immediately by returning a
/// fresh access token. A duplicate email answers with a deliberately
/// ambiguous message so the endpoint cannot be used to probe which addresses
/// hold accounts.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, token issued", body = TokenResponse),
        (status = 400, description = "Invalid input or registration failed", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "Both username and password are required.".to_string(),
        ));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation("Invalid email format.".to_string()));
    }

    let role = match &request.admin_password {
        Some(secret) if *secret == state.config.auth.admin_secret => Role::Admin,
        _ => Role::User,
    };

    let password_hash = hash_password(&request.password)?;

    let user = state
        .store
        .insert_user(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            role,
            last_login: Utc::now(),
        })
        .await?;

    let token = state.tokens.issue(&user)?;

    audit_log(&AuditEvent::RegisterSuccess {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
    });
    tracing::info!(user_id = user.id, "new account registered");

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// Sign in with email and password
///
/// Runs the same password verification path as Basic-authenticated requests,
/// refreshes the last-login timestamp, and issues a new access token.
/// An unknown email and a wrong password are indistinguishable to the
/// caller.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Sign-in successful, token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = Credentials::Password {
        email: request.email.clone(),
        password: request.password,
    };

    let identity = match state.authenticator.authenticate(&credentials).await {
        Ok(identity) => identity,
        Err(AuthError::Store(message)) => return Err(AppError::Internal(message)),
        Err(e) => {
            audit_log(&AuditEvent::LoginAttempt {
                email: request.email,
                success: false,
                failure_reason: Some(e.to_string()),
            });
            return Err(AppError::Authentication);
        }
    };

    let mut user = identity.user;
    user.last_login = Utc::now();
    state.store.update_user(&user).await?;

    let token = state.tokens.issue(&user)?;

    audit_log(&AuditEvent::LoginAttempt {
        email: user.email.clone(),
        success: true,
        failure_reason: None,
    });

    Ok(Json(TokenResponse { token }))
}
