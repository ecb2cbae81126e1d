//! Role-scoped account handlers
//!
//! Every operation takes a target selector that is either the literal `me`
//! or an explicit account id, resolved once into [`Target`] at the request
//! boundary. `me` always routes to self-scope logic for the caller's own
//! account, whatever their role; an explicit id is admin scope, and the role
//! check runs before the target row is ever looked up.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use warden_core::{Role, User};

use crate::audit::{audit_log, AuditEvent};
use crate::auth::{authorize, hash_password, Identity, Operation};
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Target selector
// ============================================================================

/// Target selector resolved once at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The caller's own account
    Me,
    /// An explicitly named account
    ById(i64),
}

impl Target {
    /// `"me"` or an integer id; any other path segment names no resource.
    pub fn parse(segment: &str) -> Result<Self, AppError> {
        if segment == "me" {
            return Ok(Target::Me);
        }
        segment
            .parse::<i64>()
            .map(Target::ById)
            .map_err(|_| AppError::NotFound)
    }
}

// ============================================================================
// Projections
// ============================================================================

/// Full projection of the caller's own account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SelfView {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub last_login: DateTime<Utc>,
}

impl From<&User> for SelfView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            last_login: user.last_login,
        }
    }
}

/// Reduced projection returned to non-admin callers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub last_login: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            last_login: user.last_login,
        }
    }
}

/// Expanded projection returned to admin callers
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserDetail {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub role_name: String,
    pub last_login: DateTime<Utc>,
}

impl From<&User> for UserDetail {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            role_name: user.role.as_str().to_string(),
            last_login: user.last_login,
        }
    }
}

/// `(id, username)` pair for an account removed by a delete
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedUser {
    pub id: i64,
    pub username: String,
}

// ============================================================================
// Retrieve
// ============================================================================

/// Retrieve one account
///
/// `me` answers with the caller's own full projection for any role; an
/// explicit id is admin only and answers with the expanded projection.
#[utoipa::path(
    get,
    path = "/api/v1/users/{target}",
    tag = "users",
    params(("target" = String, Path, description = "The literal `me` or an account id")),
    responses(
        (status = 200, description = "Account projection", body = UserDetail),
        (status = 401, description = "Not authenticated or not permitted", body = crate::error::ApiError),
        (status = 404, description = "No such account", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn retrieve_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(target): Path<String>,
) -> Result<Response, AppError> {
    match Target::parse(&target)? {
        Target::Me => {
            authorize(&identity, Operation::RetrieveSelf)?;
            Ok(Json(SelfView::from(&identity.user)).into_response())
        }
        Target::ById(id) => {
            // Scope check precedes the existence check: a non-admin caller
            // must not learn whether the id exists.
            authorize(&identity, Operation::RetrieveUser)?;
            let user = state
                .store
                .find_user_by_id(id)
                .await?
                .ok_or(AppError::NotFound)?;
            Ok(Json(UserDetail::from(&user)).into_response())
        }
    }
}

/// List all accounts
///
/// The projection depends on the caller's role: admins see the expanded
/// per-account shape, users see the reduced one.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "All accounts, projection scoped to the caller's role"),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Response, AppError> {
    authorize(&identity, Operation::ListUsers)?;

    let users = state.store.list_users().await?;

    let response = match identity.user.role {
        Role::Admin => Json(users.iter().map(UserDetail::from).collect::<Vec<_>>()).into_response(),
        Role::User => Json(users.iter().map(UserSummary::from).collect::<Vec<_>>()).into_response(),
    };

    Ok(response)
}

// ============================================================================
// Update
// ============================================================================

/// Update payload; `role` is honored only for admin-scope updates.
#[derive(Debug, Default, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

const SELF_FIELDS: &[&str] = &["username", "password"];
const ADMIN_FIELDS: &[&str] = &["username", "password", "role"];

fn no_updatable_fields(allowed: &[&str]) -> AppError {
    AppError::Validation(format!(
        "Bad request data - Only ({}) user fields can be updated.",
        allowed.join(", ")
    ))
}

fn parse_update_body(body: &Bytes) -> Result<UpdateUserRequest, AppError> {
    serde_json::from_slice(body)
        .map_err(|_| AppError::Validation("Malformed request data.".to_string()))
}

/// Absent and empty string both count as "not supplied".
fn supplied(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

/// Update one account
///
/// `me` updates the caller's own account with the `{username, password}`
/// whitelist; a `role` field in a self-update has no effect of any kind.
/// An explicit id is admin only and widens the whitelist to
/// `{username, password, role}`. A request supplying no whitelisted field
/// is rejected before any write.
#[utoipa::path(
    put,
    path = "/api/v1/users/{target}",
    tag = "users",
    params(("target" = String, Path, description = "The literal `me` or an account id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 204, description = "Update persisted"),
        (status = 400, description = "Malformed payload or no updatable fields", body = crate::error::ApiError),
        (status = 401, description = "Not authenticated or not permitted", body = crate::error::ApiError),
        (status = 404, description = "No such account", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(target): Path<String>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let request = parse_update_body(&body)?;

    match Target::parse(&target)? {
        Target::Me => {
            authorize(&identity, Operation::UpdateSelf)?;
            let user = identity.user.clone();
            apply_update(&state, user, request, false).await
        }
        Target::ById(id) => {
            authorize(&identity, Operation::UpdateUser)?;
            let user = state
                .store
                .find_user_by_id(id)
                .await?
                .ok_or(AppError::NotFound)?;
            apply_update(&state, user, request, true).await
        }
    }
}

async fn apply_update(
    state: &AppState,
    mut user: User,
    request: UpdateUserRequest,
    admin_scope: bool,
) -> Result<StatusCode, AppError> {
    let allowed = if admin_scope { ADMIN_FIELDS } else { SELF_FIELDS };
    let mut updated = false;
    let mut password_changed = false;

    if let Some(username) = supplied(request.username) {
        user.username = username;
        updated = true;
    }

    if let Some(password) = supplied(request.password) {
        user.password_hash = hash_password(&password)?;
        updated = true;
        password_changed = true;
    }

    if admin_scope {
        if let Some(role) = supplied(request.role) {
            user.role = Role::from_str(&role).ok_or_else(|| {
                AppError::Validation("Unknown role - expected one of (user, admin).".to_string())
            })?;
            updated = true;
        }
    }
    // A role field on a self-scope update falls through untouched.

    if !updated {
        return Err(no_updatable_fields(allowed));
    }

    state.store.update_user(&user).await?;

    if password_changed {
        // Every token issued before this write now fails validation.
        audit_log(&AuditEvent::PasswordChanged { user_id: user.id });
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Delete
// ============================================================================

#[derive(Debug, Deserialize)]
struct IdRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct BulkDeleteRequest {
    users: Vec<IdRef>,
}

fn parse_bulk_body(body: &Bytes) -> Result<Vec<i64>, AppError> {
    let request: BulkDeleteRequest = serde_json::from_slice(body).map_err(|_| {
        AppError::Validation("Expected a list of user ids under the 'users' key.".to_string())
    })?;

    if request.users.is_empty() {
        return Err(AppError::Validation(
            "Expected a list of user ids under the 'users' key.".to_string(),
        ));
    }

    Ok(request.users.into_iter().map(|user| user.id).collect())
}

/// Snapshot the matching rows, then delete. The response is built from the
/// snapshot so it reflects exactly the rows that were removed.
async fn delete_ids(
    state: &AppState,
    ids: &[i64],
    deleted_by: i64,
) -> Result<Vec<DeletedUser>, AppError> {
    let snapshot = state.store.find_users_by_ids(ids).await?;
    let removed: Vec<DeletedUser> = snapshot
        .iter()
        .map(|user| DeletedUser {
            id: user.id,
            username: user.username.clone(),
        })
        .collect();

    state.store.delete_users(ids).await?;

    if !removed.is_empty() {
        audit_log(&AuditEvent::AccountsDeleted {
            ids: removed.iter().map(|user| user.id).collect(),
            deleted_by,
        });
    }

    Ok(removed)
}

/// Delete one account
///
/// `me` closes the caller's own account; an explicit id is admin only and
/// answers 404 when the id matches nothing. Both answer with the removed
/// `(id, username)` pair.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{target}",
    tag = "users",
    params(("target" = String, Path, description = "The literal `me` or an account id")),
    responses(
        (status = 200, description = "Removed accounts", body = [DeletedUser]),
        (status = 401, description = "Not authenticated or not permitted", body = crate::error::ApiError),
        (status = 404, description = "No such account", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(target): Path<String>,
) -> Result<Json<Vec<DeletedUser>>, AppError> {
    match Target::parse(&target)? {
        Target::Me => {
            authorize(&identity, Operation::DeleteSelf)?;
            let removed = delete_ids(&state, &[identity.user.id], identity.user.id).await?;
            tracing::debug!(user_id = identity.user.id, "account closed by its owner");
            Ok(Json(removed))
        }
        Target::ById(id) => {
            authorize(&identity, Operation::DeleteUser)?;
            state
                .store
                .find_user_by_id(id)
                .await?
                .ok_or(AppError::NotFound)?;
            let removed = delete_ids(&state, &[id], identity.user.id).await?;
            Ok(Json(removed))
        }
    }
}

/// Bulk delete accounts
///
/// Admin only. The body must be a well-formed list of integer ids under the
/// `users` key; it is validated in full before anything is deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Removed accounts", body = [DeletedUser]),
        (status = 400, description = "Malformed id list", body = crate::error::ApiError),
        (status = 401, description = "Not authenticated or not permitted", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_delete_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Json<Vec<DeletedUser>>, AppError> {
    authorize(&identity, Operation::DeleteMany)?;

    let ids = parse_bulk_body(&body)?;
    let removed = delete_ids(&state, &ids, identity.user.id).await?;

    Ok(Json(removed))
}
