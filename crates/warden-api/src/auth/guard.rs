//! Role-based access control
//!
//! Every protected operation declares its allowed role set in one permission
//! table, checked as a pure function over the caller's identity. A failed
//! check produces the same response shape as a failed authentication, so a
//! caller cannot tell "wrong role" apart from "not signed in".

use warden_core::Role;

use crate::audit::{audit_log, AuditEvent};
use crate::error::AppError;

use super::dispatcher::Identity;

/// The protected operations of the account API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    RetrieveSelf,
    RetrieveUser,
    ListUsers,
    UpdateSelf,
    UpdateUser,
    DeleteSelf,
    DeleteUser,
    DeleteMany,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::RetrieveSelf => "retrieve_self",
            Operation::RetrieveUser => "retrieve_user",
            Operation::ListUsers => "list_users",
            Operation::UpdateSelf => "update_self",
            Operation::UpdateUser => "update_user",
            Operation::DeleteSelf => "delete_self",
            Operation::DeleteUser => "delete_user",
            Operation::DeleteMany => "delete_many",
        }
    }
}

/// The permission table.
///
/// Self-scope operations are open to any authenticated caller; operations
/// that name an arbitrary account are admin only.
pub const fn allowed_roles(operation: Operation) -> &'static [Role] {
    match operation {
        Operation::RetrieveSelf
        | Operation::ListUsers
        | Operation::UpdateSelf
        | Operation::DeleteSelf => &[Role::User, Role::Admin],
        Operation::RetrieveUser
        | Operation::UpdateUser
        | Operation::DeleteUser
        | Operation::DeleteMany => &[Role::Admin],
    }
}

/// Check the caller's role against the table.
///
/// Runs before any storage access for the operation, so an unauthorized
/// caller learns nothing about whether the target exists.
pub fn authorize(identity: &Identity, operation: Operation) -> Result<(), AppError> {
    if allowed_roles(operation).contains(&identity.user.role) {
        return Ok(());
    }

    audit_log(&AuditEvent::AccessDenied {
        user_id: identity.user.id,
        email: identity.user.email.clone(),
        operation: operation.name().to_string(),
    });

    Err(AppError::Authorization)
}
