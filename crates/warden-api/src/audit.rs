//! Security audit logging for authentication events
//!
//! Structured audit records for sign-ins, registrations, credential
//! failures, access-control rejections, and account deletions. Events are
//! logged at INFO level on the dedicated `audit` target so they can be
//! filtered out and routed to security monitoring separately from
//! application logs.

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Security audit events
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A sign-in attempt through the login endpoint
    LoginAttempt {
        email: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        failure_reason: Option<String>,
    },

    /// A new account was created
    RegisterSuccess {
        user_id: i64,
        email: String,
        role: String,
    },

    /// A request presented missing, malformed, stale, or otherwise invalid
    /// credentials
    InvalidCredential {
        #[serde(skip_serializing_if = "Option::is_none")]
        ip_address: Option<String>,
        reason: String,
    },

    /// An authenticated caller was refused an operation by the role guard
    AccessDenied {
        user_id: i64,
        email: String,
        operation: String,
    },

    /// An account's password hash was rewritten; this implicitly revokes
    /// every outstanding token for the account
    PasswordChanged { user_id: i64 },

    /// Accounts were removed
    AccountsDeleted { ids: Vec<i64>, deleted_by: i64 },
}

#[derive(Debug, Serialize)]
struct AuditRecord<'a> {
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

/// Emit an audit event on the `audit` target.
pub fn audit_log(event: &AuditEvent) {
    let record = AuditRecord {
        timestamp: Utc::now(),
        event,
    };

    match serde_json::to_string(&record) {
        Ok(json) => info!(target: "audit", "{json}"),
        Err(e) => info!(target: "audit", "unserializable audit event: {e}"),
    }
}

/// Best-effort client address from proxy headers.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
}
