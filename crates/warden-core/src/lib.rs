//! Warden Core - domain model, storage trait, and shared types
//!
//! This crate defines the abstractions shared across the Warden service:
//! - Account model (`User`, `NewUser`) and the closed `Role` set
//! - The storage collaborator trait (`UserStore`)
//! - Common error types
//! - Configuration management

pub mod config;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Warden operations
#[derive(Error, Debug)]
pub enum WardenError {
    #[error("user not found")]
    NotFound,

    #[error("email already registered")]
    DuplicateEmail,

    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, WardenError>;

// ============================================================================
// Roles
// ============================================================================

/// Access role for an account.
///
/// The set is closed: every account carries exactly one of these. Admins may
/// target arbitrary accounts; users may only target their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Canonical name, used on the wire and in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a role from its canonical name.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Accounts
// ============================================================================

/// A stored user account.
///
/// The password hash is opaque (PHC string) and is never serialized into a
/// response body.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Stable, store-assigned identifier
    pub id: i64,

    /// Display name, mutable by the account owner
    pub username: String,

    /// Sign-in address; globally unique and immutable after registration
    pub email: String,

    /// Argon2id PHC string; never exposed
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// The account's single role
    pub role: Role,

    /// Last successful sign-in (initialized at registration)
    pub last_login: DateTime<Utc>,
}

/// A user account about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub last_login: DateTime<Utc>,
}

// ============================================================================
// Storage collaborator
// ============================================================================

/// Storage seam for user accounts.
///
/// Each method is a single logical operation: implementations must make
/// `insert_user` an atomic check-then-insert (a concurrent duplicate email
/// loses the race cleanly) and `update_user` a single-statement write.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Look up an account by its unique email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Look up an account by id.
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Fetch the accounts matching any of the given ids, ordered by id.
    /// Ids with no matching row are silently absent from the result.
    async fn find_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>>;

    /// Insert a new account; `WardenError::DuplicateEmail` if the email is
    /// already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    /// Persist the full row for an existing account (last write wins);
    /// `WardenError::NotFound` if the row is gone.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Remove the accounts with the given ids; returns how many rows went.
    async fn delete_users(&self, ids: &[i64]) -> Result<u64>;

    /// All accounts, ordered by id.
    async fn list_users(&self) -> Result<Vec<User>>;
}

// ============================================================================
// Tests
// ============================================================================
