//! PostgreSQL user store
//!
//! Account persistence using SQLx. Every trait method is a single statement,
//! which is what keeps registration's check-then-insert and the update's
//! read-modify-write race-free at the storage layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use warden_core::{NewUser, Result, Role, User, UserStore, WardenError};

/// PostgreSQL-backed user store
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Connect a new pool to the given database
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .connect(database_url)
            .await
            .map_err(|e| WardenError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// User row from the database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    last_login: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = WardenError;

    fn try_from(row: UserRow) -> Result<User> {
        let role = Role::from_str(&row.role)
            .ok_or_else(|| WardenError::Database(format!("unknown role in users table: {}", row.role)))?;

        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
            last_login: row.last_login,
        })
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password_hash, role, last_login \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WardenError::Database(format!("failed to fetch user by email: {e}")))?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password_hash, role, last_login \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WardenError::Database(format!("failed to fetch user by id: {e}")))?;

        row.map(User::try_from).transpose()
    }

    async fn find_users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password_hash, role, last_login \
             FROM users WHERE id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WardenError::Database(format!("failed to fetch users by ids: {e}")))?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn insert_user(&self, user: NewUser) -> Result<User> {
        // The unique index on email turns check-then-insert into one atomic
        // statement; a concurrent duplicate simply gets no row back.
        let row: Option<UserRow> = sqlx::query_as(
            "INSERT INTO users (username, email, password_hash, role, last_login) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING id, username, email, password_hash, role, last_login",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.last_login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WardenError::Database(format!("failed to insert user: {e}")))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(WardenError::DuplicateEmail),
        }
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        // Full-row write; email is immutable after registration and is
        // deliberately not part of the SET list.
        let result = sqlx::query(
            "UPDATE users SET username = $2, password_hash = $3, role = $4, last_login = $5 \
             WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| WardenError::Database(format!("failed to update user: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(WardenError::NotFound);
        }

        Ok(())
    }

    async fn delete_users(&self, ids: &[i64]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| WardenError::Database(format!("failed to delete users: {e}")))?;

        Ok(result.rows_affected())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, username, email, password_hash, role, last_login \
             FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WardenError::Database(format!("failed to list users: {e}")))?;

        rows.into_iter().map(User::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Trait methods are exercised end-to-end by the integration suite
    // against the in-memory store; row mapping is the only pure logic here.

    #[test]
    fn test_row_mapping_rejects_unknown_role() {
        let row = UserRow {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: "superuser".to_string(),
            last_login: Utc::now(),
        };

        assert!(User::try_from(row).is_err());
    }

    #[test]
    fn test_row_mapping_roundtrip() {
        let row = UserRow {
            id: 9,
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: "admin".to_string(),
            last_login: Utc::now(),
        };

        let user = User::try_from(row).unwrap();
        assert_eq!(user.id, 9);
        assert_eq!(user.role, Role::Admin);
    }
}
