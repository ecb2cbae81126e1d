//! Storage implementations for the user-store collaborator
//!
//! The trait itself lives in `warden-core`; this module provides the
//! PostgreSQL-backed production store and an in-memory store used by the
//! test rig and single-process development.

pub mod memory;
pub mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;
