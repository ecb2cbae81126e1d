//! Authentication and authorization module
//!
//! Components:
//! - Token issuance and validation (stateless, password-hash bound)
//! - Password hashing with Argon2
//! - The authentication dispatcher selecting between the password and
//!   bearer-token schemes
//! - The role-based access guard and its permission table
//! - Middleware wiring authentication into protected routes

pub mod dispatcher;
pub mod guard;
pub mod middleware;
pub mod password;
pub mod token;

pub use dispatcher::{AuthError, AuthScheme, Authenticator, Credentials, Identity};
pub use guard::{allowed_roles, authorize, Operation};
pub use middleware::auth_middleware;
pub use password::{hash_password, verify_password, PasswordError};
pub use token::{TokenClaims, TokenCodec, TokenError};
