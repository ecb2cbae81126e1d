//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler));

    // Protected routes; the auth middleware resolves the caller identity
    // from either credential scheme before any handler runs
    let protected_routes = Router::new()
        .route(
            "/users",
            get(users::list_users_handler).delete(users::bulk_delete_handler),
        )
        .route(
            "/users/:target",
            get(users::retrieve_handler)
                .put(users::update_handler)
                .delete(users::delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
