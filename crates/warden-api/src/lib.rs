//! Warden API - user-account REST service
//!
//! HTTP surface for registration, credential sign-in, and role-scoped
//! account management on top of the auth subsystem in [`auth`].

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use state::AppState;
use warden_core::config::ServerConfig;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::users::retrieve_handler,
        handlers::users::list_users_handler,
        handlers::users::update_handler,
        handlers::users::delete_handler,
        handlers::users::bulk_delete_handler,
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::health::metrics_snapshot,
    ),
    components(schemas(
        handlers::auth::RegisterRequest,
        handlers::auth::LoginRequest,
        handlers::auth::TokenResponse,
        handlers::users::SelfView,
        handlers::users::UserSummary,
        handlers::users::UserDetail,
        handlers::users::UpdateUserRequest,
        handlers::users::DeletedUser,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::MetricsResponse,
        error::ApiError,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and sign-in"),
        (name = "users", description = "Role-scoped account management"),
        (name = "health", description = "Liveness and service counters"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_snapshot))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Router wired to an in-memory store, for integration tests
#[cfg(feature = "test-utils")]
pub fn create_router_for_testing() -> Router {
    use warden_core::config::AppConfig;
    use warden_core::UserStore;

    let store: Arc<dyn UserStore> = Arc::new(store::MemoryUserStore::new());
    let state = Arc::new(AppState::new(AppConfig::default(), store));

    create_router(state)
}
