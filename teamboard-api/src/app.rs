/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use teamboard_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = teamboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::request_id::RequestIdLayer, routes};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use teamboard_shared::auth::middleware::{session_auth_middleware, SessionAuth};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// State for the session authentication middleware
    pub fn session_auth(&self) -> SessionAuth {
        SessionAuth::new(self.db.clone(), self.config.auth.token_settings())
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /v1                                  (session token required)
/// ├── /me                              GET, PATCH
/// ├── /notifications                   GET
/// │   ├── /unread-count                GET
/// │   ├── /mark-all-read               PATCH
/// │   └── /:id/read                    PATCH
/// └── /organizations                   GET, POST
///     ├── /current                     GET
///     └── /:org_id                     GET, PATCH, DELETE
///         ├── /switch                  POST
///         ├── /leave                   POST
///         ├── /members                 GET, POST
///         │   └── /:user_id            PATCH, DELETE
///         ├── /projects                GET, POST
///         │   └── /:project_id         GET, PATCH, DELETE
///         │       ├── /board           GET
///         │       └── /board/drop      POST
///         ├── /tasks                   GET, POST
///         │   └── /:task_id            GET, PATCH, DELETE
///         │       └── /status          PATCH
///         └── /activity                GET
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. Request ID (`x-request-id`, tracing span)
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Session authentication (everything under `/v1`)
pub fn build_router(state: AppState) -> Router {
    let org_routes = Router::new()
        .route(
            "/",
            get(routes::organizations::list_organizations).post(routes::organizations::create_organization),
        )
        .route("/current", get(routes::organizations::current_organization))
        .route(
            "/:org_id",
            get(routes::organizations::get_organization)
                .patch(routes::organizations::update_organization)
                .delete(routes::organizations::delete_organization),
        )
        .route("/:org_id/switch", post(routes::organizations::switch_organization))
        .route("/:org_id/leave", post(routes::organizations::leave_organization))
        .route(
            "/:org_id/members",
            get(routes::members::list_members).post(routes::members::invite_member),
        )
        .route(
            "/:org_id/members/:user_id",
            patch(routes::members::update_member_role).delete(routes::members::remove_member),
        )
        .route(
            "/:org_id/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:org_id/projects/:project_id",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route("/:org_id/projects/:project_id/board", get(routes::tasks::project_board))
        .route("/:org_id/projects/:project_id/board/drop", post(routes::tasks::drop_on_board))
        .route(
            "/:org_id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:org_id/tasks/:task_id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:org_id/tasks/:task_id/status", patch(routes::tasks::update_task_status))
        .route("/:org_id/activity", get(routes::activity::list_activity));

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/unread-count", get(routes::notifications::unread_count))
        .route("/mark-all-read", patch(routes::notifications::mark_all_read))
        .route("/:id/read", patch(routes::notifications::mark_read));

    let v1_routes = Router::new()
        .route("/me", get(routes::me::current_user).patch(routes::me::update_profile))
        .nest("/organizations", org_routes)
        .nest("/notifications", notification_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.session_auth(),
            session_auth_middleware,
        ));

    Router::new()
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.api.cors_origins))
        .layer(RequestIdLayer)
        .with_state(state)
}

/// CORS policy: any origin when none are configured (or "*" is listed),
/// otherwise only the listed origins, with credentials for the org cookie
fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    if cors_origins.is_empty() || cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::Request, http::StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use std::collections::HashMap;
    use tower::ServiceExt;

    fn test_state(cors_origins: &str) -> AppState {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgresql://localhost:1/unused"),
            ("AUTH_JWT_SECRET", "test-secret-key-at-least-32-bytes-long"),
            ("AUTH_ISSUER", "https://auth.test/"),
            ("CORS_ORIGINS", cors_origins),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        // Never connects unless a handler touches the database
        let pool = PgPoolOptions::new().connect_lazy(&config.database.url).unwrap();
        AppState::new(pool, config)
    }

    #[tokio::test]
    async fn test_v1_requires_token() {
        let app = build_router(test_state(""));

        let response = app
            .oneshot(Request::builder().uri("/v1/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = build_router(test_state(""));

        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight_for_listed_origin() {
        let app = build_router(test_state("https://app.example.com"));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/v1/organizations")
                    .header(header::ORIGIN, "https://app.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }
}
