/// Session authentication middleware for Axum
///
/// Reads `Authorization: Bearer <token>`, validates the identity-provider
/// session token, mirrors the user into the local `users` table on first
/// sight, and stores an [`AuthContext`] in the request extensions.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use teamboard_shared::auth::jwt::TokenSettings;
/// use teamboard_shared::auth::middleware::{session_auth_middleware, AuthContext, SessionAuth};
/// use sqlx::PgPool;
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// fn router(pool: PgPool, settings: TokenSettings) -> Router {
///     let auth = SessionAuth::new(pool, settings);
///     Router::new()
///         .route("/whoami", get(whoami))
///         .layer(middleware::from_fn_with_state(auth, session_auth_middleware))
/// }
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use super::jwt::{validate_session_token, JwtError, TokenSettings};
use crate::models::user::User;

/// Authenticated caller, available to handlers via `Extension<AuthContext>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Local user ID
    pub user_id: Uuid,

    /// Identity-provider subject
    pub subject: String,

    pub email: String,
}

impl AuthContext {
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            subject: user.auth_subject.clone(),
            email: user.email.clone(),
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Authorization header isn't a bearer token
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// User lookup failed
    DatabaseError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials".to_string())
            }
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => {
                (StatusCode::UNAUTHORIZED, msg)
            }
            AuthError::DatabaseError(msg) => {
                error!(error = %msg, "Failed to resolve authenticated user");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let error = if status == StatusCode::UNAUTHORIZED {
            "unauthorized"
        } else {
            "internal_error"
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// State for [`session_auth_middleware`]
#[derive(Clone)]
pub struct SessionAuth {
    pub pool: PgPool,
    pub settings: Arc<TokenSettings>,
}

impl SessionAuth {
    pub fn new(pool: PgPool, settings: TokenSettings) -> Self {
        Self {
            pool,
            settings: Arc::new(settings),
        }
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Session authentication middleware
///
/// # Errors
///
/// 401 if the header is missing or malformed, or the token fails
/// validation; 500 if the user can't be loaded or created.
pub async fn session_auth_middleware(
    State(auth): State<SessionAuth>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;

    let claims = validate_session_token(token, &auth.settings).map_err(|e| {
        warn!(error = %e, "Rejected session token");
        match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            JwtError::InvalidAudience => AuthError::InvalidToken("Invalid audience".to_string()),
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        }
    })?;

    let user = User::find_or_create(&auth.pool, claims.profile())
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    req.extensions_mut().insert(AuthContext::from_user(&user));

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AuthError::MissingCredentials)));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat(_))));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AuthError::InvalidFormat(_))));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_auth_context_from_user() {
        let user = User {
            id: Uuid::new_v4(),
            auth_subject: "auth0|ada".to_string(),
            email: "ada@example.com".to_string(),
            name: None,
            avatar_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let context = AuthContext::from_user(&user);
        assert_eq!(context.user_id, user.id);
        assert_eq!(context.subject, "auth0|ada");
        assert_eq!(context.email, "ada@example.com");
    }

    #[test]
    fn test_auth_error_into_response() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidToken("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::DatabaseError("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
