/// Signed-in user endpoints
///
/// # Endpoints
///
/// - `GET /v1/me` - Current user (created on first request)
/// - `PATCH /v1/me` - Update display name

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use teamboard_shared::{auth::middleware::AuthContext, models::user::User};
use validator::Validate;

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// Get the current user
///
/// The session middleware has already found or created the user row, so a
/// miss here means the row vanished mid-request.
///
/// # Endpoint
///
/// ```text
/// GET /v1/me
/// Authorization: Bearer <session_token>
/// ```
///
/// # Response
///
/// ```json
/// {
///   "id": "uuid",
///   "email": "ada@example.com",
///   "name": "Ada",
///   "avatar_url": null,
///   "created_at": "2025-01-03T12:00:00Z",
///   "updated_at": "2025-01-03T12:00:00Z"
/// }
/// ```
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Update the current user's display name
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Name empty or longer than 255 characters
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let name = req.name.trim().to_string();
    UpdateProfileRequest { name: name.clone() }.validate()?;

    let user = User::update_name(&state.db, auth.user_id, &name)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_length() {
        assert!(UpdateProfileRequest { name: "Ada".to_string() }.validate().is_ok());
        assert!(UpdateProfileRequest { name: String::new() }.validate().is_err());
        assert!(UpdateProfileRequest { name: "x".repeat(256) }.validate().is_err());
    }
}
