/// Notification endpoints
///
/// Users only ever see and change their own notifications. Reads are marked
/// uncacheable.
///
/// # Endpoints
///
/// - `GET /v1/notifications?limit=50` - Newest first (default 50, max 100)
/// - `GET /v1/notifications/unread-count` - Unread count
/// - `PATCH /v1/notifications/:id/read` - Mark one as read
/// - `PATCH /v1/notifications/mark-all-read` - Mark all as read

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::NO_STORE_CACHE_CONTROL,
};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::middleware::AuthContext,
    models::notification::{clamp_limit, Notification},
};
use uuid::Uuid;

/// Notification list query
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<i64>,
}

/// Notifications response
#[derive(Debug, Serialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,
}

/// Unread count response
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// Mark-all-read response
#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub success: bool,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListNotificationsQuery>,
) -> ApiResult<impl IntoResponse> {
    let notifications =
        Notification::list_for_user(&state.db, auth.user_id, clamp_limit(query.limit)).await?;

    Ok((
        [(header::CACHE_CONTROL, NO_STORE_CACHE_CONTROL)],
        Json(ListNotificationsResponse { notifications }),
    ))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    let count = Notification::unread_count(&state.db, auth.user_id).await?;

    Ok((
        [(header::CACHE_CONTROL, NO_STORE_CACHE_CONTROL)],
        Json(UnreadCountResponse { count }),
    ))
}

/// Mark a notification as read
///
/// Idempotent. Someone else's notification is reported as not found.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    let notification = Notification::mark_read(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    Ok(Json(notification))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let updated = Notification::mark_all_read(&state.db, auth.user_id).await?;

    tracing::debug!(user_id = %auth.user_id, updated, "Marked notifications read");

    Ok(Json(MarkAllReadResponse { success: true }))
}
