/// Activity log endpoint
///
/// - `GET /v1/organizations/:org_id/activity?page=1&per_page=10` - Newest first (viewer+)

use crate::{app::AppState, error::ApiResult, routes::LISTING_CACHE_CONTROL};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use teamboard_shared::{
    auth::{authorization::require_membership, middleware::AuthContext},
    listing::PageRequest,
    models::activity::ActivityLogEntry,
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<impl IntoResponse> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    let page = ActivityLogEntry::list_by_org(
        &state.db,
        org_id,
        PageRequest::new(query.page, query.per_page),
    )
    .await?;

    Ok(([(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)], Json(page)))
}
