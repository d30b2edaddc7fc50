/// Project endpoints
///
/// Projects always belong to the organization in the path; a project ID
/// from another organization is reported as not found.
///
/// # Endpoints
///
/// - `GET /v1/organizations/:org_id/projects` - List projects (viewer+)
/// - `POST /v1/organizations/:org_id/projects` - Create project (member+)
/// - `GET /v1/organizations/:org_id/projects/:project_id` - Get project (viewer+)
/// - `PATCH /v1/organizations/:org_id/projects/:project_id` - Update (creator or admin+)
/// - `DELETE /v1/organizations/:org_id/projects/:project_id` - Delete (creator or admin+)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, non_blank, DeleteResponse, LISTING_CACHE_CONTROL},
};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{
        authorization::{check_project_edit, require_membership, require_write},
        middleware::AuthContext,
    },
    models::project::{CreateProject, Project, ProjectSummary, UpdateProject},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,
}

/// Update project request
///
/// `description: null` or `""` clears the description.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

/// Projects response
#[derive(Debug, Serialize)]
pub struct ListProjectsResponse {
    pub projects: Vec<ProjectSummary>,
}

fn project_not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

/// List projects, newest first (viewer+)
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    let projects = Project::list_by_org(&state.db, org_id).await?;

    Ok((
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(ListProjectsResponse { projects }),
    ))
}

/// Create a project (member+)
///
/// # Endpoint
///
/// ```text
/// POST /v1/organizations/:org_id/projects
/// Content-Type: application/json
///
/// { "name": "Website relaunch", "description": "Q3 marketing site" }
/// ```
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    require_write(&state.db, org_id, auth.user_id).await?;

    let req = CreateProjectRequest {
        name: req.name.trim().to_string(),
        description: non_blank(req.description),
    };
    req.validate()?;

    let project = Project::create(
        &state.db,
        CreateProject {
            organization_id: org_id,
            name: req.name,
            description: req.description,
            created_by: auth.user_id,
        },
    )
    .await?;

    info!(organization_id = %org_id, project_id = %project.id, "Project created");

    Ok((StatusCode::CREATED, Json(project)))
}

/// Get a project with creator name and task count (viewer+)
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ProjectSummary>> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    let project = Project::find_summary(&state.db, org_id, project_id)
        .await?
        .ok_or_else(project_not_found)?;

    Ok(Json(project))
}

/// Update a project (creator or admin+)
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    let role = require_membership(&state.db, org_id, auth.user_id).await?;

    let project = Project::find_in_org(&state.db, org_id, project_id)
        .await?
        .ok_or_else(project_not_found)?;
    check_project_edit(auth.user_id, role, project.created_by)?;

    let req = UpdateProjectRequest {
        name: req.name.map(|n| n.trim().to_string()),
        description: req.description.map(non_blank),
    };
    req.validate()?;

    let update = UpdateProject {
        name: req.name,
        description: req.description,
    };
    if update.name.is_none() && update.description.is_none() {
        return Ok(Json(project));
    }

    let project = Project::update(&state.db, org_id, project_id, update)
        .await?
        .ok_or_else(project_not_found)?;

    Ok(Json(project))
}

/// Delete a project and its tasks (creator or admin+)
///
/// Deleting a project that isn't there succeeds with `deleted: false`.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DeleteResponse>> {
    let role = require_membership(&state.db, org_id, auth.user_id).await?;

    let Some(project) = Project::find_in_org(&state.db, org_id, project_id).await? else {
        return Ok(Json(DeleteResponse { deleted: false }));
    };
    check_project_edit(auth.user_id, role, project.created_by)?;

    let deleted = Project::delete(&state.db, org_id, project_id).await?;

    info!(organization_id = %org_id, project_id = %project_id, deleted, "Project deleted");

    Ok(Json(DeleteResponse { deleted }))
}
