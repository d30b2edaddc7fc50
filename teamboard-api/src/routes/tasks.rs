/// Task and board endpoints
///
/// # Endpoints
///
/// - `GET /v1/organizations/:org_id/tasks` - Filtered, searched, paginated list (viewer+)
/// - `POST /v1/organizations/:org_id/tasks` - Create task (member+)
/// - `GET /v1/organizations/:org_id/tasks/:task_id` - Get task (viewer+)
/// - `PATCH /v1/organizations/:org_id/tasks/:task_id` - Update task (member+)
/// - `PATCH /v1/organizations/:org_id/tasks/:task_id/status` - Change status (member+)
/// - `DELETE /v1/organizations/:org_id/tasks/:task_id` - Delete task (member+)
/// - `GET /v1/organizations/:org_id/projects/:project_id/board` - Board columns (viewer+)
/// - `POST /v1/organizations/:org_id/projects/:project_id/board/drop` - Drag-and-drop (member+)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{double_option, non_blank, DeleteResponse, LISTING_CACHE_CONTROL},
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{
        authorization::{require_membership, require_write},
        middleware::AuthContext,
    },
    board::{plan_drop, Board, DropPlan, DropTarget},
    listing::{Page, PageRequest, TaskFilter},
    models::{
        membership::Membership,
        project::Project,
        task::{CreateTask, Task, TaskDetails, TaskStatus, UpdateTask},
    },
};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Query string of the task list
///
/// ```text
/// GET /v1/organizations/:org_id/tasks?status=todo,in_progress&search=login&page=2&per_page=20
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Comma-separated statuses; empty means any
    pub status: Option<String>,
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,

    /// Case-insensitive substring of title or description
    pub search: Option<String>,

    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One page of tasks
#[derive(Debug, Serialize)]
pub struct ListTasksResponse {
    #[serde(flatten)]
    pub page: Page<TaskDetails>,

    /// Number of non-empty filters (status, project, assignee)
    pub active_filters: usize,
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,

    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: String,

    pub description: Option<String>,

    /// Defaults to `todo`
    pub status: Option<TaskStatus>,

    pub assigned_to: Option<Uuid>,
}

/// Update task request
///
/// Absent fields are left alone. `description: null` or `""` clears the
/// description; `assigned_to: null` unassigns.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 500, message = "Title must be 1-500 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,
}

/// Status change request
///
/// Kept as a string so an unknown status is a 400 rather than a body
/// rejection.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Drag-and-drop request
///
/// `over_id` is a task ID or a column ID such as `column-done`.
#[derive(Debug, Deserialize)]
pub struct DropRequest {
    pub active_id: Uuid,
    pub over_id: String,
}

/// Board response
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub project_id: Uuid,

    #[serde(flatten)]
    pub board: Board,
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

fn project_not_found() -> ApiError {
    ApiError::NotFound("Project not found".to_string())
}

/// Assignees must belong to the organization
async fn check_assignee(state: &AppState, org_id: Uuid, assignee: Option<Uuid>) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if !Membership::is_member(&state.db, org_id, user_id).await? {
            return Err(ApiError::invalid(
                "assigned_to",
                "Assignee must be a member of this organization",
            ));
        }
    }
    Ok(())
}

async fn load_board(state: &AppState, project_id: Uuid) -> ApiResult<Board> {
    let tasks = Task::list_for_project(&state.db, project_id).await?;
    Ok(Board::from_tasks(tasks))
}

/// List tasks (viewer+)
///
/// Newest first. `page` past the end is clamped to the last page.
///
/// # Response
///
/// ```json
/// {
///   "items": [ { "id": "uuid", "title": "Fix login", "status": "todo", "project_name": "Web", ... } ],
///   "current_page": 1,
///   "total_pages": 3,
///   "total_items": 27,
///   "items_per_page": 10,
///   "has_next_page": true,
///   "has_prev_page": false,
///   "active_filters": 1
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status in `status`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<impl IntoResponse> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    let filter = TaskFilter {
        project_id: query.project_id,
        assigned_to: query.assigned_to,
        ..Default::default()
    }
    .with_statuses(query.status.as_deref().unwrap_or_default())?
    .with_search(query.search.as_deref());

    let page = Task::list(
        &state.db,
        org_id,
        &filter,
        PageRequest::new(query.page, query.per_page),
    )
    .await?;

    Ok((
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(ListTasksResponse {
            page,
            active_filters: filter.active_filter_count(),
        }),
    ))
}

/// Create a task (member+)
///
/// The task goes to the end of its status column.
///
/// # Errors
///
/// - `404 Not Found`: Project not in this organization
/// - `422 Unprocessable Entity`: Bad title, assignee not a member
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    require_write(&state.db, org_id, auth.user_id).await?;

    let req = CreateTaskRequest {
        title: req.title.trim().to_string(),
        description: non_blank(req.description),
        ..req
    };
    req.validate()?;

    Project::find_in_org(&state.db, org_id, req.project_id)
        .await?
        .ok_or_else(project_not_found)?;
    check_assignee(&state, org_id, req.assigned_to).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            project_id: req.project_id,
            title: req.title,
            description: req.description,
            status: req.status.unwrap_or(TaskStatus::Todo),
            assigned_to: req.assigned_to,
        },
    )
    .await?;

    info!(organization_id = %org_id, task_id = %task.id, project_id = %task.project_id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Get a task with project and assignee names (viewer+)
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<TaskDetails>> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    let task = Task::find_details(&state.db, org_id, task_id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(task))
}

/// Update a task (member+)
///
/// # Errors
///
/// - `404 Not Found`: Task not in this organization
/// - `422 Unprocessable Entity`: Bad title, assignee not a member
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    require_write(&state.db, org_id, auth.user_id).await?;

    let req = UpdateTaskRequest {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description.map(non_blank),
        ..req
    };
    req.validate()?;

    if let Some(assignee) = req.assigned_to {
        check_assignee(&state, org_id, assignee).await?;
    }

    let update = UpdateTask {
        title: req.title,
        description: req.description,
        status: req.status,
        assigned_to: req.assigned_to,
    };

    let task = if update.is_empty() {
        Task::find_in_org(&state.db, org_id, task_id).await?
    } else {
        Task::update(&state.db, org_id, task_id, update).await?
    };

    Ok(Json(task.ok_or_else(task_not_found)?))
}

/// Change a task's status (member+)
///
/// Any status can follow any other. A change moves the task to the end of
/// the new column.
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status
/// - `404 Not Found`: Task not in this organization
pub async fn update_task_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, task_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Task>> {
    require_write(&state.db, org_id, auth.user_id).await?;

    let status: TaskStatus = req.status.parse()?;

    let task = Task::update_status(&state.db, org_id, task_id, status)
        .await?
        .ok_or_else(task_not_found)?;

    debug!(task_id = %task_id, status = %status, "Task status changed");

    Ok(Json(task))
}

/// Delete a task (member+); `deleted: false` if it was already gone
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, task_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<DeleteResponse>> {
    require_write(&state.db, org_id, auth.user_id).await?;

    let deleted = Task::delete(&state.db, org_id, task_id).await?;

    Ok(Json(DeleteResponse { deleted }))
}

/// A project's board: three columns ordered by position (viewer+)
///
/// # Response
///
/// ```json
/// { "project_id": "uuid", "todo": [...], "in_progress": [...], "done": [...] }
/// ```
pub async fn project_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<BoardResponse>> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    Project::find_in_org(&state.db, org_id, project_id)
        .await?
        .ok_or_else(project_not_found)?;

    let board = load_board(&state, project_id).await?;

    Ok(Json(BoardResponse { project_id, board }))
}

/// Drop a card on the board (member+)
///
/// Plans the move against the current board, persists the new order of the
/// affected columns in one transaction, and returns the updated board. A
/// drop that changes nothing returns the board as it is.
///
/// # Endpoint
///
/// ```text
/// POST /v1/organizations/:org_id/projects/:project_id/board/drop
/// Content-Type: application/json
///
/// { "active_id": "uuid", "over_id": "column-done" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `over_id` is neither a task ID nor a column ID
/// - `404 Not Found`: Project, or the dragged task, not found
pub async fn drop_on_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, project_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<DropRequest>,
) -> ApiResult<Json<BoardResponse>> {
    require_write(&state.db, org_id, auth.user_id).await?;

    Project::find_in_org(&state.db, org_id, project_id)
        .await?
        .ok_or_else(project_not_found)?;

    let target: DropTarget = req.over_id.parse()?;
    let board = load_board(&state, project_id).await?;

    let board = match plan_drop(&board.cards(), req.active_id, target)? {
        DropPlan::Unchanged => board,
        DropPlan::Move {
            task_id,
            status,
            columns,
        } => {
            Task::apply_column_orders(&state.db, project_id, &columns).await?;
            info!(project_id = %project_id, task_id = %task_id, status = %status, "Board card moved");
            load_board(&state, project_id).await?
        }
    };

    Ok(Json(BoardResponse { project_id, board }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query: ListTasksQuery = serde_json::from_str("{}").unwrap();
        assert!(query.status.is_none());
        assert!(query.page.is_none());
    }

    #[test]
    fn test_update_request_distinguishes_null() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"assigned_to": null}"#).unwrap();
        assert_eq!(req.assigned_to, Some(None));
        assert_eq!(req.description, None);

        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title": "New"}"#).unwrap();
        assert_eq!(req.assigned_to, None);
    }

    #[test]
    fn test_create_request_status() {
        let req: CreateTaskRequest = serde_json::from_str(&format!(
            r#"{{"project_id": "{}", "title": "Write docs", "status": "in_progress"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(req.status, Some(TaskStatus::InProgress));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_title_rejected() {
        let req = UpdateTaskRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_title_fits_the_column() {
        let longest = UpdateTaskRequest {
            title: Some("t".repeat(500)),
            ..Default::default()
        };
        assert!(longest.validate().is_ok());

        let too_long = UpdateTaskRequest {
            title: Some("t".repeat(501)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_unknown_status_is_bad_request() {
        let err: ApiError = "blocked".parse::<TaskStatus>().unwrap_err().into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_drop_target_from_body() {
        let req: DropRequest = serde_json::from_str(&format!(
            r#"{{"active_id": "{}", "over_id": "column-done"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();
        assert_eq!(
            req.over_id.parse::<DropTarget>().unwrap(),
            DropTarget::Column(TaskStatus::Done)
        );
    }
}
