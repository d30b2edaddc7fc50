/// Task model and database operations
///
/// Tasks live inside a project and carry a board position. A *column* is the
/// set of a project's tasks sharing one status, ordered by `position`. New
/// tasks and tasks whose status changes are appended to the end of their
/// column; drag-and-drop reordering goes through [`Task::apply_column_orders`].
///
/// Tasks have no organization column of their own, so every org-scoped query
/// joins through `projects`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'done');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     title VARCHAR(500) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     assigned_to UUID REFERENCES users(id) ON DELETE SET NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use crate::board::ColumnOrder;
use crate::listing::{Page, PageRequest, TaskFilter};

const TASK_COLUMNS: &str =
    "id, project_id, title, description, status, assigned_to, position, created_at, updated_at";

const DETAILS_SELECT: &str = r#"
    SELECT t.id, t.project_id, p.name AS project_name, t.title, t.description, t.status,
           t.assigned_to, u.name AS assigned_to_name, t.position, t.created_at, t.updated_at
    FROM tasks t
    JOIN projects p ON p.id = t.project_id
    LEFT JOIN users u ON u.id = t.assigned_to
"#;

/// Filter shared by the list and count queries
///
/// Unset filters bind NULL and drop out of the predicate.
const LIST_WHERE: &str = r#"
    WHERE p.organization_id = $1
      AND ($2::text[] IS NULL OR t.status::text = ANY($2))
      AND ($3::uuid IS NULL OR t.project_id = $3)
      AND ($4::uuid IS NULL OR t.assigned_to = $4)
      AND ($5::text IS NULL OR t.title ILIKE $5 ESCAPE '\' OR t.description ILIKE $5 ESCAPE '\')
"#;

/// Task status, one board column each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    /// All statuses in board order
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<Uuid>,

    /// Zero-based order inside the status column
    pub position: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task with project and assignee names, for listings and detail views
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskDetails {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_name: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<Uuid>,
    pub assigned_to_name: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Option<Uuid>,
}

/// Fields to change
///
/// `description: Some(None)` clears the description and
/// `assigned_to: Some(None)` unassigns the task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Option<Uuid>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
    }
}

impl Task {
    /// Creates a task at the end of its status column
    ///
    /// The caller is responsible for checking that the project belongs to
    /// the acting organization.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (project_id, title, description, status, assigned_to, position)
            SELECT $1, $2, $3, $4, $5, COALESCE(MAX(position) + 1, 0)
            FROM tasks
            WHERE project_id = $1 AND status = $4
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.project_id)
        .bind(data.title.trim())
        .bind(data.description)
        .bind(data.status)
        .bind(data.assigned_to)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task whose project belongs to the organization
    pub async fn find_in_org(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.project_id, t.title, t.description, t.status, t.assigned_to,
                   t.position, t.created_at, t.updated_at
            FROM tasks t
            JOIN projects p ON p.id = t.project_id
            WHERE t.id = $1 AND p.organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Same as [`Task::find_in_org`], with project and assignee names
    pub async fn find_details(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<TaskDetails>, sqlx::Error> {
        let query = format!("{DETAILS_SELECT} WHERE t.id = $1 AND p.organization_id = $2");

        let task = sqlx::query_as::<_, TaskDetails>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await?;

        Ok(task)
    }

    /// Lists an organization's tasks, newest first, one page at a time
    ///
    /// The total is counted first so an out-of-range page can be clamped
    /// before fetching rows.
    pub async fn list(
        pool: &PgPool,
        organization_id: Uuid,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> Result<Page<TaskDetails>, sqlx::Error> {
        let statuses = filter.status_names();
        let pattern = filter.search_pattern();

        let count_query = format!(
            "SELECT COUNT(*) FROM tasks t JOIN projects p ON p.id = t.project_id {LIST_WHERE}"
        );
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(organization_id)
            .bind(&statuses)
            .bind(filter.project_id)
            .bind(filter.assigned_to)
            .bind(&pattern)
            .fetch_one(pool)
            .await?;

        let info = page.resolve(u64::try_from(total).unwrap_or(0));

        let list_query = format!(
            "{DETAILS_SELECT} {LIST_WHERE} ORDER BY t.created_at DESC, t.id LIMIT $6 OFFSET $7"
        );
        let items = sqlx::query_as::<_, TaskDetails>(&list_query)
            .bind(organization_id)
            .bind(&statuses)
            .bind(filter.project_id)
            .bind(filter.assigned_to)
            .bind(&pattern)
            .bind(info.limit())
            .bind(info.offset())
            .fetch_all(pool)
            .await?;

        debug!(
            organization_id = %organization_id,
            total,
            page = info.current_page,
            filters = filter.active_filter_count(),
            "Listed tasks"
        );

        Ok(Page::new(items, info))
    }

    /// All tasks of a project, in board order (status, then position)
    pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS} FROM tasks
            WHERE project_id = $1
            ORDER BY status, position, created_at
            "#
        ))
        .bind(project_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Updates a task inside an organization
    ///
    /// Changing the status moves the task to the end of the new column;
    /// setting the status it already has leaves the position alone.
    ///
    /// # Returns
    ///
    /// The updated task, or None if it doesn't exist in that organization
    pub async fn update(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            // Right-hand `status` is the pre-update value.
            query.push_str(&format!(
                ", status = ${n}, position = CASE WHEN status = ${n} THEN position ELSE \
                 (SELECT COALESCE(MAX(c.position) + 1, 0) FROM tasks c \
                  WHERE c.project_id = tasks.project_id AND c.status = ${n}) END",
                n = bind_count
            ));
        }
        if data.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND project_id IN (SELECT id FROM projects WHERE organization_id = $2) \
             RETURNING {TASK_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(organization_id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Changes only the status (end of the new column)
    pub async fn update_status(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        Self::update(
            pool,
            organization_id,
            id,
            UpdateTask {
                status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes a task inside an organization; false if it wasn't there
    pub async fn delete(pool: &PgPool, organization_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1
              AND project_id IN (SELECT id FROM projects WHERE organization_id = $2)
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Persists new column orders for a project in one transaction
    ///
    /// Every task listed in a column gets that column's status and its index
    /// as position, so positions come out as 0..n. Tasks not in `project_id`
    /// are left untouched.
    pub async fn apply_column_orders(
        pool: &PgPool,
        project_id: Uuid,
        columns: &[ColumnOrder],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for column in columns {
            for (position, task_id) in column.task_ids.iter().enumerate() {
                let position = i32::try_from(position).unwrap_or(i32::MAX);

                sqlx::query(
                    r#"
                    UPDATE tasks
                    SET position = $3,
                        updated_at = CASE WHEN status = $2 THEN updated_at ELSE NOW() END,
                        status = $2
                    WHERE id = $1 AND project_id = $4
                    "#,
                )
                .bind(task_id)
                .bind(column.status)
                .bind(position)
                .bind(project_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        debug!(project_id = %project_id, columns = columns.len(), "Applied board order");
        Ok(())
    }
}
