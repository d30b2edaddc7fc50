/// Project model and database operations
///
/// Projects belong to exactly one organization. Every lookup takes the
/// organization ID as well as the project ID, so a project from another
/// tenant reads as "not found".
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project with its creator's name and task count, for listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub creator_name: Option<String>,
    pub task_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Fields to change; `description: Some(None)` clears it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.organization_id, p.name, p.description, p.created_by,
           u.name AS creator_name,
           (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count,
           p.created_at, p.updated_at
    FROM projects p
    LEFT JOIN users u ON u.id = p.created_by
"#;

impl Project {
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (organization_id, name, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, name, description, created_by, created_at, updated_at
            "#,
        )
        .bind(data.organization_id)
        .bind(data.name.trim())
        .bind(data.description)
        .bind(data.created_by)
        .fetch_one(pool)
        .await?;

        Ok(project)
    }

    /// Finds a project inside an organization
    pub async fn find_in_org(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, organization_id, name, description, created_by, created_at, updated_at
            FROM projects
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Same as [`Project::find_in_org`], with creator name and task count
    pub async fn find_summary(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ProjectSummary>, sqlx::Error> {
        let query = format!("{SUMMARY_SELECT} WHERE p.id = $1 AND p.organization_id = $2");

        let project = sqlx::query_as::<_, ProjectSummary>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await?;

        Ok(project)
    }

    /// Lists an organization's projects, newest first
    pub async fn list_by_org(pool: &PgPool, organization_id: Uuid) -> Result<Vec<ProjectSummary>, sqlx::Error> {
        let query = format!("{SUMMARY_SELECT} WHERE p.organization_id = $1 ORDER BY p.created_at DESC");

        let projects = sqlx::query_as::<_, ProjectSummary>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await?;

        Ok(projects)
    }

    /// Updates a project inside an organization
    ///
    /// # Returns
    ///
    /// The updated project, or None if it doesn't exist in that organization
    pub async fn update(
        pool: &PgPool,
        organization_id: Uuid,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND organization_id = $2 \
             RETURNING id, organization_id, name, description, created_by, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(organization_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }

        let project = q.fetch_optional(pool).await?;

        Ok(project)
    }

    /// Deletes a project (and its tasks) inside an organization
    ///
    /// Deleting an absent project is not an error; it returns false.
    pub async fn delete(pool: &PgPool, organization_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
