/// Organization activity log
///
/// An append-only audit trail: rows are inserted with
/// [`ActivityLogEntry::record`] and read back newest first. Nothing updates
/// or deletes them; they go away only with their organization.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE activity_log (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     user_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     action_type VARCHAR(50) NOT NULL,
///     entity_type VARCHAR(50) NOT NULL,
///     entity_id UUID,
///     description TEXT NOT NULL,
///     metadata JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::listing::{Page, PageRequest};

/// Activity row joined with the acting user's name
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,

    /// Verb, e.g. "created" or "completed"
    pub action_type: String,

    /// Noun, e.g. "task" or "project"
    pub entity_type: String,

    pub entity_id: Option<Uuid>,
    pub description: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    pub organization_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub description: String,
    pub metadata: serde_json::Value,
}

impl ActivityLogEntry {
    /// Appends an entry and returns its ID
    pub async fn record(pool: &PgPool, entry: NewActivity) -> Result<Uuid, sqlx::Error> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO activity_log
                (organization_id, user_id, action_type, entity_type, entity_id, description, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.organization_id)
        .bind(entry.user_id)
        .bind(entry.action_type)
        .bind(entry.entity_type)
        .bind(entry.entity_id)
        .bind(entry.description)
        .bind(entry.metadata)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    /// One page of an organization's activity, newest first
    pub async fn list_by_org(
        pool: &PgPool,
        organization_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_log WHERE organization_id = $1")
            .bind(organization_id)
            .fetch_one(pool)
            .await?;

        let info = page.resolve(u64::try_from(total).unwrap_or(0));

        let items = sqlx::query_as::<_, ActivityLogEntry>(
            r#"
            SELECT a.id, a.organization_id, a.user_id, u.name AS user_name, a.action_type,
                   a.entity_type, a.entity_id, a.description, a.metadata, a.created_at
            FROM activity_log a
            LEFT JOIN users u ON u.id = a.user_id
            WHERE a.organization_id = $1
            ORDER BY a.created_at DESC, a.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(organization_id)
        .bind(info.limit())
        .bind(info.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(items, info))
    }
}
