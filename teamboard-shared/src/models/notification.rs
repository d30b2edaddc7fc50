/// Notification model and database operations
///
/// Notifications are per user. A user only ever reads or marks their own;
/// every query filters on `user_id`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     organization_id UUID REFERENCES organizations(id) ON DELETE CASCADE,
///     type VARCHAR(50) NOT NULL,
///     title VARCHAR(255) NOT NULL,
///     message TEXT NOT NULL,
///     link TEXT,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     metadata JSONB NOT NULL DEFAULT '{}',
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default number of notifications returned by a listing
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest listing a client may request
pub const MAX_LIMIT: i64 = 100;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, organization_id, type, title, message, link, created_by, metadata, is_read, created_at";

/// Kind of event a notification reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TaskAssigned,
    TaskCompleted,
    TaskUpdated,
    CommentAdded,
    Mention,
    ProjectCreated,
    MemberAdded,
}

impl NotificationType {
    pub const ALL: [NotificationType; 7] = [
        NotificationType::TaskAssigned,
        NotificationType::TaskCompleted,
        NotificationType::TaskUpdated,
        NotificationType::CommentAdded,
        NotificationType::Mention,
        NotificationType::ProjectCreated,
        NotificationType::MemberAdded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::TaskAssigned => "task_assigned",
            NotificationType::TaskCompleted => "task_completed",
            NotificationType::TaskUpdated => "task_updated",
            NotificationType::CommentAdded => "comment_added",
            NotificationType::Mention => "mention",
            NotificationType::ProjectCreated => "project_created",
            NotificationType::MemberAdded => "member_added",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown notification type: {0}")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownNotificationType(s.to_string()))
    }
}

impl TryFrom<String> for NotificationType {
    type Error = UnknownNotificationType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Notification row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,

    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub kind: NotificationType,

    pub title: String,
    pub message: String,

    /// In-app path the notification points at ("/tasks/<id>")
    pub link: Option<String>,

    pub created_by: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub organization_id: Option<Uuid>,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub created_by: Option<Uuid>,
    pub metadata: serde_json::Value,
}

/// Clamps a client-supplied listing limit to `1..=MAX_LIMIT`
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

impl Notification {
    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications
                (user_id, organization_id, type, title, message, link, created_by, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.organization_id)
        .bind(data.kind.as_str())
        .bind(data.title)
        .bind(data.message)
        .bind(data.link)
        .bind(data.created_by)
        .bind(data.metadata)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }

    /// A user's notifications, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Marks one of the user's notifications as read
    ///
    /// Marking an already-read notification succeeds again.
    ///
    /// # Returns
    ///
    /// The notification, or None if it doesn't exist or belongs to someone
    /// else
    pub async fn mark_read(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(notification)
    }

    /// Marks all of the user's notifications as read; returns how many changed
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_round_trips_through_str() {
        for kind in NotificationType::ALL {
            assert_eq!(kind.as_str().parse::<NotificationType>(), Ok(kind));
        }
        assert!("digest".parse::<NotificationType>().is_err());
        assert!(NotificationType::try_from("Mention".to_string()).is_err());
    }

    #[test]
    fn test_type_serializes_as_type_field() {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            organization_id: None,
            kind: NotificationType::TaskAssigned,
            title: "New task assigned".to_string(),
            message: "You were assigned to \"Ship it\"".to_string(),
            link: Some("/tasks/1".to_string()),
            created_by: None,
            metadata: serde_json::json!({}),
            is_read: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["type"], "task_assigned");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(20)), 20);
        assert_eq!(clamp_limit(Some(1000)), MAX_LIMIT);
    }
}
