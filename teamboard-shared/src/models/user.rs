/// User model and database operations
///
/// Users are not registered here: the identity provider owns accounts, and a
/// local row is created the first time a subject shows up with a valid
/// session token. Users join organizations via the membership model.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     auth_subject VARCHAR(255) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     avatar_url TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, auth_subject, email, name, avatar_url, created_at, updated_at";

/// User model mirrored from the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Identity-provider subject (e.g. "auth0|64f1...")
    #[serde(skip_serializing)]
    pub auth_subject: String,

    /// Email address reported by the identity provider
    pub email: String,

    /// Display name
    pub name: Option<String>,

    /// Avatar/profile picture URL
    pub avatar_url: Option<String>,

    /// When the user was first seen
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// Identity attributes carried by a validated session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// Identity-provider subject
    pub subject: String,

    /// Email address
    pub email: String,

    /// Display name, if the provider knows one
    pub name: Option<String>,

    /// Avatar URL
    pub picture: Option<String>,
}

impl IdentityProfile {
    /// Name stored for a first-time user
    ///
    /// Falls back to the local part of the email, then to "User".
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        self.email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

impl User {
    /// Finds a user by identity-provider subject, creating it on first sight
    ///
    /// Existing rows are returned untouched; profile edits made locally are
    /// not overwritten by the provider's values.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn find_or_create(pool: &PgPool, profile: IdentityProfile) -> Result<Self, sqlx::Error> {
        if let Some(user) = Self::find_by_subject(pool, &profile.subject).await? {
            return Ok(user);
        }

        let name = profile.display_name();

        // A concurrent first request may have inserted the row already.
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (auth_subject, email, name, avatar_url)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (auth_subject) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&profile.subject)
        .bind(&profile.email)
        .bind(&name)
        .bind(&profile.picture)
        .fetch_optional(pool)
        .await?;

        match inserted {
            Some(user) => {
                info!(user_id = %user.id, "Created user from identity provider");
                Ok(user)
            }
            None => Self::find_by_subject(pool, &profile.subject)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Finds a user by identity-provider subject
    pub async fn find_by_subject(pool: &PgPool, subject: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE auth_subject = $1"
        ))
        .bind(subject)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address (case-insensitive)
    ///
    /// Used when inviting someone to an organization: the invitee must have
    /// signed in at least once.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use teamboard_shared::models::user::User;
    /// # use sqlx::PgPool;
    /// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
    /// if let Some(user) = User::find_by_email(&pool, "Ada@Example.com").await? {
    ///     println!("Found {}", user.id);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE LOWER(email) = LOWER($1)
            ORDER BY created_at ASC
            LIMIT 1
            "#
        ))
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates the user's display name
    ///
    /// # Returns
    ///
    /// The updated user, or None if the user doesn't exist
    pub async fn update_name(pool: &PgPool, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}
