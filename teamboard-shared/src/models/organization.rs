/// Organization model and database operations
///
/// Organizations are the tenant boundary: projects, memberships,
/// notifications, and activity all hang off an organization and are removed
/// with it (`ON DELETE CASCADE`).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE organizations (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     slug VARCHAR(63) NOT NULL UNIQUE,
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::organization::{Organization, CreateOrganization};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let org = Organization::create_with_owner(&pool, CreateOrganization {
///     name: "Acme Corp".to_string(),
///     slug: "acme".to_string(),
/// }, user_id).await?;
/// println!("Created organization {}", org.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::membership::{Membership, MembershipRole};

const ORG_COLUMNS: &str = "id, name, slug, created_by, created_at, updated_at";

/// Longest accepted slug
pub const MAX_SLUG_LEN: usize = 63;

/// Organization (tenant)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Organization {
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// URL-safe unique identifier
    pub slug: String,

    /// User who created the organization (nullable if that user is deleted)
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organization as seen by one of its members
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberOrganization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,

    /// The viewing user's role
    pub role: MembershipRole,

    pub joined_at: DateTime<Utc>,
}

/// Input for creating an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
}

/// Input for updating organization settings; None fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub slug: Option<String>,
}

/// Checks that a slug is usable in URLs
///
/// Lowercase ASCII letters, digits, and hyphens; 2 to 63 characters; no
/// leading or trailing hyphen.
///
/// # Example
///
/// ```
/// use teamboard_shared::models::organization::is_valid_slug;
///
/// assert!(is_valid_slug("acme-corp"));
/// assert!(!is_valid_slug("Acme Corp"));
/// ```
pub fn is_valid_slug(slug: &str) -> bool {
    if slug.len() < 2 || slug.len() > MAX_SLUG_LEN {
        return false;
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return false;
    }

    slug.bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

impl Organization {
    /// Creates an organization and makes `owner_id` its owner
    ///
    /// Both rows are written in one transaction, so an organization never
    /// exists without an owner.
    ///
    /// # Errors
    ///
    /// Returns a database error if the slug is taken
    /// (`organizations_slug_key`) or the owner doesn't exist.
    pub async fn create_with_owner(
        pool: &PgPool,
        data: CreateOrganization,
        owner_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let org = sqlx::query_as::<_, Organization>(&format!(
            r#"
            INSERT INTO organizations (name, slug, created_by)
            VALUES ($1, $2, $3)
            RETURNING {ORG_COLUMNS}
            "#
        ))
        .bind(data.name.trim())
        .bind(&data.slug)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        Membership::create_with(&mut *tx, org.id, owner_id, MembershipRole::Owner).await?;

        tx.commit().await?;

        info!(organization_id = %org.id, slug = %org.slug, "Organization created");
        Ok(org)
    }

    /// Finds an organization by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let org = sqlx::query_as::<_, Organization>(&format!(
            "SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(org)
    }

    /// Updates name and/or slug
    ///
    /// # Returns
    ///
    /// The updated organization, or None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateOrganization,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE organizations SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.slug.is_some() {
            bind_count += 1;
            query.push_str(&format!(", slug = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {ORG_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Organization>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(slug) = data.slug {
            q = q.bind(slug);
        }

        let org = q.fetch_optional(pool).await?;

        Ok(org)
    }

    /// Deletes an organization and, by cascade, everything it owns
    ///
    /// # Returns
    ///
    /// True if the organization was deleted, false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the organizations a user belongs to, in join order
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<MemberOrganization>, sqlx::Error> {
        let orgs = sqlx::query_as::<_, MemberOrganization>(
            r#"
            SELECT o.id, o.name, o.slug, om.role, om.joined_at
            FROM organizations o
            JOIN organization_members om ON om.organization_id = o.id
            WHERE om.user_id = $1
            ORDER BY om.joined_at ASC, o.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(orgs)
    }
}
