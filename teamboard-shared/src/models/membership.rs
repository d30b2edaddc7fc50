/// Organization membership model and database operations
///
/// A membership links a user to an organization with a role. Exactly one row
/// exists per user/organization pair (composite primary key).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_role AS ENUM ('owner', 'admin', 'member', 'viewer');
///
/// CREATE TABLE organization_members (
///     organization_id UUID NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role membership_role NOT NULL DEFAULT 'member',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (organization_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: Full control, including deleting the organization
/// - **admin**: Manage members and organization settings
/// - **member**: Create and edit projects and tasks
/// - **viewer**: Read-only access
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::membership::{Membership, MembershipRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org_id: Uuid, user_id: Uuid) -> Result<(), sqlx::Error> {
/// Membership::create(&pool, org_id, user_id, MembershipRole::Member).await?;
///
/// if let Some(role) = Membership::get_role(&pool, org_id, user_id).await? {
///     println!("role: {}", role);
/// }
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres};
use std::fmt;
use uuid::Uuid;

/// Roles a user can hold inside an organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// Full control, including deleting the organization
    Owner,

    /// Manage members and organization settings
    Admin,

    /// Create and edit projects and tasks
    Member,

    /// Read-only access
    Viewer,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "owner",
            MembershipRole::Admin => "admin",
            MembershipRole::Member => "member",
            MembershipRole::Viewer => "viewer",
        }
    }

    /// Capitalized label ("Admin")
    pub fn label(&self) -> &'static str {
        match self {
            MembershipRole::Owner => "Owner",
            MembershipRole::Admin => "Admin",
            MembershipRole::Member => "Member",
            MembershipRole::Viewer => "Viewer",
        }
    }

    /// Can invite, remove, and re-role members
    pub fn can_manage_members(&self) -> bool {
        matches!(self, MembershipRole::Owner | MembershipRole::Admin)
    }

    /// Can delete the organization
    pub fn can_delete_organization(&self) -> bool {
        matches!(self, MembershipRole::Owner)
    }

    /// Checks if this role has at least the permission level of `required`
    ///
    /// Hierarchy: Owner > Admin > Member > Viewer
    pub fn has_permission(&self, required: &MembershipRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    /// Strictly higher in the hierarchy than `other`
    pub fn outranks(&self, other: &MembershipRole) -> bool {
        self.permission_level() > other.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            MembershipRole::Owner => 4,
            MembershipRole::Admin => 3,
            MembershipRole::Member => 2,
            MembershipRole::Viewer => 1,
        }
    }
}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

/// Membership joined with the member's user profile, for team listings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MemberDetails {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Adds a user to an organization
    ///
    /// # Errors
    ///
    /// Returns a database error on a duplicate membership
    /// (`organization_members_pkey`) or a missing user/organization.
    pub async fn create(
        pool: &PgPool,
        organization_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Self, sqlx::Error> {
        Self::create_with(pool, organization_id, user_id, role).await
    }

    /// Same as [`Membership::create`], on any executor (pool or transaction)
    pub async fn create_with<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Self, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO organization_members (organization_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING organization_id, user_id, role, joined_at
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_one(executor)
        .await?;

        Ok(membership)
    }

    /// Finds the membership of a user in an organization
    pub async fn find(
        pool: &PgPool,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT organization_id, user_id, role, joined_at
            FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Checks if a user belongs to an organization (any role)
    pub async fn is_member(
        pool: &PgPool,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM organization_members
                WHERE organization_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Gets a user's role in an organization, None if not a member
    pub async fn get_role<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MembershipRole>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let role: Option<MembershipRole> = sqlx::query_scalar(
            r#"
            SELECT role FROM organization_members
            WHERE organization_id = $1 AND user_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(role)
    }

    /// Changes a member's role
    ///
    /// # Returns
    ///
    /// The updated membership, or None if the membership doesn't exist
    pub async fn update_role<'e, E>(
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE organization_members
            SET role = $3
            WHERE organization_id = $1 AND user_id = $2
            RETURNING organization_id, user_id, role, joined_at
            "#,
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(executor)
        .await?;

        Ok(membership)
    }

    /// Removes a user from an organization
    ///
    /// # Returns
    ///
    /// True if a membership was deleted, false if there was none
    pub async fn delete<'e, E>(executor: E, organization_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM organization_members WHERE organization_id = $1 AND user_id = $2",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists members of an organization with their profiles, oldest first
    pub async fn list_members(pool: &PgPool, organization_id: Uuid) -> Result<Vec<MemberDetails>, sqlx::Error> {
        let members = sqlx::query_as::<_, MemberDetails>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, u.avatar_url, om.role, om.joined_at
            FROM organization_members om
            JOIN users u ON u.id = om.user_id
            WHERE om.organization_id = $1
            ORDER BY om.joined_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Counts members of an organization
    pub async fn count_members(pool: &PgPool, organization_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM organization_members WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Locks the owner rows of an organization and returns the owners' IDs
    ///
    /// Run inside a transaction: the rows stay locked until it ends, so a
    /// concurrent caller waits and then sees the owners that are left.
    pub async fn lock_owners<'e, E>(executor: E, organization_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let owners: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM organization_members
            WHERE organization_id = $1 AND role = 'owner'
            ORDER BY user_id
            FOR UPDATE
            "#,
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;

        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_role_as_str() {
        assert_eq!(MembershipRole::Owner.as_str(), "owner");
        assert_eq!(MembershipRole::Admin.as_str(), "admin");
        assert_eq!(MembershipRole::Member.as_str(), "member");
        assert_eq!(MembershipRole::Viewer.as_str(), "viewer");
    }

    #[test]
    fn test_role_label() {
        assert_eq!(MembershipRole::Admin.label(), "Admin");
        assert_eq!(MembershipRole::Member.label(), "Member");
        assert_eq!(MembershipRole::Viewer.label(), "Viewer");
    }

    #[test]
    fn test_role_permissions() {
        assert!(MembershipRole::Owner.can_manage_members());
        assert!(MembershipRole::Owner.can_delete_organization());

        assert!(MembershipRole::Admin.can_manage_members());
        assert!(!MembershipRole::Admin.can_delete_organization());

        assert!(!MembershipRole::Member.can_manage_members());

        assert!(!MembershipRole::Viewer.can_manage_members());
    }

    #[test]
    fn test_role_hierarchy() {
        assert!(MembershipRole::Owner.has_permission(&MembershipRole::Admin));
        assert!(MembershipRole::Admin.has_permission(&MembershipRole::Admin));
        assert!(!MembershipRole::Member.has_permission(&MembershipRole::Admin));
        assert!(MembershipRole::Viewer.has_permission(&MembershipRole::Viewer));

        assert!(MembershipRole::Owner.outranks(&MembershipRole::Admin));
        assert!(!MembershipRole::Admin.outranks(&MembershipRole::Admin));
        assert!(!MembershipRole::Viewer.outranks(&MembershipRole::Member));
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&MembershipRole::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let role: MembershipRole = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, MembershipRole::Viewer);
    }
}
