/// Authorization helpers and permission checks
///
/// Every organization-scoped operation starts with [`require_role`], which
/// looks up the caller's membership and returns their role. The remaining
/// checks are pure functions over roles and IDs, so the member-management
/// rules can be tested without a database.
///
/// # Permission Model
///
/// 1. **Membership**: the caller must belong to the organization
/// 2. **Role**: Owner > Admin > Member > Viewer
/// 3. **Resource**: projects may also be edited by their creator
/// 4. **Team rules**: no acting on yourself, on someone who outranks you,
///    or granting a role above your own; the last owner stays an owner
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::auth::authorization::{check_member_change, require_role};
/// use teamboard_shared::models::membership::{Membership, MembershipRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, org_id: Uuid, actor: Uuid, target: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let actor_role = require_role(&pool, org_id, actor, MembershipRole::Admin).await?;
///
/// if let Some(target_role) = Membership::get_role(&pool, org_id, target).await? {
///     check_member_change(actor, actor_role, target, target_role, Some(MembershipRole::Member))?;
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::membership::{Membership, MembershipRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User is not a member of the organization
    #[error("Not a member of organization {0}")]
    NotMember(Uuid),

    /// User doesn't have required role
    #[error("Insufficient permissions: requires {required}, has {actual}")]
    InsufficientRole {
        required: MembershipRole,
        actual: MembershipRole,
    },

    /// Neither the resource's creator nor an admin
    #[error("Not authorized to modify this resource")]
    NotAuthorized,

    /// Acting on your own membership
    #[error("You cannot {0} yourself")]
    SelfTarget(&'static str),

    /// Target member has a higher role than the actor
    #[error("Cannot modify a member with a higher role than yours")]
    OutrankedTarget,

    /// Granting a role above the actor's own
    #[error("Cannot grant the {0} role")]
    RoleTooHigh(MembershipRole),

    /// Would leave the organization without an owner
    #[error("The organization must keep at least one owner")]
    LastOwner,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Checks that a user holds at least `required_role` in an organization
///
/// # Returns
///
/// The user's actual role, for follow-up checks
///
/// # Errors
///
/// - `NotMember` if the user doesn't belong to the organization
/// - `InsufficientRole` if their role is too low
pub async fn require_role(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
    required_role: MembershipRole,
) -> Result<MembershipRole, AuthzError> {
    let user_role = Membership::get_role(pool, organization_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(organization_id))?;

    if !user_role.has_permission(&required_role) {
        return Err(AuthzError::InsufficientRole {
            required: required_role,
            actual: user_role,
        });
    }

    Ok(user_role)
}

/// Any role; read access
pub async fn require_membership(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<MembershipRole, AuthzError> {
    require_role(pool, organization_id, user_id, MembershipRole::Viewer).await
}

/// Member or above; creating and editing projects and tasks
pub async fn require_write(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
) -> Result<MembershipRole, AuthzError> {
    require_role(pool, organization_id, user_id, MembershipRole::Member).await
}

/// Projects can be changed by their creator or by an admin
pub fn check_project_edit(
    actor_id: Uuid,
    actor_role: MembershipRole,
    created_by: Option<Uuid>,
) -> Result<(), AuthzError> {
    if created_by == Some(actor_id) || actor_role.has_permission(&MembershipRole::Admin) {
        return Ok(());
    }

    Err(AuthzError::NotAuthorized)
}

/// An actor may only hand out roles up to their own
pub fn check_grant(actor_role: MembershipRole, role: MembershipRole) -> Result<(), AuthzError> {
    if role.outranks(&actor_role) {
        return Err(AuthzError::RoleTooHigh(role));
    }

    Ok(())
}

/// Rules for changing another member's role (`new_role: Some`) or removing
/// them (`new_role: None`)
///
/// Does not cover the last-owner rule; see [`change_membership`].
pub fn check_member_change(
    actor_id: Uuid,
    actor_role: MembershipRole,
    target_id: Uuid,
    target_role: MembershipRole,
    new_role: Option<MembershipRole>,
) -> Result<(), AuthzError> {
    if actor_id == target_id {
        return Err(AuthzError::SelfTarget(match new_role {
            Some(_) => "change the role of",
            None => "remove",
        }));
    }

    if !actor_role.can_manage_members() {
        return Err(AuthzError::InsufficientRole {
            required: MembershipRole::Admin,
            actual: actor_role,
        });
    }

    if target_role.outranks(&actor_role) {
        return Err(AuthzError::OutrankedTarget);
    }

    if let Some(role) = new_role {
        check_grant(actor_role, role)?;
    }

    Ok(())
}

/// Refuses to demote or remove the only owner
///
/// `new_role: None` means the membership goes away (removal or leaving).
pub fn check_last_owner(
    current_role: MembershipRole,
    new_role: Option<MembershipRole>,
    owner_count: usize,
) -> Result<(), AuthzError> {
    let loses_owner = current_role == MembershipRole::Owner && new_role != Some(MembershipRole::Owner);

    if loses_owner && owner_count <= 1 {
        return Err(AuthzError::LastOwner);
    }

    Ok(())
}

/// Changes a member's role (`new_role: Some`) or removes them (`None`),
/// keeping at least one owner
///
/// The owner rows are locked before the check and released on commit, so
/// owners stepping down concurrently are applied one after the other.
///
/// # Returns
///
/// The member's previous role, or None if they weren't a member
///
/// # Errors
///
/// - `LastOwner` if the change would leave the organization without an owner
pub async fn change_membership(
    pool: &PgPool,
    organization_id: Uuid,
    user_id: Uuid,
    new_role: Option<MembershipRole>,
) -> Result<Option<MembershipRole>, AuthzError> {
    let mut tx = pool.begin().await?;

    let owners = Membership::lock_owners(&mut *tx, organization_id).await?;
    let Some(current) = Membership::get_role(&mut *tx, organization_id, user_id).await? else {
        return Ok(None);
    };

    check_last_owner(current, new_role, owners.len())?;

    match new_role {
        Some(role) => {
            Membership::update_role(&mut *tx, organization_id, user_id, role).await?;
        }
        None => {
            Membership::delete(&mut *tx, organization_id, user_id).await?;
        }
    }

    tx.commit().await?;

    Ok(Some(current))
}
