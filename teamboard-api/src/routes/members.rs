/// Team membership endpoints
///
/// # Endpoints
///
/// - `GET /v1/organizations/:org_id/members` - List members (viewer+)
/// - `POST /v1/organizations/:org_id/members` - Add a signed-up user by email (admin+)
/// - `PATCH /v1/organizations/:org_id/members/:user_id` - Change role (admin+)
/// - `DELETE /v1/organizations/:org_id/members/:user_id` - Remove member (admin+)
///
/// Mutations answer with `{ "success": true, "message": "..." }`.

use crate::{
    app::AppState,
    error::{ActionResponse, ApiError, ApiResult},
    routes::LISTING_CACHE_CONTROL,
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
        authorization::{
            change_membership, check_grant, check_member_change, require_membership, require_role,
        },
        middleware::AuthContext,
    },
    models::{
        membership::{MemberDetails, Membership, MembershipRole},
        user::User,
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

fn default_role() -> MembershipRole {
    MembershipRole::Member
}

/// Invite request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteMemberRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    /// Defaults to `member`
    #[serde(default = "default_role")]
    pub role: MembershipRole,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: MembershipRole,
}

/// Members response
#[derive(Debug, Serialize)]
pub struct ListMembersResponse {
    pub members: Vec<MemberDetails>,
}

async fn target_role(state: &AppState, org_id: Uuid, user_id: Uuid) -> ApiResult<MembershipRole> {
    Membership::get_role(&state.db, org_id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))
}

/// List members, in join order (viewer+)
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    let members = Membership::list_members(&state.db, org_id).await?;

    Ok((
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(ListMembersResponse { members }),
    ))
}

/// Add an existing user to the organization
///
/// There are no pending invitations: the invitee must have signed in at
/// least once so their user row exists.
///
/// # Endpoint
///
/// ```text
/// POST /v1/organizations/:org_id/members
/// Content-Type: application/json
///
/// { "email": "grace@example.com", "role": "member" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller below admin, or granting a role above their own
/// - `404 Not Found`: No user with that email
/// - `409 Conflict`: Already a member
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<InviteMemberRequest>,
) -> ApiResult<(StatusCode, Json<ActionResponse>)> {
    req.validate()?;

    let actor_role = require_role(&state.db, org_id, auth.user_id, MembershipRole::Admin).await?;
    check_grant(actor_role, req.role)?;

    let invitee = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("No user with this email has signed up".to_string()))?;

    if Membership::is_member(&state.db, org_id, invitee.id).await? {
        return Err(ApiError::Conflict(
            "User is already a member of this organization".to_string(),
        ));
    }

    Membership::create(&state.db, org_id, invitee.id, req.role).await?;

    info!(
        organization_id = %org_id,
        user_id = %invitee.id,
        role = %req.role,
        invited_by = %auth.user_id,
        "Member added"
    );

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::ok(format!(
            "{} added as {}",
            invitee.email,
            req.role.label()
        ))),
    ))
}

/// Change a member's role
///
/// # Errors
///
/// - `400 Bad Request`: Changing your own role
/// - `403 Forbidden`: Below admin, target outranks caller, or new role above caller's
/// - `404 Not Found`: Target is not a member
/// - `409 Conflict`: Demoting the last owner
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateMemberRoleRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let actor_role = require_role(&state.db, org_id, auth.user_id, MembershipRole::Admin).await?;
    let current = target_role(&state, org_id, user_id).await?;

    check_member_change(auth.user_id, actor_role, user_id, current, Some(req.role))?;

    let previous = change_membership(&state.db, org_id, user_id, Some(req.role))
        .await?
        .ok_or_else(|| ApiError::NotFound("Member not found".to_string()))?;

    info!(
        organization_id = %org_id,
        user_id = %user_id,
        from = %previous,
        to = %req.role,
        changed_by = %auth.user_id,
        "Member role changed"
    );

    Ok(Json(ActionResponse::ok(format!("Role changed to {}", req.role.label()))))
}

/// Remove a member
///
/// # Errors
///
/// - `400 Bad Request`: Removing yourself (use leave instead)
/// - `403 Forbidden`: Below admin or target outranks caller
/// - `404 Not Found`: Target is not a member
/// - `409 Conflict`: Removing the last owner
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((org_id, user_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<ActionResponse>> {
    let actor_role = require_role(&state.db, org_id, auth.user_id, MembershipRole::Admin).await?;
    let current = target_role(&state, org_id, user_id).await?;

    check_member_change(auth.user_id, actor_role, user_id, current, None)?;

    if change_membership(&state.db, org_id, user_id, None).await?.is_none() {
        return Err(ApiError::NotFound("Member not found".to_string()));
    }

    info!(organization_id = %org_id, user_id = %user_id, removed_by = %auth.user_id, "Member removed");

    Ok(Json(ActionResponse::ok("Member removed")))
}
