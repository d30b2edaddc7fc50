/// Organization endpoints
///
/// The organization a user is working in is remembered in an HTTP-only
/// `current_org_id` cookie. The cookie is only a preference: every
/// organization-scoped route takes the organization from the path and
/// checks membership itself.
///
/// # Endpoints
///
/// - `GET /v1/organizations` - Organizations the user belongs to
/// - `POST /v1/organizations` - Create organization (caller becomes owner)
/// - `GET /v1/organizations/current` - Organization named by the cookie
/// - `GET /v1/organizations/:org_id` - Organization details (viewer+)
/// - `PATCH /v1/organizations/:org_id` - Update name/slug (admin+)
/// - `DELETE /v1/organizations/:org_id` - Delete organization (owner)
/// - `POST /v1/organizations/:org_id/switch` - Set the cookie
/// - `POST /v1/organizations/:org_id/leave` - Leave the organization

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, LISTING_CACHE_CONTROL},
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{
        authorization::{change_membership, require_membership, require_role, AuthzError},
        middleware::AuthContext,
    },
    models::{
        membership::{Membership, MembershipRole},
        organization::{
            is_valid_slug, CreateOrganization, MemberOrganization, Organization, UpdateOrganization,
        },
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Name of the current-organization cookie
pub const CURRENT_ORG_COOKIE: &str = "current_org_id";

/// One year, in seconds
const COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 365;

const SLUG_MESSAGE: &str =
    "Slug must be 2-63 lowercase letters, digits, or hyphens, not starting or ending with a hyphen";

/// `Set-Cookie` value remembering `org_id`
pub fn org_cookie(org_id: Uuid, secure: bool) -> String {
    let mut cookie = format!(
        "{CURRENT_ORG_COOKIE}={org_id}; Path=/; Max-Age={COOKIE_MAX_AGE}; HttpOnly; SameSite=Lax"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the cookie
pub fn clear_org_cookie(secure: bool) -> String {
    let mut cookie = format!("{CURRENT_ORG_COOKIE}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Reads the organization ID from the request cookies
///
/// A malformed value is treated as absent.
pub fn cookie_org_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CURRENT_ORG_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Create organization request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
}

/// Update organization request; empty fields are ignored
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    pub slug: Option<String>,
}

/// Organization with the caller's view of it
#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    #[serde(flatten)]
    pub organization: Organization,

    /// The caller's role
    pub role: MembershipRole,

    pub member_count: i64,
}

/// Organizations response
#[derive(Debug, Serialize)]
pub struct ListOrganizationsResponse {
    pub organizations: Vec<MemberOrganization>,
}

/// Response to leaving or deleting an organization
#[derive(Debug, Serialize)]
pub struct LeaveOrganizationResponse {
    pub success: bool,
    pub message: String,

    /// Organization the client should switch to, if the user has any left
    pub next_organization: Option<MemberOrganization>,
}

fn check_slug(slug: &str) -> ApiResult<()> {
    if !is_valid_slug(slug) {
        return Err(ApiError::invalid("slug", SLUG_MESSAGE));
    }
    Ok(())
}

async fn load_organization(state: &AppState, org_id: Uuid) -> ApiResult<Organization> {
    Organization::find_by_id(&state.db, org_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))
}

/// List the caller's organizations, in join order
pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<impl IntoResponse> {
    let organizations = Organization::list_for_user(&state.db, auth.user_id).await?;

    Ok((
        [(header::CACHE_CONTROL, LISTING_CACHE_CONTROL)],
        Json(ListOrganizationsResponse { organizations }),
    ))
}

/// Create an organization
///
/// # Endpoint
///
/// ```text
/// POST /v1/organizations
/// Authorization: Bearer <session_token>
/// Content-Type: application/json
///
/// { "name": "Acme Corp", "slug": "acme-corp" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Slug already taken
/// - `422 Unprocessable Entity`: Missing name, invalid slug
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOrganizationRequest>,
) -> ApiResult<(StatusCode, Json<Organization>)> {
    let req = CreateOrganizationRequest {
        name: req.name.trim().to_string(),
        slug: req.slug.trim().to_string(),
    };
    req.validate()?;
    check_slug(&req.slug)?;

    let org = Organization::create_with_owner(
        &state.db,
        CreateOrganization {
            name: req.name,
            slug: req.slug,
        },
        auth.user_id,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(org)))
}

/// Get an organization (viewer+)
pub async fn get_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<Json<OrganizationResponse>> {
    let role = require_membership(&state.db, org_id, auth.user_id).await?;
    let organization = load_organization(&state, org_id).await?;
    let member_count = Membership::count_members(&state.db, org_id).await?;

    Ok(Json(OrganizationResponse {
        organization,
        role,
        member_count,
    }))
}

/// Update organization settings (admin+)
///
/// Fields that are absent or blank are left unchanged.
///
/// # Errors
///
/// - `403 Forbidden`: Caller is below admin
/// - `409 Conflict`: New slug already taken
/// - `422 Unprocessable Entity`: Invalid slug
pub async fn update_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
    Json(req): Json<UpdateOrganizationRequest>,
) -> ApiResult<Json<Organization>> {
    require_role(&state.db, org_id, auth.user_id, MembershipRole::Admin).await?;
    req.validate()?;

    let update = UpdateOrganization {
        name: non_blank(req.name),
        slug: non_blank(req.slug),
    };
    if let Some(slug) = &update.slug {
        check_slug(slug)?;
    }

    if update.name.is_none() && update.slug.is_none() {
        return Ok(Json(load_organization(&state, org_id).await?));
    }

    let org = Organization::update(&state.db, org_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Organization not found".to_string()))?;

    info!(organization_id = %org_id, user_id = %auth.user_id, "Organization settings updated");

    Ok(Json(org))
}

/// Delete an organization (owner only)
///
/// Memberships, projects, tasks, notifications, and activity go with it.
/// Like leaving, the response names the organization to switch to and
/// resets the cookie.
pub async fn delete_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let role = require_membership(&state.db, org_id, auth.user_id).await?;
    if !role.can_delete_organization() {
        return Err(AuthzError::InsufficientRole {
            required: MembershipRole::Owner,
            actual: role,
        }
        .into());
    }

    if !Organization::delete(&state.db, org_id).await? {
        return Err(ApiError::NotFound("Organization not found".to_string()));
    }

    info!(organization_id = %org_id, user_id = %auth.user_id, "Organization deleted");

    let (next_organization, cookie) = next_organization(&state, auth.user_id).await?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LeaveOrganizationResponse {
            success: true,
            message: "Organization deleted".to_string(),
            next_organization,
        }),
    ))
}

/// Make an organization the current one
///
/// Sets `current_org_id` for a year. Requires membership.
pub async fn switch_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_membership(&state.db, org_id, auth.user_id).await?;
    let org = load_organization(&state, org_id).await?;

    let cookie = org_cookie(org.id, state.config.api.production);

    Ok(([(header::SET_COOKIE, cookie)], Json(org)))
}

/// The current organization
///
/// The cookie's organization while the user is still a member of it,
/// otherwise the first organization they joined.
///
/// # Errors
///
/// - `404 Not Found`: The user belongs to no organization
pub async fn current_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    headers: HeaderMap,
) -> ApiResult<Json<MemberOrganization>> {
    let remembered = cookie_org_id(&headers);
    let mut organizations = Organization::list_for_user(&state.db, auth.user_id).await?;

    let index = remembered
        .and_then(|id| organizations.iter().position(|org| org.id == id))
        .unwrap_or(0);

    if index >= organizations.len() {
        return Err(ApiError::NotFound("No organization found".to_string()));
    }

    Ok(Json(organizations.swap_remove(index)))
}

/// The user's first remaining organization and the `Set-Cookie` value
/// pointing at it (or clearing the cookie when none is left)
async fn next_organization(
    state: &AppState,
    user_id: Uuid,
) -> ApiResult<(Option<MemberOrganization>, String)> {
    let next = Organization::list_for_user(&state.db, user_id)
        .await?
        .into_iter()
        .next();

    let secure = state.config.api.production;
    let cookie = match &next {
        Some(org) => org_cookie(org.id, secure),
        None => clear_org_cookie(secure),
    };

    Ok((next, cookie))
}

/// Leave an organization
///
/// The response names the organization to switch to and resets the cookie
/// to it (or clears it when none is left).
///
/// # Errors
///
/// - `403 Forbidden`: Not a member
/// - `409 Conflict`: Caller is the last owner
pub async fn leave_organization(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(org_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    require_membership(&state.db, org_id, auth.user_id).await?;

    if change_membership(&state.db, org_id, auth.user_id, None).await?.is_none() {
        return Err(AuthzError::NotMember(org_id).into());
    }

    info!(organization_id = %org_id, user_id = %auth.user_id, "Member left organization");

    let (next_organization, cookie) = next_organization(&state, auth.user_id).await?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LeaveOrganizationResponse {
            success: true,
            message: "You left the organization".to_string(),
            next_organization,
        }),
    ))
}
