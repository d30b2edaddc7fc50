/// Database models for TeamBoard
///
/// Each model owns its parameterized queries; handlers never build SQL.
///
/// # Models
///
/// - `user`: Users mirrored from the identity provider
/// - `organization`: Tenants (name + unique slug)
/// - `membership`: User-organization relationships with roles
/// - `project`: Projects inside an organization
/// - `task`: Tasks inside a project, with board position
/// - `notification`: Per-user notifications
/// - `activity`: Append-only organization audit trail
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::models::user::{User, IdentityProfile};
/// use teamboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::find_or_create(&pool, IdentityProfile {
///     subject: "auth0|abc123".to_string(),
///     email: "ada@example.com".to_string(),
///     name: Some("Ada".to_string()),
///     picture: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity;
pub mod membership;
pub mod notification;
pub mod organization;
pub mod project;
pub mod task;
pub mod user;
