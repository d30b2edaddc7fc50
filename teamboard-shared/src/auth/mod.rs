/// Authentication and authorization
///
/// # Modules
///
/// - [`jwt`]: Identity-provider session token validation (HS256)
/// - [`middleware`]: Axum middleware that turns a bearer token into an
///   [`middleware::AuthContext`]
/// - [`authorization`]: Role checks and team-management rules
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::auth::authorization::require_write;
/// use teamboard_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, auth: AuthContext, org_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let role = require_write(&pool, org_id, auth.user_id).await?;
/// println!("acting as {}", role);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
