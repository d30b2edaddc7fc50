/// Session token validation
///
/// TeamBoard does not issue logins itself. The identity provider signs an
/// HS256 session token carrying the user's subject and profile; this module
/// checks the signature, expiry, issuer, and (when configured) audience,
/// and hands back the claims.
///
/// [`create_token`] signs tokens with the same shape. It is used by tests and
/// local development, where there is no provider in front of the API.
///
/// # Security
///
/// - **Algorithm**: HS256 only; tokens signed with anything else are rejected
/// - **Secret**: at least 32 bytes, shared with the identity provider
/// - **Validation**: signature, `exp`, `iss`, and `aud` if an audience is set
///
/// # Example
///
/// ```
/// use teamboard_shared::auth::jwt::{create_token, validate_session_token, SessionClaims, TokenSettings};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = TokenSettings {
///     secret: "a-very-long-secret-for-hs256-signing!".to_string(),
///     issuer: "https://auth.example.com/".to_string(),
///     audience: None,
/// };
///
/// let claims = SessionClaims::new("auth0|abc123", "ada@example.com", &settings.issuer, Duration::hours(1));
/// let token = create_token(&claims, &settings.secret)?;
///
/// let validated = validate_session_token(&token, &settings)?;
/// assert_eq!(validated.sub, "auth0|abc123");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::IdentityProfile;

/// Error type for session token operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format, or claim check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token was minted for another application
    #[error("Invalid audience")]
    InvalidAudience,
}

/// What a token must satisfy to be accepted
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Shared HS256 secret
    pub secret: String,

    /// Expected `iss` claim
    pub issuer: String,

    /// Expected `aud` claim, unchecked when None
    pub audience: Option<String>,
}

/// Claims carried by an identity-provider session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the provider's stable user identifier
    pub sub: String,

    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Avatar URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    pub iss: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Creates claims expiring `expires_in` from now
    ///
    /// A negative duration yields an already-expired token.
    pub fn new(subject: &str, email: &str, issuer: &str, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: subject.to_string(),
            email: email.to_string(),
            name: None,
            picture: None,
            iss: issuer.to_string(),
            aud: None,
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = Some(audience.to_string());
        self
    }

    /// Profile used to mirror the user locally
    pub fn profile(&self) -> IdentityProfile {
        IdentityProfile {
            subject: self.sub.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            picture: self.picture.clone(),
        }
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &SessionClaims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a session token and extracts its claims
///
/// # Errors
///
/// - `Expired` once `exp` has passed
/// - `InvalidIssuer` / `InvalidAudience` on a claim mismatch
/// - `ValidationError` for a bad signature, algorithm, or format
pub fn validate_session_token(token: &str, settings: &TokenSettings) -> Result<SessionClaims, JwtError> {
    let key = DecodingKey::from_secret(settings.secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[settings.issuer.as_str()]);
    validation.validate_exp = true;

    match &settings.audience {
        Some(audience) => validation.set_audience(&[audience.as_str()]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: settings.issuer.clone(),
        },
        ErrorKind::InvalidAudience => JwtError::InvalidAudience,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";
    const ISSUER: &str = "https://auth.test/";

    fn settings(audience: Option<&str>) -> TokenSettings {
        TokenSettings {
            secret: SECRET.to_string(),
            issuer: ISSUER.to_string(),
            audience: audience.map(str::to_string),
        }
    }

    fn claims() -> SessionClaims {
        SessionClaims::new("auth0|ada", "ada@example.com", ISSUER, Duration::hours(1))
    }

    #[test]
    fn test_create_and_validate_token() {
        let claims = claims().with_name("Ada Lovelace");
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_session_token(&token, &settings(None)).expect("Should validate token");
        assert_eq!(validated, claims);
        assert_eq!(validated.profile().display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&claims(), "another-secret-key-at-least-32-bytes").unwrap();

        let result = validate_session_token(&token, &settings(None));
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        let expired = SessionClaims::new("auth0|ada", "ada@example.com", ISSUER, Duration::seconds(-3600));
        let token = create_token(&expired, SECRET).unwrap();

        let result = validate_session_token(&token, &settings(None));
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let foreign = SessionClaims::new("auth0|ada", "ada@example.com", "https://evil.test/", Duration::hours(1));
        let token = create_token(&foreign, SECRET).unwrap();

        let result = validate_session_token(&token, &settings(None));
        assert!(matches!(result, Err(JwtError::InvalidIssuer { .. })));
    }

    #[test]
    fn test_audience_checked_when_configured() {
        let token = create_token(&claims().with_audience("teamboard"), SECRET).unwrap();
        assert!(validate_session_token(&token, &settings(Some("teamboard"))).is_ok());

        let result = validate_session_token(&token, &settings(Some("other-app")));
        assert!(matches!(result, Err(JwtError::InvalidAudience)));
    }

    #[test]
    fn test_audience_ignored_when_not_configured() {
        let token = create_token(&claims().with_audience("teamboard"), SECRET).unwrap();
        assert!(validate_session_token(&token, &settings(None)).is_ok());
    }

    #[test]
    fn test_garbage_token() {
        let result = validate_session_token("not.a.token", &settings(None));
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_profile_from_claims() {
        let profile = claims().profile();
        assert_eq!(profile.subject, "auth0|ada");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.display_name(), "ada");
    }
}
