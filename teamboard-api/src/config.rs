/// Configuration management for the API server
///
/// Configuration comes from environment variables, with a `.env` file loaded
/// first in development.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: any)
/// - `PRODUCTION`: `true` to enable production behavior (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `RUN_MIGRATIONS`: Apply pending migrations at startup (default: true)
/// - `AUTH_JWT_SECRET`: Identity-provider signing secret, >= 32 chars (required)
/// - `AUTH_ISSUER`: Expected token issuer (required)
/// - `AUTH_AUDIENCE`: Expected token audience (optional)
/// - `SENTRY_DSN`: Error reporting DSN (optional)
/// - `SENTRY_ENVIRONMENT`: Sentry environment tag (default: development/production)
/// - `LOG_FORMAT`: `json` for JSON logs (default: pretty)
/// - `RUST_LOG`: Log filter (default: teamboard_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use teamboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use teamboard_shared::auth::jwt::TokenSettings;

/// Shortest accepted signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub sentry: SentryConfig,
    pub log_format: LogFormat,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,

    /// Production mode (stricter CORS, secure cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,

    /// Apply pending migrations before serving
    pub run_migrations: bool,
}

/// Session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HS256 secret
    ///
    /// IMPORTANT: Must match the identity provider and be at least 32 bytes.
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    pub issuer: String,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            secret: self.jwt_secret.clone(),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        }
    }
}

/// Error reporting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentryConfig {
    /// Reporting is off when None
    pub dsn: Option<String>,
    pub environment: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got '{}'", key, other),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key/value source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| anyhow::anyhow!("API_PORT is invalid: {}", e))?;

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let production = match var("PRODUCTION") {
            Some(v) => parse_bool("PRODUCTION", &v)?,
            None => false,
        };

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS is invalid: {}", e))?;

        let run_migrations = match var("RUN_MIGRATIONS") {
            Some(v) => parse_bool("RUN_MIGRATIONS", &v)?,
            None => true,
        };

        let jwt_secret = var("AUTH_JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("AUTH_JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("AUTH_JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }

        let issuer = var("AUTH_ISSUER")
            .ok_or_else(|| anyhow::anyhow!("AUTH_ISSUER environment variable is required"))?;

        let environment = var("SENTRY_ENVIRONMENT").unwrap_or_else(|| {
            if production { "production" } else { "development" }.to_string()
        });

        let log_format = var("LOG_FORMAT").unwrap_or_default().parse()?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                run_migrations,
            },
            auth: AuthConfig {
                jwt_secret,
                issuer,
                audience: var("AUTH_AUDIENCE"),
            },
            sentry: SentryConfig {
                dsn: var("SENTRY_DSN"),
                environment,
            },
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgresql://localhost/teamboard"),
            ("AUTH_JWT_SECRET", SECRET),
            ("AUTH_ISSUER", "https://auth.test/"),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = load(&required()).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert!(config.api.cors_origins.is_empty());
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert!(config.auth.audience.is_none());
        assert!(config.sentry.dsn.is_none());
        assert_eq!(config.sentry.environment, "development");
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let mut vars = required();
        vars.extend([
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "3001"),
            ("CORS_ORIGINS", "https://app.example.com, http://localhost:3000,"),
            ("PRODUCTION", "true"),
            ("RUN_MIGRATIONS", "false"),
            ("AUTH_AUDIENCE", "teamboard"),
            ("SENTRY_DSN", "https://key@sentry.example.com/1"),
            ("LOG_FORMAT", "json"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:3001");
        assert_eq!(
            config.api.cors_origins,
            vec!["https://app.example.com", "http://localhost:3000"]
        );
        assert!(config.api.production);
        assert!(!config.database.run_migrations);
        assert_eq!(config.auth.token_settings().audience.as_deref(), Some("teamboard"));
        assert_eq!(config.sentry.environment, "production");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[("AUTH_JWT_SECRET", SECRET), ("AUTH_ISSUER", "x")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));

        let err = load(&[("DATABASE_URL", "postgresql://localhost/x"), ("AUTH_JWT_SECRET", SECRET)]).unwrap_err();
        assert!(err.to_string().contains("AUTH_ISSUER"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut vars = required();
        vars[1] = ("AUTH_JWT_SECRET", "too-short");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = required();
        vars.push(("API_PORT", "eighty"));
        assert!(load(&vars).is_err());

        let mut vars = required();
        vars.push(("PRODUCTION", "maybe"));
        assert!(load(&vars).is_err());

        let mut vars = required();
        vars.push(("LOG_FORMAT", "xml"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_secret_not_serialized() {
        let config = load(&required()).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["auth"].get("jwt_secret").is_none());
    }
}
