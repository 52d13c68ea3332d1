// Runtime configuration loaded from the environment

use std::path::PathBuf;
use thiserror::Error;

/// Default access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 900;

/// Default refresh token lifetime: 7 days
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 604_800;

/// Upper bound for either token lifetime: 10 years
pub const MAX_TTL_SECS: i64 = 315_360_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    /// OAuth client id that Google ID tokens must be issued for.
    /// Google login is rejected while this is unset.
    pub google_client_id: Option<String>,
    pub avatar_dir: PathBuf,
}

impl Config {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: "must not be empty".to_string(),
            });
        }

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 8080u16)?;

        let access_token_ttl_secs =
            parse_or("ACCESS_TOKEN_TTL_SECS", lookup("ACCESS_TOKEN_TTL_SECS"), DEFAULT_ACCESS_TTL_SECS)?;
        let refresh_token_ttl_secs =
            parse_or("REFRESH_TOKEN_TTL_SECS", lookup("REFRESH_TOKEN_TTL_SECS"), DEFAULT_REFRESH_TTL_SECS)?;

        if access_token_ttl_secs <= 0 || refresh_token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "ACCESS_TOKEN_TTL_SECS/REFRESH_TOKEN_TTL_SECS",
                reason: "token lifetimes must be positive".to_string(),
            });
        }
        if access_token_ttl_secs > MAX_TTL_SECS || refresh_token_ttl_secs > MAX_TTL_SECS {
            return Err(ConfigError::Invalid {
                name: "ACCESS_TOKEN_TTL_SECS/REFRESH_TOKEN_TTL_SECS",
                reason: format!("token lifetimes must not exceed {} seconds", MAX_TTL_SECS),
            });
        }
        if refresh_token_ttl_secs <= access_token_ttl_secs {
            return Err(ConfigError::Invalid {
                name: "REFRESH_TOKEN_TTL_SECS",
                reason: "must be longer than the access token lifetime".to_string(),
            });
        }

        let google_client_id = lookup("GOOGLE_CLIENT_ID").filter(|id| !id.trim().is_empty());
        let avatar_dir = lookup("AVATAR_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./media"));

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            google_client_id,
            avatar_dir,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}
