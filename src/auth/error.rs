// Authentication error taxonomy

use thiserror::Error;

/// Internal authentication and account errors
///
/// Token failures stay distinguishable here (invalid vs expired vs wrong type);
/// the HTTP layer collapses them into 401/400 responses.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad signature or undecodable token
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    ExpiredToken,
    /// Refresh token presented where an access token was expected, or the reverse
    #[error("Wrong token type")]
    WrongTokenType,
    /// Not shaped like a token at all
    #[error("Malformed token")]
    MalformedToken,
    #[error("Missing authentication token")]
    MissingToken,
    /// Token subject no longer resolves to a stored user
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Current password is incorrect")]
    IncorrectPassword,
    #[error("{0}")]
    ValidationError(String),
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Email already exists")]
    EmailAlreadyExists,
    /// The Google identity is already bound to an account
    #[error("Google account already linked")]
    GoogleAccountAlreadyLinked,
    #[error("OAuth token rejected: {0}")]
    OAuthRejected(String),
    #[error("OAuth provider unavailable: {0}")]
    OAuthUnavailable(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Password hashing error")]
    PasswordHashError,
    #[error("Token generation error: {0}")]
    TokenGenerationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl AuthError {
    /// True for every failure that means "the caller is not authenticated"
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken
                | AuthError::ExpiredToken
                | AuthError::WrongTokenType
                | AuthError::MissingToken
                | AuthError::UserNotFound
                | AuthError::InvalidCredentials
                | AuthError::OAuthRejected(_)
        )
    }
}

/// Unique index on `LOWER(email)`
pub const EMAIL_UNIQUE_INDEX: &str = "users_email_lower_idx";

/// Unique constraint on `google_sub`
pub const GOOGLE_SUB_UNIQUE_KEY: &str = "users_google_sub_key";

impl AuthError {
    /// Map a unique violation to the conflict it represents
    fn from_unique_violation(constraint: Option<&str>, message: &str) -> Self {
        match constraint {
            Some(EMAIL_UNIQUE_INDEX) => AuthError::EmailAlreadyExists,
            Some(GOOGLE_SUB_UNIQUE_KEY) => AuthError::GoogleAccountAlreadyLinked,
            _ => AuthError::DatabaseError(message.to_string()),
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AuthError::from_unique_violation(db_err.constraint(), db_err.message());
            }
        }
        AuthError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::ValidationError(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violations_map_by_constraint() {
        assert!(matches!(
            AuthError::from_unique_violation(Some(EMAIL_UNIQUE_INDEX), "duplicate key"),
            AuthError::EmailAlreadyExists
        ));
        assert!(matches!(
            AuthError::from_unique_violation(Some(GOOGLE_SUB_UNIQUE_KEY), "duplicate key"),
            AuthError::GoogleAccountAlreadyLinked
        ));
        assert!(matches!(
            AuthError::from_unique_violation(Some("users_pkey"), "duplicate key"),
            AuthError::DatabaseError(_)
        ));
        assert!(matches!(
            AuthError::from_unique_violation(None, "duplicate key"),
            AuthError::DatabaseError(_)
        ));
    }

    #[test]
    fn test_conflicts_are_not_auth_failures() {
        assert!(!AuthError::EmailAlreadyExists.is_auth_failure());
        assert!(!AuthError::GoogleAccountAlreadyLinked.is_auth_failure());
        assert!(AuthError::UserNotFound.is_auth_failure());
    }
}
