// Account data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::token::TokenPair;
use crate::validation::validate_not_blank;

/// User database model
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// None for accounts created through Google login
    pub password_hash: Option<String>,
    /// Storage key of the current avatar image
    pub avatar: Option<String>,
    /// Google account subject id, once linked
    pub google_sub: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_sub: Option<String>,
}

/// User response model (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "Maria Silva")]
    pub name: String,
    #[schema(example = "maria@example.com")]
    pub email: String,
    pub avatar: Option<String>,
    pub has_password: bool,
    pub google_linked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            avatar: user.avatar,
            has_password: user.password_hash.is_some(),
            google_linked: user.google_sub.is_some(),
            created_at: user.created_at,
        }
    }
}

/// Registration request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150), custom = "validate_not_blank")]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Login request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Google login request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GoogleLoginRequest {
    /// ID token obtained by the client from Google Sign-In
    #[validate(length(min = 1))]
    pub id_token: String,
}

/// Token refresh request DTO
///
/// A missing field deserializes to an empty string and is reported as a
/// malformed token rather than a body error.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

/// Partial profile update; any other field name is rejected
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 150), custom = "validate_not_blank")]
    pub name: Option<String>,
}

/// Avatar upload: base64 image bytes, optionally as a data URL
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AvatarRequest {
    #[serde(default)]
    pub image: String,
}

/// Password change request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    /// Required when the account already has a password
    pub old_password: Option<String>,
    pub new_password: String,
}

/// Authentication response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn new(tokens: TokenPair, user: User) -> Self {
        Self {
            access: tokens.access,
            refresh: tokens.refresh,
            user: user.into(),
        }
    }
}

/// Session probe response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub user_id: Uuid,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub detail: String,
}

impl MessageResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Credentials accepted by the authentication entry points
#[derive(Debug, Clone)]
pub enum Credentials {
    Password { email: String, password: String },
    Google { id_token: String },
}
