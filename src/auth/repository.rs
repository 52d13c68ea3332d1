// Credential store: persistence of user records

use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::{NewUser, User},
};

/// Persistent user-record storage
///
/// Every operation is independent; transactional discipline belongs to the
/// implementation.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Case-insensitive lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_google_sub(&self, google_sub: &str) -> Result<Option<User>, AuthError>;

    async fn link_google_sub(&self, id: Uuid, google_sub: &str) -> Result<Option<User>, AuthError>;

    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<User>, AuthError>;

    async fn update_avatar(&self, id: Uuid, avatar: Option<&str>) -> Result<Option<User>, AuthError>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AuthError>;

    /// Removes the user; owned rows go with it through foreign-key cascades
    async fn delete_user(&self, id: Uuid) -> Result<bool, AuthError>;
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, avatar, google_sub, created_at, updated_at";

/// Postgres-backed credential store
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new UserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for UserRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        // Unique violations on email become EmailAlreadyExists via From<sqlx::Error>
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, google_sub) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.google_sub)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_google_sub(&self, google_sub: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE google_sub = $1"
        ))
        .bind(google_sub)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn link_google_sub(&self, id: Uuid, google_sub: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET google_sub = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(google_sub)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_avatar(&self, id: Uuid, avatar: Option<&str>) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar = $1, updated_at = NOW() WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(avatar)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
