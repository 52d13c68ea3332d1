// Account mutation gateway: profile, avatar and account removal

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::auth::{
    avatar::{AvatarImage, AvatarStorage},
    error::AuthError,
    models::{UpdateProfileRequest, User},
    repository::CredentialStore,
    session::resolve_user,
    token::TokenService,
};

/// Authenticated mutations of the caller's own account
pub struct AccountGateway {
    tokens: Arc<TokenService>,
    store: Arc<dyn CredentialStore>,
    avatars: Arc<dyn AvatarStorage>,
}

impl AccountGateway {
    pub fn new(
        tokens: Arc<TokenService>,
        store: Arc<dyn CredentialStore>,
        avatars: Arc<dyn AvatarStorage>,
    ) -> Self {
        Self {
            tokens,
            store,
            avatars,
        }
    }

    /// Apply a partial profile update
    ///
    /// Field names are checked at deserialization; this validates the values.
    /// Nothing is written unless every supplied field is valid.
    pub async fn update_profile(
        &self,
        access_token: &str,
        changes: UpdateProfileRequest,
    ) -> Result<User, AuthError> {
        let user = resolve_user(&self.tokens, self.store.as_ref(), access_token).await?;
        changes.validate()?;

        let Some(name) = changes.name else {
            return Ok(user);
        };

        let updated = self
            .store
            .update_name(user.id, name.trim())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        info!("Updated profile for user {}", updated.id);
        Ok(updated)
    }

    /// Replace the caller's avatar with a new image
    pub async fn update_avatar(&self, access_token: &str, payload: &str) -> Result<User, AuthError> {
        let user = resolve_user(&self.tokens, self.store.as_ref(), access_token).await?;
        let image = AvatarImage::decode(payload)?;

        let key = image.storage_key(user.id);
        self.avatars.put(&key, &image.bytes).await?;

        let updated = match self.store.update_avatar(user.id, Some(&key)).await? {
            Some(updated) => updated,
            None => {
                // Account vanished mid-request; drop the orphaned object
                self.remove_avatar_quietly(&key).await;
                return Err(AuthError::UserNotFound);
            }
        };

        if let Some(previous) = user.avatar.as_deref().filter(|previous| *previous != key) {
            self.remove_avatar_quietly(previous).await;
        }

        info!("Updated avatar for user {}", updated.id);
        Ok(updated)
    }

    /// Irreversibly remove the caller's account
    pub async fn delete_account(&self, access_token: &str) -> Result<(), AuthError> {
        let user = resolve_user(&self.tokens, self.store.as_ref(), access_token).await?;

        if !self.store.delete_user(user.id).await? {
            return Err(AuthError::UserNotFound);
        }

        if let Some(avatar) = user.avatar.as_deref() {
            self.remove_avatar_quietly(avatar).await;
        }

        info!("Deleted account {}", user.id);
        Ok(())
    }

    async fn remove_avatar_quietly(&self, key: &str) {
        if let Err(e) = self.avatars.remove(key).await {
            warn!("Could not remove avatar {}: {}", key, e);
        }
    }
}
