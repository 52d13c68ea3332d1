// Session gateway: probing, resolving, refreshing and ending sessions

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::{
    error::AuthError,
    models::User,
    repository::CredentialStore,
    token::{TokenPair, TokenService, TokenType},
};

/// Validate an access token and load the user it names
///
/// A token whose subject has since been deleted is an authentication failure.
pub async fn resolve_user(
    tokens: &TokenService,
    store: &dyn CredentialStore,
    access_token: &str,
) -> Result<User, AuthError> {
    let user_id = tokens.validate(access_token, TokenType::Access)?;

    store.find_by_id(user_id).await?.ok_or_else(|| {
        debug!("Token subject {} no longer exists", user_id);
        AuthError::UserNotFound
    })
}

/// Stateless session operations
pub struct SessionGateway {
    tokens: Arc<TokenService>,
    store: Arc<dyn CredentialStore>,
}

impl SessionGateway {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn CredentialStore>) -> Self {
        Self { tokens, store }
    }

    /// Confirms the access token is live. Does not touch the store.
    pub fn check_session(&self, access_token: &str) -> Result<Uuid, AuthError> {
        self.tokens.validate(access_token, TokenType::Access)
    }

    pub async fn get_current_user(&self, access_token: &str) -> Result<User, AuthError> {
        resolve_user(&self.tokens, self.store.as_ref(), access_token).await
    }

    /// Exchange a refresh token for a new pair
    ///
    /// Input that is not even shaped like a token is `MalformedToken`; a
    /// well-formed token that fails validation keeps its validation error.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        if !TokenService::is_well_formed(refresh_token.trim()) {
            return Err(AuthError::MalformedToken);
        }

        let pair = self.tokens.refresh(refresh_token.trim())?;
        debug!("Refreshed token pair");
        Ok(pair)
    }

    /// Acknowledge a logout
    ///
    /// Tokens are self-contained, so there is nothing to revoke: the token is
    /// validated and the client is expected to discard it.
    pub fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let user_id = self.tokens.validate(access_token, TokenType::Access)?;
        info!("User {} logged out", user_id);
        Ok(())
    }
}
