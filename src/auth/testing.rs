// In-memory collaborators for unit and HTTP tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use axum::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{
    avatar::AvatarStorage,
    error::AuthError,
    models::{NewUser, User},
    oauth::{ExternalIdentity, IdentityProvider},
    repository::CredentialStore,
};

/// Base64 of a PNG signature followed by `tail`
pub fn png_base64(tail: &[u8]) -> String {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(tail);
    STANDARD.encode(bytes)
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryCredentialStore {
    fn modify<F>(&self, id: Uuid, apply: F) -> Option<User>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.users.lock().unwrap();
        users.get_mut(&id).map(|user| {
            apply(user);
            user.updated_at = Utc::now();
            user.clone()
        })
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, AuthError> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email.to_lowercase() == new_user.email.to_lowercase())
        {
            return Err(AuthError::EmailAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            avatar: None,
            google_sub: new_user.google_sub,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn find_by_google_sub(&self, google_sub: &str) -> Result<Option<User>, AuthError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.google_sub.as_deref() == Some(google_sub))
            .cloned())
    }

    async fn link_google_sub(&self, id: Uuid, google_sub: &str) -> Result<Option<User>, AuthError> {
        Ok(self.modify(id, |u| u.google_sub = Some(google_sub.to_string())))
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<Option<User>, AuthError> {
        Ok(self.modify(id, |u| u.name = name.to_string()))
    }

    async fn update_avatar(&self, id: Uuid, avatar: Option<&str>) -> Result<Option<User>, AuthError> {
        Ok(self.modify(id, |u| u.avatar = avatar.map(str::to_string)))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<bool, AuthError> {
        Ok(self
            .modify(id, |u| u.password_hash = Some(password_hash.to_string()))
            .is_some())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AuthError> {
        Ok(self.users.lock().unwrap().remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryAvatarStorage {
    keys: Mutex<HashSet<String>>,
}

impl InMemoryAvatarStorage {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.lock().unwrap().contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }
}

#[async_trait]
impl AvatarStorage for InMemoryAvatarStorage {
    async fn put(&self, key: &str, _bytes: &[u8]) -> Result<(), AuthError> {
        self.keys.lock().unwrap().insert(key.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AuthError> {
        self.keys.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Accepts tokens registered up front, rejects everything else
#[derive(Default)]
pub struct StubIdentityProvider {
    identities: Mutex<HashMap<String, ExternalIdentity>>,
}

impl StubIdentityProvider {
    pub fn with_identity(self, id_token: &str, identity: ExternalIdentity) -> Self {
        self.identities
            .lock()
            .unwrap()
            .insert(id_token.to_string(), identity);
        self
    }
}

#[async_trait]
impl IdentityProvider for StubIdentityProvider {
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity, AuthError> {
        self.identities
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or_else(|| AuthError::OAuthRejected("unknown test token".to_string()))
    }
}
