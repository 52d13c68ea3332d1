// Authentication service - entry points that open a session

use std::sync::Arc;

use tracing::{debug, info, warn};
use validator::Validate;

use crate::auth::{
    error::AuthError,
    models::{AuthResponse, ChangePasswordRequest, Credentials, NewUser, RegisterRequest, User},
    oauth::{ExternalIdentity, IdentityProvider},
    password::PasswordService,
    repository::CredentialStore,
    session::resolve_user,
    token::TokenService,
};
use crate::validation::normalize_email;

/// Registration, login (password or Google) and password changes
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    identity_provider: Arc<dyn IdentityProvider>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            store,
            tokens,
            identity_provider,
        }
    }

    /// Register a new password account and open a session for it
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AuthError> {
        request.validate()?;
        PasswordService::validate_password_strength(&request.password)?;

        let email = normalize_email(&request.email);
        if self.store.find_by_email(&email).await?.is_some() {
            debug!("Registration with existing email {}", email);
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = PasswordService::hash_password(&request.password)?;
        let user = self
            .store
            .create_user(NewUser {
                name: request.name.trim().to_string(),
                email,
                password_hash: Some(password_hash),
                google_sub: None,
            })
            .await?;

        info!("Registered user {}", user.id);
        self.open_session(user)
    }

    /// Resolve credentials to a user and issue a token pair
    pub async fn login(&self, credentials: Credentials) -> Result<AuthResponse, AuthError> {
        let user = self.authenticate(credentials).await?;
        info!("User {} logged in", user.id);
        self.open_session(user)
    }

    /// Resolve either kind of credential to the stored user
    pub async fn authenticate(&self, credentials: Credentials) -> Result<User, AuthError> {
        match credentials {
            Credentials::Password { email, password } => {
                self.authenticate_password(&email, &password).await
            }
            Credentials::Google { id_token } => {
                let identity = self.identity_provider.verify(&id_token).await?;
                self.resolve_external(identity).await
            }
        }
    }

    async fn authenticate_password(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self
            .store
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // Accounts created through Google have no password to check
        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;

        if !PasswordService::verify_password(password, hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }

    /// Find the account for an external identity, linking or creating as needed
    async fn resolve_external(&self, identity: ExternalIdentity) -> Result<User, AuthError> {
        if let Some(user) = self.store.find_by_google_sub(&identity.subject).await? {
            return Ok(user);
        }

        let email = normalize_email(&identity.email);
        if let Some(existing) = self.store.find_by_email(&email).await? {
            if existing.google_sub.is_some() {
                warn!("Google login for user {} with a different Google subject", existing.id);
                return Err(AuthError::OAuthRejected(
                    "account is linked to another Google identity".to_string(),
                ));
            }
            let linked = self
                .store
                .link_google_sub(existing.id, &identity.subject)
                .await?
                .ok_or(AuthError::UserNotFound)?;
            info!("Linked Google account to user {}", linked.id);
            return Ok(linked);
        }

        let name = identity
            .name
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());
        let user = self
            .store
            .create_user(NewUser {
                name,
                email,
                password_hash: None,
                google_sub: Some(identity.subject),
            })
            .await?;

        info!("Created user {} from Google login", user.id);
        Ok(user)
    }

    /// Set a new password for the caller
    ///
    /// Accounts without a password may set one without supplying the old one.
    /// Tokens issued before the change stay valid.
    pub async fn change_password(
        &self,
        access_token: &str,
        request: ChangePasswordRequest,
    ) -> Result<(), AuthError> {
        let user = resolve_user(&self.tokens, self.store.as_ref(), access_token).await?;

        if let Some(current_hash) = user.password_hash.as_deref() {
            let old_password = request.old_password.as_deref().ok_or_else(|| {
                AuthError::ValidationError("old_password is required".to_string())
            })?;
            if !PasswordService::verify_password(old_password, current_hash)? {
                return Err(AuthError::IncorrectPassword);
            }
        }

        PasswordService::validate_password_strength(&request.new_password)?;
        let new_hash = PasswordService::hash_password(&request.new_password)?;

        if !self.store.update_password_hash(user.id, &new_hash).await? {
            return Err(AuthError::UserNotFound);
        }

        info!("Changed password for user {}", user.id);
        Ok(())
    }

    fn open_session(&self, user: User) -> Result<AuthResponse, AuthError> {
        let tokens = self.tokens.issue(user.id)?;
        Ok(AuthResponse::new(tokens, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::{InMemoryCredentialStore, StubIdentityProvider};
    use crate::auth::token::TokenType;

    fn google_identity(sub: &str, email: &str) -> ExternalIdentity {
        ExternalIdentity {
            subject: sub.to_string(),
            email: email.to_string(),
            name: None,
        }
    }

    fn setup(provider: StubIdentityProvider) -> (AuthService, Arc<InMemoryCredentialStore>, Arc<TokenService>) {
        let store = Arc::new(InMemoryCredentialStore::default());
        let tokens = Arc::new(TokenService::new("service_test_secret"));
        let service = AuthService::new(store.clone(), tokens.clone(), Arc::new(provider));
        (service, store, tokens)
    }

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Carla".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (service, _store, tokens) = setup(StubIdentityProvider::default());

        let registered = service
            .register(register_request("Carla@Example.com", "pass1234"))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "carla@example.com");
        assert!(registered.user.has_password);
        assert_eq!(
            tokens.validate(&registered.access, TokenType::Access).unwrap(),
            registered.user.id
        );

        let logged_in = service
            .login(Credentials::Password {
                email: "carla@example.com".to_string(),
                password: "pass1234".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates_and_weak_passwords() {
        let (service, store, _tokens) = setup(StubIdentityProvider::default());
        service.register(register_request("dup@example.com", "pass1234")).await.unwrap();

        assert!(matches!(
            service.register(register_request("DUP@example.com", "pass1234")).await,
            Err(AuthError::EmailAlreadyExists)
        ));
        assert!(matches!(
            service.register(register_request("weak@example.com", "short")).await,
            Err(AuthError::ValidationError(_))
        ));
        assert!(matches!(
            service.register(register_request("not-an-email", "pass1234")).await,
            Err(AuthError::ValidationError(_))
        ));
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _store, _tokens) = setup(StubIdentityProvider::default());
        service.register(register_request("dina@example.com", "pass1234")).await.unwrap();

        for (email, password) in [("dina@example.com", "wrongpass1"), ("nobody@example.com", "pass1234")] {
            let result = service
                .login(Credentials::Password {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        }
    }

    #[tokio::test]
    async fn test_google_login_creates_then_reuses_account() {
        let provider = StubIdentityProvider::default()
            .with_identity("google-token", google_identity("sub-1", "eva@example.com"));
        let (service, store, _tokens) = setup(provider);

        let first = service
            .login(Credentials::Google { id_token: "google-token".to_string() })
            .await
            .unwrap();
        assert_eq!(first.user.name, "eva");
        assert!(first.user.google_linked);
        assert!(!first.user.has_password);

        let second = service
            .login(Credentials::Google { id_token: "google-token".to_string() })
            .await
            .unwrap();
        assert_eq!(first.user.id, second.user.id);
        assert_eq!(store.count(), 1);

        // OAuth-only accounts cannot log in with a password
        assert!(matches!(
            service
                .login(Credentials::Password {
                    email: "eva@example.com".to_string(),
                    password: "anything1".to_string(),
                })
                .await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_google_login_links_existing_password_account() {
        let provider = StubIdentityProvider::default()
            .with_identity("google-token", google_identity("sub-2", "FABIO@example.com"));
        let (service, store, _tokens) = setup(provider);
        let registered = service
            .register(register_request("fabio@example.com", "pass1234"))
            .await
            .unwrap();

        let via_google = service
            .login(Credentials::Google { id_token: "google-token".to_string() })
            .await
            .unwrap();

        assert_eq!(via_google.user.id, registered.user.id);
        assert!(via_google.user.google_linked);
        assert!(via_google.user.has_password);
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_google_login_does_not_rebind_linked_account() {
        let provider = StubIdentityProvider::default()
            .with_identity("token-a", google_identity("sub-a", "gil@example.com"))
            .with_identity("token-b", google_identity("sub-b", "gil@example.com"));
        let (service, store, _tokens) = setup(provider);

        let original = service
            .login(Credentials::Google { id_token: "token-a".to_string() })
            .await
            .unwrap();

        assert!(matches!(
            service.login(Credentials::Google { id_token: "token-b".to_string() }).await,
            Err(AuthError::OAuthRejected(_))
        ));

        let stored = store.find_by_id(original.user.id).await.unwrap().unwrap();
        assert_eq!(stored.google_sub.as_deref(), Some("sub-a"));
        assert!(service
            .login(Credentials::Google { id_token: "token-a".to_string() })
            .await
            .is_ok());
        assert_eq!(store.count(), 1);
    }

    #[tokio::test]
    async fn test_google_login_rejects_unknown_token() {
        let (service, store, _tokens) = setup(StubIdentityProvider::default());
        assert!(matches!(
            service.login(Credentials::Google { id_token: "forged".to_string() }).await,
            Err(AuthError::OAuthRejected(_))
        ));
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_change_password() {
        let (service, _store, _tokens) = setup(StubIdentityProvider::default());
        let registered = service
            .register(register_request("gil@example.com", "pass1234"))
            .await
            .unwrap();

        let wrong_old = service
            .change_password(
                &registered.access,
                ChangePasswordRequest {
                    old_password: Some("nope12345".to_string()),
                    new_password: "newpass99".to_string(),
                },
            )
            .await;
        assert!(matches!(wrong_old, Err(AuthError::IncorrectPassword)));

        service
            .change_password(
                &registered.access,
                ChangePasswordRequest {
                    old_password: Some("pass1234".to_string()),
                    new_password: "newpass99".to_string(),
                },
            )
            .await
            .unwrap();

        let login = |password: &str| Credentials::Password {
            email: "gil@example.com".to_string(),
            password: password.to_string(),
        };
        assert!(service.login(login("newpass99")).await.is_ok());
        assert!(service.login(login("pass1234")).await.is_err());
    }

    #[tokio::test]
    async fn test_oauth_account_can_set_first_password() {
        let provider = StubIdentityProvider::default()
            .with_identity("google-token", google_identity("sub-3", "hana@example.com"));
        let (service, _store, _tokens) = setup(provider);
        let session = service
            .login(Credentials::Google { id_token: "google-token".to_string() })
            .await
            .unwrap();

        service
            .change_password(
                &session.access,
                ChangePasswordRequest {
                    old_password: None,
                    new_password: "firstpass1".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(service
            .login(Credentials::Password {
                email: "hana@example.com".to_string(),
                password: "firstpass1".to_string(),
            })
            .await
            .is_ok());
    }
}
