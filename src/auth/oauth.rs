// External identity verification (Google Sign-In)

use axum::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::error::AuthError;

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Identity asserted by an external provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Provider-scoped subject id
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

/// Verifies a provider-issued token and returns the identity it asserts
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity, AuthError>;
}

/// Claims returned by Google's tokeninfo endpoint. Every value arrives as a string.
#[derive(Debug, Deserialize)]
pub struct GoogleTokenInfo {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<String>,
    pub name: Option<String>,
    pub exp: String,
}

impl GoogleTokenInfo {
    /// Check the claims against our client id and the current time
    pub fn into_identity(self, client_id: &str, now: i64) -> Result<ExternalIdentity, AuthError> {
        if !GOOGLE_ISSUERS.contains(&self.iss.as_str()) {
            return Err(AuthError::OAuthRejected(format!("unexpected issuer {}", self.iss)));
        }
        if self.aud != client_id {
            return Err(AuthError::OAuthRejected("token was issued for another client".to_string()));
        }

        let exp: i64 = self
            .exp
            .parse()
            .map_err(|_| AuthError::OAuthRejected("unreadable expiry".to_string()))?;
        if now >= exp {
            return Err(AuthError::OAuthRejected("token has expired".to_string()));
        }

        let email = self
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AuthError::OAuthRejected("token carries no email".to_string()))?;
        if self.email_verified.as_deref() != Some("true") {
            return Err(AuthError::OAuthRejected("email is not verified".to_string()));
        }

        Ok(ExternalIdentity {
            subject: self.sub,
            email,
            name: self.name.filter(|name| !name.trim().is_empty()),
        })
    }
}

/// Google ID token verification through the tokeninfo endpoint
pub struct GoogleIdentityProvider {
    client: reqwest::Client,
    client_id: Option<String>,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
        }
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    async fn verify(&self, id_token: &str) -> Result<ExternalIdentity, AuthError> {
        let client_id = self.client_id.as_deref().ok_or_else(|| {
            warn!("Google login attempted but GOOGLE_CLIENT_ID is not configured");
            AuthError::OAuthRejected("Google login is not enabled".to_string())
        })?;

        let response = self
            .client
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| AuthError::OAuthUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            debug!("Google rejected ID token with status {}", status);
            return Err(AuthError::OAuthRejected("invalid Google ID token".to_string()));
        }
        if !status.is_success() {
            return Err(AuthError::OAuthUnavailable(format!("tokeninfo returned {}", status)));
        }

        let info: GoogleTokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::OAuthUnavailable(e.to_string()))?;

        info.into_identity(client_id, Utc::now().timestamp())
    }
}
