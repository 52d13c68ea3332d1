// JWT token issuance, validation and refresh

use crate::auth::error::AuthError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS};

/// Which operation a token is allowed to authorize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,              // user_id
    pub token_type: TokenType,
    pub iat: i64,               // issued at timestamp
    pub exp: i64,               // expiration timestamp
    pub jti: Uuid,
}

/// Access + refresh token pair handed to clients
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Stateless token service
///
/// Validation is a pure function of the token, the secret and the current time;
/// nothing is stored server-side.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_duration: i64,  // in seconds
    refresh_token_duration: i64, // in seconds
}

impl TokenService {
    /// Create a new TokenService with the default lifetimes
    /// Access tokens expire in 15 minutes, refresh tokens in 7 days
    pub fn new(secret: &str) -> Self {
        Self::with_lifetimes(secret, DEFAULT_ACCESS_TTL_SECS, DEFAULT_REFRESH_TTL_SECS)
    }

    pub fn with_lifetimes(secret: &str, access_secs: i64, refresh_secs: i64) -> Self {
        // Expiry is checked against our own clock so the boundary is exact
        let mut validation = Validation::default();
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_duration: access_secs,
            refresh_token_duration: refresh_secs,
        }
    }

    pub fn access_token_duration(&self) -> i64 {
        self.access_token_duration
    }

    /// Issue a fresh access + refresh pair for a user
    pub fn issue(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    pub fn issue_at(&self, user_id: Uuid, now: i64) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.sign(user_id, TokenType::Access, now)?,
            refresh: self.sign(user_id, TokenType::Refresh, now)?,
        })
    }

    fn sign(&self, user_id: Uuid, token_type: TokenType, now: i64) -> Result<String, AuthError> {
        let lifetime = match token_type {
            TokenType::Access => self.access_token_duration,
            TokenType::Refresh => self.refresh_token_duration,
        };

        let exp = now
            .checked_add(lifetime)
            .ok_or_else(|| AuthError::TokenGenerationError("token expiry overflows".to_string()))?;

        let claims = Claims {
            sub: user_id,
            token_type,
            iat: now,
            exp,
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenGenerationError(e.to_string()))
    }

    /// Validate a token of the expected type and return its subject
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Uuid, AuthError> {
        self.validate_at(token, expected, Utc::now().timestamp())
            .map(|claims| claims.sub)
    }

    /// Validate against an explicit clock
    ///
    /// Checks run in order: signature/structure, expiry, type. A token is live
    /// while `now < exp`.
    pub fn validate_at(&self, token: &str, expected: TokenType, now: i64) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })?;

        if now >= claims.exp {
            return Err(AuthError::ExpiredToken);
        }

        if claims.token_type != expected {
            return Err(AuthError::WrongTokenType);
        }

        Ok(claims)
    }

    /// Mint a new pair from a valid refresh token
    ///
    /// The presented refresh token is not revoked; it stays usable until it expires.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.refresh_at(refresh_token, Utc::now().timestamp())
    }

    pub fn refresh_at(&self, refresh_token: &str, now: i64) -> Result<TokenPair, AuthError> {
        let claims = self.validate_at(refresh_token, TokenType::Refresh, now)?;
        self.issue_at(claims.sub, now)
    }

    /// Cheap syntactic check: three non-empty base64url segments
    ///
    /// Says nothing about the signature; used to tell malformed input apart from
    /// tokens that are merely invalid.
    pub fn is_well_formed(token: &str) -> bool {
        let segments: Vec<&str> = token.split('.').collect();
        segments.len() == 3
            && segments.iter().all(|segment| {
                !segment.is_empty()
                    && segment
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            })
    }
}
