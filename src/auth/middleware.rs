// Request extractors for authenticated routes

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::auth::error::AuthError;
use crate::error::ApiError;

/// Raw bearer credential taken from the Authorization header
///
/// Only the header shape is checked here; the gateways validate the token itself.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse an Authorization header value of the form `Bearer <token>`
    pub fn parse(header_value: &str) -> Result<Self, AuthError> {
        let mut pieces = header_value.trim().splitn(2, ' ');
        let scheme = pieces.next().unwrap_or_default();
        if !scheme.eq_ignore_ascii_case("bearer") {
            return Err(AuthError::InvalidToken);
        }

        let token = pieces.next().unwrap_or_default().trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        Ok(Self(token.to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let endpoint = parts.uri.path();

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| {
                debug!("Missing Authorization header for endpoint: {}", endpoint);
                AuthError::MissingToken
            })?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(Self::parse(header_value)?)
    }
}

/// JSON body extractor that reports every body problem as 400
///
/// Syntax errors, unknown fields and `validator` failures all become
/// `ApiError::BadRequest` instead of axum's default 422.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        value.validate()?;
        Ok(Self(value))
    }
}
