// HTTP handlers for authentication and "me" endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::auth::{
    middleware::{BearerToken, ValidatedJson},
    models::{
        AuthResponse, AvatarRequest, ChangePasswordRequest, Credentials, GoogleLoginRequest,
        LoginRequest, MessageResponse, RefreshRequest, RegisterRequest, SessionStatus,
        UpdateProfileRequest, UserResponse,
    },
    token::TokenPair,
};
use crate::error::{ApiError, ErrorResponse};
use crate::AppState;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, session opened", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    tracing::debug!("Registering {}", request.email);
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state
        .auth
        .login(Credentials::Password {
            email: request.email,
            password: request.password,
        })
        .await?;
    Ok(Json(response))
}

/// Login with a Google ID token
#[utoipa::path(
    post,
    path = "/api/auth/google",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Session opened", body = AuthResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Google token rejected", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn google_login_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<GoogleLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = state
        .auth
        .login(Credentials::Google {
            id_token: request.id_token,
        })
        .await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 400, description = "Malformed token", body = ErrorResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let pair = state.sessions.refresh(&request.refresh)?;
    Ok(Json(pair))
}

/// Probe whether the access token is still live
#[utoipa::path(
    get,
    path = "/api/me/check-session",
    responses(
        (status = 200, description = "Authenticated", body = SessionStatus),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn check_session_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<SessionStatus>, ApiError> {
    let user_id = state.sessions.check_session(token.as_str())?;
    Ok(Json(SessionStatus {
        authenticated: true,
        user_id,
    }))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.sessions.get_current_user(token.as_str()).await?;
    Ok(Json(user.into()))
}

/// Acknowledge logout; tokens are not revoked server-side
#[utoipa::path(
    post,
    path = "/api/me/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn logout_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.logout(token.as_str())?;
    Ok(Json(MessageResponse::new("Logged out")))
}

/// Partially update the current user's profile
#[utoipa::path(
    patch,
    path = "/api/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Unknown field or invalid value", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn update_profile_handler(
    State(state): State<AppState>,
    token: BearerToken,
    body: Result<ValidatedJson<UpdateProfileRequest>, ApiError>,
) -> Result<Json<UserResponse>, ApiError> {
    // Authentication failures win over body errors
    state.sessions.get_current_user(token.as_str()).await?;
    let ValidatedJson(changes) = body?;

    let user = state.accounts.update_profile(token.as_str(), changes).await?;
    Ok(Json(user.into()))
}

/// Replace the current user's avatar
#[utoipa::path(
    post,
    path = "/api/me/avatar",
    request_body = AvatarRequest,
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Missing or undecodable image", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn update_avatar_handler(
    State(state): State<AppState>,
    token: BearerToken,
    body: Result<ValidatedJson<AvatarRequest>, ApiError>,
) -> Result<Json<UserResponse>, ApiError> {
    state.sessions.get_current_user(token.as_str()).await?;
    let ValidatedJson(request) = body?;

    let user = state
        .accounts
        .update_avatar(token.as_str(), &request.image)
        .await?;
    Ok(Json(user.into()))
}

/// Permanently delete the current user's account
#[utoipa::path(
    delete,
    path = "/api/me",
    responses(
        (status = 200, description = "Account deleted", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn delete_account_handler(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<MessageResponse>, ApiError> {
    state.accounts.delete_account(token.as_str()).await?;
    Ok(Json(MessageResponse::new("Account deleted")))
}

/// Change the current user's password
#[utoipa::path(
    post,
    path = "/api/me/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Incorrect old password or weak new password", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "me"
)]
pub async fn change_password_handler(
    State(state): State<AppState>,
    token: BearerToken,
    body: Result<ValidatedJson<ChangePasswordRequest>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.get_current_user(token.as_str()).await?;
    let ValidatedJson(request) = body?;

    state.auth.change_password(token.as_str(), request).await?;
    Ok(Json(MessageResponse::new("Password changed")))
}
