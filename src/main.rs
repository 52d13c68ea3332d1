pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    AccountGateway, AuthService, AvatarStorage, CredentialStore, GoogleIdentityProvider,
    IdentityProvider, LocalAvatarStorage, SessionGateway, TokenService, UserRepository,
};
use config::Config;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::login_handler,
        auth::handlers::google_login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::check_session_handler,
        auth::handlers::me_handler,
        auth::handlers::logout_handler,
        auth::handlers::update_profile_handler,
        auth::handlers::update_avatar_handler,
        auth::handlers::delete_account_handler,
        auth::handlers::change_password_handler,
    ),
    components(
        schemas(
            auth::models::RegisterRequest,
            auth::models::LoginRequest,
            auth::models::GoogleLoginRequest,
            auth::models::RefreshRequest,
            auth::models::UpdateProfileRequest,
            auth::models::AvatarRequest,
            auth::models::ChangePasswordRequest,
            auth::models::AuthResponse,
            auth::models::UserResponse,
            auth::models::SessionStatus,
            auth::models::MessageResponse,
            auth::token::TokenPair,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and token refresh"),
        (name = "me", description = "Session and account endpoints for the current user")
    ),
    info(
        title = "Nutri Accounts API",
        version = "1.0.0",
        description = "Account and session management for the nutrition backend"
    )
)]
struct ApiDoc;

/// Registers the bearer token scheme referenced by the "me" endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionGateway>,
    pub accounts: Arc<AccountGateway>,
}

impl AppState {
    /// Wire the services around one token service and one credential store
    pub fn new(
        tokens: Arc<TokenService>,
        store: Arc<dyn CredentialStore>,
        identity_provider: Arc<dyn IdentityProvider>,
        avatars: Arc<dyn AvatarStorage>,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(store.clone(), tokens.clone(), identity_provider)),
            sessions: Arc::new(SessionGateway::new(tokens.clone(), store.clone())),
            accounts: Arc::new(AccountGateway::new(tokens, store, avatars)),
        }
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Entry points
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/google", post(auth::google_login_handler))
        .route("/api/auth/token/refresh", post(auth::refresh_handler))
        // Current user
        .route("/api/me/check-session", get(auth::check_session_handler))
        .route(
            "/api/me",
            get(auth::me_handler)
                .patch(auth::update_profile_handler)
                .delete(auth::delete_account_handler),
        )
        .route("/api/me/logout", post(auth::logout_handler))
        .route(
            "/api/me/avatar",
            post(auth::update_avatar_handler)
                .layer(DefaultBodyLimit::max(auth::avatar::MAX_AVATAR_REQUEST_BYTES)),
        )
        .route("/api/me/change-password", post(auth::change_password_handler))
        .layer(cors)
        .with_state(state)
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&db_pool).await?;

    let tokens = Arc::new(TokenService::with_lifetimes(
        &config.jwt_secret,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    ));
    let state = AppState::new(
        tokens,
        Arc::new(UserRepository::new(db_pool)),
        Arc::new(GoogleIdentityProvider::new(config.google_client_id.clone())),
        Arc::new(LocalAvatarStorage::new(config.avatar_dir.clone())),
    );
    if config.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID not set; Google login will be rejected");
    }

    let app = create_router(state);

    // Start the Axum server
    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Nutri accounts API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Nutri accounts API - Starting...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
