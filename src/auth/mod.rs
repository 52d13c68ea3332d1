// Authentication module
// Stateless JWT sessions: entry points, session gateway and account mutations

pub mod account;
pub mod avatar;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod password;
pub mod repository;
pub mod service;
pub mod session;
pub mod token;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types
pub use account::AccountGateway;
pub use avatar::{AvatarStorage, LocalAvatarStorage};
pub use error::AuthError;
pub use handlers::*;
pub use middleware::{BearerToken, ValidatedJson};
pub use oauth::{GoogleIdentityProvider, IdentityProvider};
pub use repository::{CredentialStore, UserRepository};
pub use service::AuthService;
pub use session::SessionGateway;
pub use token::{TokenPair, TokenService, TokenType};
