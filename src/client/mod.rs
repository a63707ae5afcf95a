//! Client-side authentication and API access.
//!
//! This module provides:
//! - ID token decoding (`jwt`)
//! - Durable key/value storage (`storage`) and the session built on it (`session`)
//! - The two login strategies (`password_auth`, `cognito`) behind one facade (`auth`)
//! - A GraphQL client carrying the bearer token (`graphql`)
//! - Dioxus hooks for components (`use_auth`)
//!
//! # Example
//!
//! ```rust,ignore
//! use dxcognito::CognitoConfig;
//! use dxcognito::client::{Auth, GraphQLClient, LocalStorage, SessionStore};
//!
//! let config = CognitoConfig::from_env_or_panic();
//! let session = SessionStore::rehydrate(LocalStorage);
//! // `user_pool` wraps the application's SRP library; the password flow ignores it
//! let auth = Auth::select(&config, session, Some(user_pool))?;
//! let graphql = GraphQLClient::for_auth(config.api_url.clone(), &auth);
//! ```

pub mod auth;
pub mod cognito;
pub mod graphql;
pub mod jwt;
pub mod password_auth;
pub mod session;
pub mod storage;
pub mod use_auth;

// Re-export commonly used types and functions
pub use auth::{Auth, AuthenticationError};
pub use cognito::{
    AuthCallbacks, AuthenticationDetails, ChallengeResponseAuth, CognitoSession, CurrentUser,
    ProviderError, UserPool,
};
pub use graphql::{GraphQLClient, GraphQLError, create_client};
pub use jwt::{IdTokenClaims, MalformedTokenError, decode_claims, decode_id_token, decode_id_token_to_user};
pub use password_auth::PasswordAuth;
pub use session::{Session, SessionStore};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use use_auth::{AuthContext, use_auth, use_auth_provider, use_graphql};
