//! # dxcognito
//!
//! Cognito authentication, session persistence and an authenticated GraphQL
//! client for Dioxus single-page applications.
//!
//! ## Overview
//!
//! - **Shared types** (`CognitoConfig`, `User`)
//! - **Client** - ID token decoding, durable session storage, the two login
//!   strategies behind the `Auth` facade, the GraphQL client and Dioxus hooks
//! - **Router, views and app shell** - the `/` route, its `Index` view and the
//!   root `App` component
//!
//! ## Login strategies
//!
//! | Strategy | Selected when | Handshake |
//! |----------|---------------|-----------|
//! | `Auth::Password` | `USE_PASSWORD_FLOW` is set | `InitiateAuth` with `USER_PASSWORD_AUTH` |
//! | `Auth::ChallengeResponse` | otherwise | delegated to a `UserPool` provider library |
//!
//! Local Cognito emulators lack SRP support, hence the password flow. The
//! choice is made once at startup.
//!
//! ## Session
//!
//! The session (user + ID token) is held by a `SessionStore`, mirrored to
//! storage under the `user` and `idToken` keys and rehydrated at startup.
//! Both keys are required; half a session is no session.
//!
//! ## Usage
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
//!
//! dxcognito::app::launch(auth, graphql);
//! ```
//!
//! Components then use the hooks:
//!
//! ```rust,ignore
//! let auth = use_auth();
//! if let Some(user) = auth.user() {
//!     tracing::info!("Signed in as {}", user.email);
//! }
//! let api = use_graphql();
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod router;
pub mod user;
pub mod views;

pub use config::{CognitoConfig, ConfigError};
pub use router::Route;
pub use user::User;
