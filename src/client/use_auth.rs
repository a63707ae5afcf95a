//! Dioxus hooks exposing the session to components.
//!
//! `use_auth_provider` must be called once at the root of the app (see
//! [`App`](crate::app::App)); descendants read the context with `use_auth`.

use crate::User;
use crate::client::auth::{Auth, AuthenticationError};
use crate::client::graphql::GraphQLClient;
use dioxus::prelude::*;
use tracing;

/// Context object returned by the auth hooks.
#[derive(Clone)]
pub struct AuthContext {
    auth: Auth,
    /// Mirrors the session's user; components reading it re-render on change
    user: Signal<Option<User>>,
}

/// Provides authentication context to the component tree.
///
/// Seeds a signal from the (already rehydrated) session and keeps it in sync
/// with every later login or logout.
///
/// # Example
///
/// ```ignore
/// #[component]
/// pub fn App() -> Element {
///     let auth = use_context::<Auth>();
///     use_auth_provider(auth);
///     rsx! { Router::<Route> {} }
/// }
/// ```
pub fn use_auth_provider(auth: Auth) -> AuthContext {
    let user = use_signal(|| auth.session().user());
    let session = auth.session().clone();

    use_future(move || {
        let mut user = user;
        let mut changes = session.subscribe();
        async move {
            // Sync first: the session may have moved between render and first poll
            loop {
                let next = changes.borrow_and_update().user().cloned();
                let stale = *user.peek() != next;
                if stale {
                    tracing::trace!("Session changed, signed in: {}", next.is_some());
                    user.set(next);
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        }
    });

    use_context_provider(|| AuthContext { auth, user })
}

/// Hook for accessing authentication state and actions.
///
/// # Panics
///
/// Panics if called without `use_auth_provider()` in an ancestor component.
pub fn use_auth() -> AuthContext {
    use_context::<AuthContext>()
}

/// Returns the GraphQL client placed in root context by [`launch`](crate::app::launch).
pub fn use_graphql() -> GraphQLClient {
    use_context::<GraphQLClient>()
}

impl AuthContext {
    /// Returns the signed-in user. Subscribes the calling component.
    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.read().is_some()
    }

    /// Returns the ID token to present as a bearer token.
    pub fn get_token(&self) -> Option<String> {
        self.auth.get_token()
    }

    /// Logs in with the configured strategy.
    ///
    /// ```ignore
    /// let auth = use_auth();
    /// spawn(async move {
    ///     if let Err(e) = auth.login(email, password).await {
    ///         error.set(Some(e.to_string()));
    ///     }
    /// });
    /// ```
    pub async fn login(&self, email: String, password: String) -> Result<(), AuthenticationError> {
        self.auth.login(&email, &password).await
    }

    pub fn logout(&self) {
        self.auth.logout();
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }
}
