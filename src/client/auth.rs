//! Strategy selection and the uniform authentication interface.
//!
//! The strategy is chosen once from configuration and never switched while
//! the process runs. Callers only ever see [`Auth`].

use crate::{CognitoConfig, ConfigError};
use crate::client::cognito::{ChallengeResponseAuth, ProviderError, UserPool};
use crate::client::jwt::MalformedTokenError;
use crate::client::password_auth::PasswordAuth;
use crate::client::session::SessionStore;
use crate::client::storage::StorageError;
use std::sync::Arc;
use tracing;

/// Error types for login operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    /// The identity endpoint rejected the credentials; carries its message
    #[error("{0}")]
    Rejected(String),

    /// The request never got a usable response
    #[error("Authentication request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Cognito answered with a challenge this client cannot complete
    #[error("Additional authentication challenge required: {0}")]
    ChallengeRequired(String),

    /// Success response without `AuthenticationResult.IdToken`
    #[error("Authentication response did not include an ID token")]
    MissingToken,

    /// The ID token could not be decoded into a user
    #[error("Invalid ID token: {0}")]
    MalformedToken(#[from] MalformedTokenError),

    /// The identity provider library reported a failure
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// The identity provider dropped the handshake without an outcome
    #[error("Identity provider abandoned the authentication handshake")]
    Abandoned,

    /// The session could not be persisted
    #[error("Failed to store session: {0}")]
    Storage(#[from] StorageError),
}

/// The selected authentication strategy.
#[derive(Clone, Debug)]
pub enum Auth {
    /// Direct `USER_PASSWORD_AUTH`, for local emulators
    Password(PasswordAuth),
    /// Provider-library handshake, for production
    ChallengeResponse(ChallengeResponseAuth),
}

impl Auth {
    /// Selects the strategy from `config.use_password_flow`.
    ///
    /// The password flow talks to Cognito directly and ignores `pool`. The
    /// challenge-response flow needs a provider library supplied by the
    /// application; without one, selection fails.
    pub fn select(
        config: &CognitoConfig,
        session: SessionStore,
        pool: Option<Arc<dyn UserPool>>,
    ) -> Result<Self, ConfigError> {
        if config.use_password_flow {
            return Ok(Self::password(config, session));
        }

        let pool = pool.ok_or(ConfigError::MissingUserPool)?;
        Ok(Self::challenge_response(pool, session))
    }

    /// Password flow against `config.endpoint()`.
    pub fn password(config: &CognitoConfig, session: SessionStore) -> Self {
        tracing::info!("Using Cognito password flow against {}", config.endpoint());
        Auth::Password(PasswordAuth::new(config, session))
    }

    /// Challenge-response flow through `pool`.
    pub fn challenge_response(pool: Arc<dyn UserPool>, session: SessionStore) -> Self {
        tracing::trace!("Using Cognito challenge-response flow");
        Auth::ChallengeResponse(ChallengeResponseAuth::new(pool, session))
    }

    /// Authenticates and stores the session. Not retried; overlapping calls
    /// are not serialized and the last one to complete wins.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthenticationError> {
        match self {
            Auth::Password(auth) => auth.login(email, password).await,
            Auth::ChallengeResponse(auth) => auth.login(email, password).await,
        }
    }

    /// Ends the session. Never fails.
    pub fn logout(&self) {
        match self {
            Auth::Password(auth) => auth.logout(),
            Auth::ChallengeResponse(auth) => auth.logout(),
        }
    }

    pub fn get_token(&self) -> Option<String> {
        match self {
            Auth::Password(auth) => auth.get_token(),
            Auth::ChallengeResponse(auth) => auth.get_token(),
        }
    }

    pub fn session(&self) -> &SessionStore {
        match self {
            Auth::Password(auth) => auth.session(),
            Auth::ChallengeResponse(auth) => auth.session(),
        }
    }

    pub fn uses_password_flow(&self) -> bool {
        matches!(self, Auth::Password(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::User;
    use crate::client::cognito::tests::{FakePool, Outcome};
    use crate::client::storage::MemoryStorage;

    fn config(use_password_flow: bool) -> CognitoConfig {
        CognitoConfig::new(
            "client".to_string(),
            "local_pool".to_string(),
            "http://localhost/query".to_string(),
        )
        .with_endpoint("http://localhost:9229")
        .with_password_flow(use_password_flow)
    }

    fn succeeding_pool() -> Arc<dyn UserPool> {
        Arc::new(FakePool::new(Outcome::Succeed {
            sub: "123".to_string(),
            email: Some("a@b.com".to_string()),
        }))
    }

    #[test]
    fn test_select_password_flow() {
        let session = SessionStore::rehydrate(MemoryStorage::new());
        let auth = Auth::select(&config(true), session, Some(succeeding_pool())).unwrap();
        assert!(auth.uses_password_flow());
    }

    #[test]
    fn test_select_password_flow_needs_no_pool() {
        let session = SessionStore::rehydrate(MemoryStorage::new());
        let auth = Auth::select(&config(true), session, None).unwrap();
        assert!(matches!(auth, Auth::Password(_)));
    }

    #[test]
    fn test_select_challenge_response_flow() {
        let session = SessionStore::rehydrate(MemoryStorage::new());
        let auth = Auth::select(&config(false), session, Some(succeeding_pool())).unwrap();
        assert!(matches!(auth, Auth::ChallengeResponse(_)));
    }

    #[test]
    fn test_select_challenge_response_without_pool_fails() {
        let session = SessionStore::rehydrate(MemoryStorage::new());
        let err = Auth::select(&config(false), session, None).unwrap_err();
        assert_eq!(err, ConfigError::MissingUserPool);
    }

    #[test]
    fn test_password_constructor_shares_session() {
        let session = SessionStore::rehydrate(MemoryStorage::new());
        let auth = Auth::password(&config(true), session.clone());

        session
            .set_session(User::new("1".to_string(), "x@y.z".to_string()), "tok".to_string())
            .unwrap();
        assert_eq!(auth.get_token().as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_facade_delegates_to_strategy() {
        let session = SessionStore::rehydrate(MemoryStorage::new());
        let auth = Auth::challenge_response(succeeding_pool(), session.clone());

        auth.login("a@b.com", "pw").await.unwrap();
        assert_eq!(
            session.user(),
            Some(User::new("123".to_string(), "a@b.com".to_string()))
        );
        assert_eq!(auth.get_token(), session.get_token());

        auth.logout();
        assert!(auth.get_token().is_none());
        assert!(!auth.session().is_authenticated());
    }

    #[test]
    fn test_rejected_displays_remote_message() {
        let err = AuthenticationError::Rejected("bad creds".to_string());
        assert_eq!(err.to_string(), "bad creds");
    }

    #[test]
    fn test_malformed_token_converts() {
        let err: AuthenticationError = MalformedTokenError::SegmentCount(1).into();
        assert!(err.to_string().contains("expected 3 parts"));
    }
}
