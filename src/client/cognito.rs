//! Challenge-response authentication through an identity-provider library.
//!
//! The SRP handshake itself belongs to the provider library and is opaque
//! here. The library is plugged in as a [`UserPool`], which reports the
//! outcome through [`AuthCallbacks`]. Both callbacks consume the callbacks
//! value, so exactly one of them can fire; [`ChallengeResponseAuth::login`]
//! turns that into a single awaited result.
//!
//! This crate ships no `UserPool` implementation; the application supplies
//! one wrapping its provider library.

use crate::User;
use crate::client::auth::AuthenticationError;
use crate::client::jwt::IdTokenClaims;
use crate::client::session::SessionStore;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing;

/// Credentials handed to the provider.
#[derive(Clone)]
pub struct AuthenticationDetails {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for AuthenticationDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationDetails")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Session produced by a successful handshake.
///
/// The provider has already parsed the ID token, so `claims` need no decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CognitoSession {
    pub id_token: String,
    pub claims: IdTokenClaims,
}

/// Failure reported by the provider library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Provider error code, e.g. `NotAuthorizedException`
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

type HandshakeResult = Result<CognitoSession, ProviderError>;

/// Completion callbacks for one handshake.
#[derive(Debug)]
pub struct AuthCallbacks {
    tx: oneshot::Sender<HandshakeResult>,
}

impl AuthCallbacks {
    /// Creates callbacks and the receiver their outcome is delivered to.
    pub fn channel() -> (Self, oneshot::Receiver<HandshakeResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn on_success(self, session: CognitoSession) {
        self.complete(Ok(session));
    }

    pub fn on_failure(self, error: ProviderError) {
        self.complete(Err(error));
    }

    fn complete(self, result: HandshakeResult) {
        if self.tx.send(result).is_err() {
            tracing::trace!("Login caller went away before the handshake completed");
        }
    }
}

/// User the provider currently tracks as signed in.
pub trait CurrentUser {
    fn username(&self) -> &str;

    fn sign_out(&self) -> Result<(), ProviderError>;
}

/// Identity-provider library bound to one user-pool/client-id/endpoint triple.
pub trait UserPool: Send + Sync {
    /// Starts the challenge-response handshake. The implementation must
    /// eventually call one of the callbacks, or drop them to abandon.
    fn authenticate_user(&self, details: AuthenticationDetails, callbacks: AuthCallbacks);

    fn current_user(&self) -> Option<Box<dyn CurrentUser>>;
}

/// Challenge-response flow strategy.
#[derive(Clone)]
pub struct ChallengeResponseAuth {
    pool: Arc<dyn UserPool>,
    session: SessionStore,
}

impl std::fmt::Debug for ChallengeResponseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeResponseAuth")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl ChallengeResponseAuth {
    pub fn new(pool: Arc<dyn UserPool>, session: SessionStore) -> Self {
        Self { pool, session }
    }

    /// Runs the provider handshake and stores the resulting session.
    ///
    /// # Errors
    ///
    /// - `Provider` when the provider reports a failure
    /// - `Abandoned` when the provider drops the callbacks without calling either
    /// - `MalformedToken` when the provider's claims lack an email
    /// - `Storage` when the session cannot be persisted
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthenticationError> {
        tracing::trace!("Initiating challenge-response login");

        let (callbacks, outcome) = AuthCallbacks::channel();
        self.pool.authenticate_user(
            AuthenticationDetails {
                username: email.to_string(),
                password: password.to_string(),
            },
            callbacks,
        );

        let session = match outcome.await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::error!("Identity provider rejected login: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!("Identity provider dropped the handshake");
                return Err(AuthenticationError::Abandoned);
            }
        };

        let user: User = session.claims.into_user()?;
        tracing::trace!("Challenge-response login succeeded for user {}", user.id);
        self.session.set_session(user, session.id_token)?;
        Ok(())
    }

    /// Clears the session and signs out the provider's current user.
    ///
    /// Never fails; a failed provider sign-out is logged.
    pub fn logout(&self) {
        tracing::trace!("Logging out (challenge-response flow)");
        self.session.clear_session();

        if let Some(user) = self.pool.current_user() {
            match user.sign_out() {
                Ok(()) => tracing::trace!("Provider signed out {}", user.username()),
                Err(e) => tracing::warn!(
                    "Provider sign-out failed for {}: {}",
                    user.username(),
                    e
                ),
            }
        }
    }

    pub fn get_token(&self) -> Option<String> {
        self.session.get_token()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::storage::MemoryStorage;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) enum Outcome {
        Succeed { sub: String, email: Option<String> },
        Fail(ProviderError),
        Abandon,
        SucceedLater(Duration),
    }

    /// Scripted provider standing in for the real library.
    pub(crate) struct FakePool {
        pub(crate) outcome: Outcome,
        pub(crate) signed_in: Mutex<Option<String>>,
        pub(crate) sign_outs: Arc<AtomicUsize>,
        pub(crate) fail_sign_out: bool,
    }

    impl FakePool {
        pub(crate) fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                signed_in: Mutex::new(None),
                sign_outs: Arc::new(AtomicUsize::new(0)),
                fail_sign_out: false,
            }
        }
    }

    fn session_for(sub: &str, email: Option<String>) -> CognitoSession {
        CognitoSession {
            id_token: format!("header.{}.signature", sub),
            claims: IdTokenClaims {
                sub: sub.to_string(),
                email,
                email_verified: Some(true),
                username: None,
                token_use: Some("id".to_string()),
                iss: None,
                aud: None,
                iat: None,
                exp: None,
            },
        }
    }

    struct FakeUser {
        username: String,
        sign_outs: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CurrentUser for FakeUser {
        fn username(&self) -> &str {
            &self.username
        }

        fn sign_out(&self) -> Result<(), ProviderError> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ProviderError::new("network down"))
            } else {
                Ok(())
            }
        }
    }

    impl UserPool for FakePool {
        fn authenticate_user(&self, details: AuthenticationDetails, callbacks: AuthCallbacks) {
            match &self.outcome {
                Outcome::Succeed { sub, email } => {
                    *self.signed_in.lock().unwrap() = Some(details.username);
                    callbacks.on_success(session_for(sub, email.clone()));
                }
                Outcome::Fail(e) => callbacks.on_failure(e.clone()),
                Outcome::Abandon => drop(callbacks),
                Outcome::SucceedLater(delay) => {
                    let delay = *delay;
                    *self.signed_in.lock().unwrap() = Some(details.username);
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        callbacks.on_success(session_for("late", Some("l@b.com".to_string())));
                    });
                }
            }
        }

        fn current_user(&self) -> Option<Box<dyn CurrentUser>> {
            let username = self.signed_in.lock().unwrap().clone()?;
            Some(Box::new(FakeUser {
                username,
                sign_outs: self.sign_outs.clone(),
                fail: self.fail_sign_out,
            }))
        }
    }

    fn auth_with(pool: FakePool) -> ChallengeResponseAuth {
        ChallengeResponseAuth::new(
            Arc::new(pool),
            SessionStore::rehydrate(MemoryStorage::new()),
        )
    }

    #[tokio::test]
    async fn login_success_stores_provider_claims() {
        let auth = auth_with(FakePool::new(Outcome::Succeed {
            sub: "123".to_string(),
            email: Some("a@b.com".to_string()),
        }));

        auth.login("a@b.com", "pw").await.unwrap();

        assert_eq!(
            auth.session().user(),
            Some(User::new("123".to_string(), "a@b.com".to_string()))
        );
        assert_eq!(auth.get_token().as_deref(), Some("header.123.signature"));
    }

    #[tokio::test]
    async fn login_failure_maps_provider_error() {
        let auth = auth_with(FakePool::new(Outcome::Fail(ProviderError::with_code(
            "NotAuthorizedException",
            "Incorrect username or password.",
        ))));

        let err = auth.login("a@b.com", "wrong").await.unwrap_err();

        match err {
            AuthenticationError::Provider(e) => {
                assert_eq!(e.code.as_deref(), Some("NotAuthorizedException"));
                assert_eq!(e.to_string(), "Incorrect username or password.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!auth.session().is_authenticated());
    }

    #[tokio::test]
    async fn login_abandoned_handshake() {
        let auth = auth_with(FakePool::new(Outcome::Abandon));

        let err = auth.login("a@b.com", "pw").await.unwrap_err();

        assert!(matches!(err, AuthenticationError::Abandoned));
    }

    #[tokio::test]
    async fn login_waits_for_deferred_callback() {
        let auth = auth_with(FakePool::new(Outcome::SucceedLater(Duration::from_millis(
            20,
        ))));

        auth.login("l@b.com", "pw").await.unwrap();

        assert_eq!(auth.session().user().map(|u| u.id), Some("late".to_string()));
    }

    #[tokio::test]
    async fn login_without_email_claim_fails() {
        let auth = auth_with(FakePool::new(Outcome::Succeed {
            sub: "123".to_string(),
            email: None,
        }));

        let err = auth.login("a@b.com", "pw").await.unwrap_err();

        assert!(matches!(err, AuthenticationError::MalformedToken(_)));
        assert!(!auth.session().is_authenticated());
    }

    #[tokio::test]
    async fn logout_signs_out_current_user() {
        let pool = FakePool::new(Outcome::Succeed {
            sub: "123".to_string(),
            email: Some("a@b.com".to_string()),
        });
        let sign_outs = pool.sign_outs.clone();
        let auth = auth_with(pool);
        auth.login("a@b.com", "pw").await.unwrap();

        auth.logout();

        assert!(auth.get_token().is_none());
        assert_eq!(sign_outs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn logout_without_provider_user_only_clears_session() {
        let pool = FakePool::new(Outcome::Abandon);
        let sign_outs = pool.sign_outs.clone();
        let auth = auth_with(pool);

        auth.logout();

        assert_eq!(sign_outs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn logout_survives_failed_sign_out() {
        let mut pool = FakePool::new(Outcome::Succeed {
            sub: "123".to_string(),
            email: Some("a@b.com".to_string()),
        });
        pool.fail_sign_out = true;
        let sign_outs = pool.sign_outs.clone();
        let auth = auth_with(pool);
        auth.login("a@b.com", "pw").await.unwrap();

        auth.logout();

        assert!(!auth.session().is_authenticated());
        assert_eq!(sign_outs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_deliver_exactly_one_outcome() {
        let (callbacks, mut rx) = AuthCallbacks::channel();
        assert!(rx.try_recv().is_err());

        callbacks.on_failure(ProviderError::new("nope"));

        assert_eq!(rx.try_recv().unwrap(), Err(ProviderError::new("nope")));
    }

    #[test]
    fn details_debug_redacts_password() {
        let details = AuthenticationDetails {
            username: "a@b.com".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", details);
        assert!(debug.contains("a@b.com"));
        assert!(!debug.contains("hunter2"));
    }
}
