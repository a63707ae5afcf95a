//! Process-wide session state mirrored to durable storage.
//!
//! ## Storage Strategy
//!
//! - On start: `rehydrate` reads storage once; memory is the source of truth after that
//! - On login: write both storage keys, then publish the new session to memory
//! - On a failed write: put the previous session back in storage, or sign out
//! - On logout: clear memory and both storage keys
//! - During a session: always read from memory, never storage
//!
//! The user and token live in one [`Session`] value, so observers never see
//! one without the other. Storage can briefly hold one key during a write;
//! rehydration treats that as no session.

use crate::User;
use crate::client::storage::{Storage, StorageError};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing;

/// Storage key for the JSON-serialized user
pub const USER_STORAGE_KEY: &str = "user";

/// Storage key for the raw ID token
pub const ID_TOKEN_STORAGE_KEY: &str = "idToken";

/// A signed-in user together with the token that proves it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authenticated {
    pub user: User,
    pub id_token: String,
}

/// Current session: empty, or a user with their token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session(Option<Authenticated>);

impl Session {
    /// A session with no signed-in user.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn new(user: User, id_token: String) -> Self {
        Self(Some(Authenticated { user, id_token }))
    }

    pub fn user(&self) -> Option<&User> {
        self.0.as_ref().map(|a| &a.user)
    }

    pub fn id_token(&self) -> Option<&str> {
        self.0.as_ref().map(|a| a.id_token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}

struct Inner {
    storage: Box<dyn Storage>,
    state: watch::Sender<Session>,
    // Serializes mutations so storage and memory are updated as one step
    write_lock: Mutex<()>,
}

/// Shared session holder. Clones are handles to the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionStore {
    /// Creates the session store, restoring any session found in `storage`.
    ///
    /// Both keys must be present and the stored user must parse; otherwise the
    /// session starts empty and any leftover key is removed.
    pub fn rehydrate(storage: impl Storage + 'static) -> Self {
        tracing::trace!("Rehydrating session from storage");

        let session = Self::load(&storage);
        let (state, _) = watch::channel(session);

        Self {
            inner: Arc::new(Inner {
                storage: Box::new(storage),
                state,
                write_lock: Mutex::new(()),
            }),
        }
    }

    fn load(storage: &dyn Storage) -> Session {
        let stored_user = storage.get_item(USER_STORAGE_KEY);
        let stored_token = storage.get_item(ID_TOKEN_STORAGE_KEY);

        let session = match (stored_user, stored_token) {
            (Some(user_json), Some(id_token)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => {
                    tracing::trace!("Restored session for user {}", user.id);
                    return Session::new(user, id_token);
                }
                Err(e) => {
                    tracing::warn!("Stored user is unreadable, starting signed out: {}", e);
                    Session::empty()
                }
            },
            (None, None) => {
                tracing::trace!("No session found in storage");
                return Session::empty();
            }
            _ => {
                tracing::warn!("Storage holds only half a session, starting signed out");
                Session::empty()
            }
        };

        remove_both(storage);
        session
    }

    /// Returns the current ID token.
    pub fn get_token(&self) -> Option<String> {
        self.inner.state.borrow().id_token().map(str::to_string)
    }

    /// Returns the current user.
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Returns a snapshot of the whole session.
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    /// Subscribes to session changes. Any number of observers may subscribe.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Persists and publishes a new session.
    ///
    /// On a storage failure the previous session is written back and stays
    /// current. If that write fails too, both keys are removed and the session
    /// becomes empty. Either way memory and storage agree when the error is
    /// returned.
    pub fn set_session(&self, user: User, id_token: String) -> Result<(), StorageError> {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let storage = self.inner.storage.as_ref();
        let user_json = serde_json::to_string(&user)?;
        let written = storage
            .set_item(USER_STORAGE_KEY, &user_json)
            .and_then(|()| storage.set_item(ID_TOKEN_STORAGE_KEY, &id_token));

        if let Err(e) = written {
            tracing::error!("Failed to persist session: {}", e);
            let previous = self.inner.state.borrow().clone();
            if let Err(restore_err) = write_back(storage, &previous) {
                tracing::warn!("Failed to restore previous session, signing out: {}", restore_err);
                remove_both(storage);
                self.inner.state.send_replace(Session::empty());
            }
            return Err(e);
        }

        tracing::trace!("Session stored for user {}", user.id);
        self.inner.state.send_replace(Session::new(user, id_token));
        Ok(())
    }

    /// Clears the session from memory and storage. Never fails; storage
    /// errors are logged.
    pub fn clear_session(&self) {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        tracing::trace!("Clearing session from memory and storage");
        self.inner.state.send_replace(Session::empty());
        remove_both(self.inner.storage.as_ref());
    }
}

/// Makes storage hold exactly `session`.
fn write_back(storage: &dyn Storage, session: &Session) -> Result<(), StorageError> {
    match &session.0 {
        Some(Authenticated { user, id_token }) => {
            storage.set_item(USER_STORAGE_KEY, &serde_json::to_string(user)?)?;
            storage.set_item(ID_TOKEN_STORAGE_KEY, id_token)
        }
        None => {
            remove_both(storage);
            Ok(())
        }
    }
}

fn remove_both(storage: &dyn Storage) {
    for key in [USER_STORAGE_KEY, ID_TOKEN_STORAGE_KEY] {
        if let Err(e) = storage.remove_item(key) {
            tracing::warn!("Failed to remove '{}' from storage: {}", key, e);
        }
    }
}
