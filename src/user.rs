//! The authenticated user's identity.
//!
//! A `User` is derived from ID token claims at login time and persisted as JSON
//! under the `user` storage key alongside the raw token.

use serde::{Deserialize, Serialize};

/// Identity of the signed-in user.
///
/// Immutable once constructed; a new login replaces it wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable subject identifier (`sub` claim).
    pub id: String,

    /// User's email address (`email` claim).
    pub email: String,
}

impl User {
    /// Creates a new User.
    ///
    /// # Example
    ///
    /// ```
    /// # use dxcognito::User;
    /// let user = User::new("123".to_string(), "a@b.com".to_string());
    /// assert_eq!(user.id, "123");
    /// assert_eq!(user.email, "a@b.com");
    /// ```
    pub fn new(id: String, email: String) -> Self {
        Self { id, email }
    }
}
