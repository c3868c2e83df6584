//! Signed-in user identity.
//!
//! An [`Identity`] is handed out by the auth provider and is never minted by
//! this system. It doubles as the ownership key on every stored task.

use serde::{Deserialize, Serialize};

/// Opaque unique reference to an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// Wraps a provider-issued user id.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the provider-issued user id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
