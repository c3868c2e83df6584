//! Identity session tracking.
//!
//! [`SessionTracker`] holds the auth provider's session stream and exposes
//! the signed-in [`Identity`], if any. It has no other side effects.

use tokio::sync::watch;

use taskboard_proto::Identity;

/// Errors raised when an operation needs a signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Nobody is signed in.
    #[error("not signed in")]
    SignedOut,
}

/// Current-identity view over an auth provider's session stream.
///
/// Cloning is cheap; every clone observes the same stream.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    rx: watch::Receiver<Option<Identity>>,
}

impl SessionTracker {
    /// Tracks the given session stream, usually `AuthProvider::session()`.
    #[must_use]
    pub const fn new(rx: watch::Receiver<Option<Identity>>) -> Self {
        Self { rx }
    }

    /// Returns the signed-in identity, or `None` when signed out.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.rx.borrow().clone()
    }

    /// Returns `true` if someone is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Returns the signed-in identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SignedOut`] when nobody is signed in.
    pub fn require(&self) -> Result<Identity, SessionError> {
        self.current().ok_or(SessionError::SignedOut)
    }

    /// Returns an independent receiver for downstream consumers.
    ///
    /// The current value counts as already seen.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }

    /// Waits for the next session change and returns the new identity.
    ///
    /// Returns `None` if the provider dropped its session stream.
    pub async fn changed(&mut self) -> Option<Option<Identity>> {
        self.rx.changed().await.ok()?;
        let identity = self.rx.borrow_and_update().clone();
        match &identity {
            Some(id) => tracing::info!(identity = %id, "session started"),
            None => tracing::info!("session ended"),
        }
        Some(identity)
    }
}
