//! Sign-up, log-in and log-out flows.
//!
//! Each flow checks the form fields locally before calling the provider and
//! turns the outcome into a user-facing notice or an [`AuthError`] whose
//! message is shown inline.

use std::sync::Arc;

use crate::backend::{AuthProvider, BackendError};

/// Notice shown after a successful sign-up.
pub const SIGNED_UP_NOTICE: &str = "Account created successfully!";
/// Notice shown after a successful log-in.
pub const LOGGED_IN_NOTICE: &str = "Logged in successfully!";
/// Notice shown after a successful log-out.
pub const LOGGED_OUT_NOTICE: &str = "Logged out successfully!";

/// Errors surfaced by the auth flows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Email or password was left empty; the provider was not called.
    #[error("Email and Password are required")]
    MissingCredentials,

    /// The provider rejected the request; its message is kept verbatim.
    #[error("{0}")]
    Provider(String),
}

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Auth(msg) => Self::Provider(msg),
            other => Self::Provider(other.to_string()),
        }
    }
}

/// Auth flows over a shared provider.
pub struct AuthFlow<A> {
    provider: Arc<A>,
}

impl<A> Clone for AuthFlow<A> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<A: AuthProvider> AuthFlow<A> {
    /// Creates the flows for `provider`.
    #[must_use]
    pub const fn new(provider: Arc<A>) -> Self {
        Self { provider }
    }

    /// Creates an account; the provider signs it in.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if either field is empty,
    /// or [`AuthError::Provider`] with the provider's message.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<&'static str, AuthError> {
        check_fields(email, password)?;
        match self.provider.create_account(email, password).await {
            Ok(identity) => {
                tracing::info!(%identity, "signed up");
                Ok(SIGNED_UP_NOTICE)
            }
            Err(e) => {
                tracing::warn!(error = %e, "sign-up rejected");
                Err(e.into())
            }
        }
    }

    /// Signs in an existing account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredentials`] if either field is empty,
    /// or [`AuthError::Provider`] with the provider's message.
    pub async fn log_in(&self, email: &str, password: &str) -> Result<&'static str, AuthError> {
        check_fields(email, password)?;
        match self.provider.sign_in(email, password).await {
            Ok(identity) => {
                tracing::info!(%identity, "logged in");
                Ok(LOGGED_IN_NOTICE)
            }
            Err(e) => {
                tracing::warn!(error = %e, "log-in rejected");
                Err(e.into())
            }
        }
    }

    /// Ends the session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] if the provider fails to sign out.
    pub async fn log_out(&self) -> Result<&'static str, AuthError> {
        self.provider.sign_out().await.map_err(|e| {
            tracing::warn!(error = %e, "log-out failed");
            AuthError::from(e)
        })?;
        Ok(LOGGED_OUT_NOTICE)
    }
}

fn check_fields(email: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(())
}
