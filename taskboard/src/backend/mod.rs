//! Backend collaborator contract for `Taskboard`.
//!
//! The pipeline never talks to a concrete backend. It consumes the two
//! traits defined here:
//! - [`AuthProvider`]: account creation, sign-in/out and the session stream
//! - [`DocumentStore`]: task document writes and live owner-scoped queries
//!
//! [`memory::MemoryBackend`] implements both in-process and backs the tests
//! and the terminal front end.

pub mod memory;

use std::sync::Arc;

use tokio::sync::watch;

use taskboard_proto::{Identity, NewTask, OwnerQuery, Task, TaskId, TaskPatch};

/// Full result set of a live query at one point in time.
pub type Snapshot = Arc<[Task]>;

/// Errors reported by a backend.
///
/// Messages are shown to the user verbatim, so they read as sentences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend could not be reached or refused the request.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The addressed document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The auth provider rejected the request.
    #[error("{0}")]
    Auth(String),
}

/// A standing owner-scoped query.
///
/// Every change in the store re-delivers the full matching result set; only
/// the latest snapshot is kept, so a slow reader may skip intermediate ones.
/// Dropping the subscription (or calling [`unsubscribe`](Self::unsubscribe))
/// releases it; the store stops delivering on its next change.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    /// Wraps the receiving half of a store's snapshot channel.
    #[must_use]
    pub const fn new(rx: watch::Receiver<Snapshot>) -> Self {
        Self { rx }
    }

    /// Returns the most recent snapshot without waiting.
    #[must_use]
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the store has dropped the query.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Releases the query.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Authentication provider.
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in.
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Identity, BackendError>> + Send;

    /// Signs in an existing account.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<Identity, BackendError>> + Send;

    /// Ends the current session.
    fn sign_out(&self) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Returns a stream of session changes, starting at the current session.
    fn session(&self) -> watch::Receiver<Option<Identity>>;
}

/// Task document store.
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its store-assigned id.
    ///
    /// The insert is atomic: on error nothing was written.
    fn insert(
        &self,
        collection: &str,
        doc: NewTask,
    ) -> impl std::future::Future<Output = Result<TaskId, BackendError>> + Send;

    /// Applies a partial update to an existing document.
    fn update(
        &self,
        collection: &str,
        id: &TaskId,
        patch: TaskPatch,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Deletes a document.
    fn delete(
        &self,
        collection: &str,
        id: &TaskId,
    ) -> impl std::future::Future<Output = Result<(), BackendError>> + Send;

    /// Opens a live query over `collection` filtered by `query`.
    ///
    /// The returned subscription already holds the current result set.
    fn subscribe(
        &self,
        collection: &str,
        query: OwnerQuery,
    ) -> impl std::future::Future<Output = Result<Subscription, BackendError>> + Send;
}
