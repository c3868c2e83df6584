//! Live task collection feed.
//!
//! `TaskFeed` follows the session stream and keeps exactly one owner-scoped
//! store query open for the signed-in identity. Every store snapshot replaces
//! the published [`TaskSet`] wholesale.
//!
//! # Identity switches
//!
//! When the identity changes the feed releases the previous query, publishes
//! an empty set stamped with the new identity (or none), and only then opens
//! the new query. A consumer therefore never sees a set stamped with one
//! identity holding another identity's tasks. Tasks that a store delivers for
//! the wrong owner are dropped before publishing.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use taskboard_proto::{Identity, OwnerQuery, Task, TaskId};

use crate::backend::{DocumentStore, Snapshot, Subscription};
use crate::session::SessionTracker;

/// The task set published for one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSet {
    /// Identity the set belongs to; `None` when signed out.
    pub owner: Option<Identity>,
    /// Every task owned by `owner`, in store order.
    pub tasks: Snapshot,
}

impl TaskSet {
    /// An empty set for `owner`.
    #[must_use]
    pub fn empty(owner: Option<Identity>) -> Self {
        Self {
            owner,
            tasks: Arc::from(Vec::new()),
        }
    }

    /// Number of tasks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the set holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Looks up a task by id.
    #[must_use]
    pub fn find(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == *id)
    }
}

impl Default for TaskSet {
    fn default() -> Self {
        Self::empty(None)
    }
}

/// Background task republishing the signed-in identity's tasks.
///
/// Dropping the feed stops the background task and releases the store query.
pub struct TaskFeed {
    rx: watch::Receiver<TaskSet>,
    handle: JoinHandle<()>,
}

impl TaskFeed {
    /// Spawns the feed on the current tokio runtime.
    pub fn spawn<S>(store: Arc<S>, session: &SessionTracker, collection: impl Into<String>) -> Self
    where
        S: DocumentStore + 'static,
    {
        let (tx, rx) = watch::channel(TaskSet::empty(session.current()));
        let handle = tokio::spawn(run_feed(store, collection.into(), session.watch(), tx));
        Self { rx, handle }
    }

    /// Returns the latest published set.
    #[must_use]
    pub fn current(&self) -> TaskSet {
        self.rx.borrow().clone()
    }

    /// Returns an independent receiver of published sets.
    #[must_use]
    pub fn receiver(&self) -> watch::Receiver<TaskSet> {
        self.rx.clone()
    }

    /// Waits for the next published set.
    ///
    /// Returns `None` once the background task has stopped.
    pub async fn changed(&mut self) -> Option<TaskSet> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Waits until a published set satisfies `pred` and returns it.
    ///
    /// Returns `None` if the background task stops first.
    pub async fn wait_for(&mut self, pred: impl FnMut(&TaskSet) -> bool) -> Option<TaskSet> {
        self.rx.wait_for(pred).await.ok().map(|set| set.clone())
    }
}

impl Drop for TaskFeed {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_feed<S: DocumentStore>(
    store: Arc<S>,
    collection: String,
    mut identity_rx: watch::Receiver<Option<Identity>>,
    tx: watch::Sender<TaskSet>,
) {
    let mut identity = identity_rx.borrow_and_update().clone();
    loop {
        tx.send_replace(TaskSet::empty(identity.clone()));
        let mut subscription = match &identity {
            Some(owner) => {
                open_query(store.as_ref(), &collection, owner, &tx, &identity_rx).await
            }
            None => None,
        };

        loop {
            tokio::select! {
                changed = identity_rx.changed() => {
                    if changed.is_err() {
                        tracing::debug!("session stream closed, stopping task feed");
                        drop(subscription);
                        tx.send_replace(TaskSet::empty(None));
                        return;
                    }
                    let next = identity_rx.borrow_and_update().clone();
                    if next == identity {
                        // Same identity again; the opening snapshot may have been held back.
                        if let (Some(sub), Some(owner)) = (&subscription, &identity) {
                            publish(&tx, owner, &sub.current());
                        }
                    } else {
                        tracing::info!(
                            from = ?identity.as_ref().map(Identity::as_str),
                            to = ?next.as_ref().map(Identity::as_str),
                            "identity changed, resubscribing"
                        );
                        identity = next;
                        break;
                    }
                }
                snapshot = next_snapshot(&mut subscription) => {
                    match (snapshot, &identity) {
                        (Some(snapshot), Some(owner)) => publish(&tx, owner, &snapshot),
                        _ => {
                            tracing::warn!(%collection, "store closed the task query");
                            subscription = None;
                        }
                    }
                }
            }
        }
        drop(subscription);
    }
}

async fn open_query<S: DocumentStore>(
    store: &S,
    collection: &str,
    owner: &Identity,
    tx: &watch::Sender<TaskSet>,
    identity_rx: &watch::Receiver<Option<Identity>>,
) -> Option<Subscription> {
    match store
        .subscribe(collection, OwnerQuery::new(owner.clone()))
        .await
    {
        Ok(subscription) => {
            tracing::info!(%owner, %collection, "task query opened");
            // The session may have moved on while the query was opening.
            if matches!(identity_rx.has_changed(), Ok(false)) {
                publish(tx, owner, &subscription.current());
            } else {
                tracing::debug!(%owner, "identity changed during subscribe, holding snapshot");
            }
            Some(subscription)
        }
        Err(e) => {
            tracing::warn!(error = %e, %owner, "failed to open task query");
            None
        }
    }
}

async fn next_snapshot(subscription: &mut Option<Subscription>) -> Option<Snapshot> {
    match subscription {
        Some(sub) => sub.changed().await,
        None => std::future::pending().await,
    }
}

fn publish(tx: &watch::Sender<TaskSet>, owner: &Identity, snapshot: &Snapshot) {
    let foreign = snapshot
        .iter()
        .filter(|task| task.owner_id != *owner)
        .count();
    let tasks = if foreign == 0 {
        Arc::clone(snapshot)
    } else {
        tracing::warn!(%owner, foreign, "dropping tasks owned by another identity");
        snapshot
            .iter()
            .filter(|task| task.owner_id == *owner)
            .cloned()
            .collect::<Vec<_>>()
            .into()
    };
    tracing::trace!(%owner, count = tasks.len(), "task set published");
    tx.send_replace(TaskSet {
        owner: Some(owner.clone()),
        tasks,
    });
}
