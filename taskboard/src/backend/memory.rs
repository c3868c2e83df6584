//! In-process backend.
//!
//! [`MemoryBackend`] implements both [`AuthProvider`] and [`DocumentStore`]
//! on top of plain maps guarded by [`parking_lot::Mutex`]. Live queries are
//! `watch` channels: every write recomputes the result set of each open
//! query on the touched collection and replaces its snapshot. Queries whose
//! [`Subscription`] was dropped are pruned on the next write.
//!
//! Document order inside a snapshot follows `HashMap` iteration and is
//! therefore unspecified, like a real store's.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use taskboard_proto::{Identity, NewTask, OwnerQuery, Task, TaskId, TaskPatch};

use super::{AuthProvider, BackendError, DocumentStore, Snapshot, Subscription};

/// Minimum accepted password length, in characters.
const MIN_PASSWORD_LENGTH: usize = 6;

/// A registered account.
#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

/// An open live query.
struct Subscriber {
    collection: String,
    query: OwnerQuery,
    tx: watch::Sender<Snapshot>,
}

/// Documents and open queries, kept under one lock so a write and its
/// notifications are observed together.
#[derive(Default)]
struct StoreState {
    collections: HashMap<String, HashMap<TaskId, Task>>,
    subscribers: Vec<Subscriber>,
}

impl StoreState {
    fn result_set(&self, collection: &str, query: &OwnerQuery) -> Snapshot {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.values()
                    .filter(|task| query.matches(task))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
            .into()
    }

    /// Re-delivers every open query on `collection` and drops closed ones.
    fn notify(&mut self, collection: &str) {
        self.subscribers.retain(|sub| !sub.tx.is_closed());
        let updates: Vec<(usize, Snapshot)> = self
            .subscribers
            .iter()
            .enumerate()
            .filter(|(_, sub)| sub.collection == collection)
            .map(|(idx, sub)| (idx, self.result_set(collection, &sub.query)))
            .collect();
        for (idx, snapshot) in updates {
            self.subscribers[idx].tx.send_replace(snapshot);
        }
    }
}

/// In-process auth provider and document store.
pub struct MemoryBackend {
    accounts: Mutex<HashMap<String, Account>>,
    session: watch::Sender<Option<Identity>>,
    store: Mutex<StoreState>,
    unavailable: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend with no accounts and no signed-in session.
    #[must_use]
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            session,
            store: Mutex::new(StoreState::default()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Creates a shareable backend.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Makes every subsequent store call fail with
    /// [`BackendError::Unavailable`] until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of documents in `collection`, across all owners.
    #[must_use]
    pub fn document_count(&self, collection: &str) -> usize {
        self.store
            .lock()
            .collections
            .get(collection)
            .map_or(0, HashMap::len)
    }

    /// Returns the number of live queries that have not been released.
    #[must_use]
    pub fn open_subscriptions(&self) -> usize {
        self.store
            .lock()
            .subscribers
            .iter()
            .filter(|sub| !sub.tx.is_closed())
            .count()
    }

    fn ensure_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("store offline".to_string()));
        }
        Ok(())
    }

    fn check_credentials_shape(email: &str, password: &str) -> Result<(), BackendError> {
        if !email.contains('@') {
            return Err(BackendError::Auth("invalid email address".to_string()));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(BackendError::Auth(format!(
                "password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

impl AuthProvider for MemoryBackend {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        Self::check_credentials_shape(email, password)?;
        let identity = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(email) {
                return Err(BackendError::Auth("email already in use".to_string()));
            }
            let identity = Identity::new(Uuid::now_v7().to_string());
            accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };
        tracing::debug!(%identity, "account created");
        self.session.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, BackendError> {
        let account = self.accounts.lock().get(email).cloned();
        match account {
            Some(account) if account.password == password => {
                self.session.send_replace(Some(account.identity.clone()));
                Ok(account.identity)
            }
            _ => Err(BackendError::Auth("invalid email or password".to_string())),
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.session.send_replace(None);
        Ok(())
    }

    fn session(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }
}

impl DocumentStore for MemoryBackend {
    async fn insert(&self, collection: &str, doc: NewTask) -> Result<TaskId, BackendError> {
        self.ensure_available()?;
        let id = TaskId::new();
        let mut store = self.store.lock();
        store
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc.into_task(id.clone()));
        store.notify(collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<(), BackendError> {
        self.ensure_available()?;
        let mut store = self.store.lock();
        let task = store
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        patch.apply(task);
        store.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &TaskId) -> Result<(), BackendError> {
        self.ensure_available()?;
        let mut store = self.store.lock();
        store
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        store.notify(collection);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        query: OwnerQuery,
    ) -> Result<Subscription, BackendError> {
        self.ensure_available()?;
        let mut store = self.store.lock();
        let (tx, rx) = watch::channel(store.result_set(collection, &query));
        store.subscribers.push(Subscriber {
            collection: collection.to_string(),
            query,
            tx,
        });
        Ok(Subscription::new(rx))
    }
}
