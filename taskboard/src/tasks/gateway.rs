//! Task mutation gateway.
//!
//! `TaskGateway` validates user input and issues create, toggle and delete
//! writes against a [`DocumentStore`]. It never touches the local task set:
//! the visible change always arrives through the next feed snapshot.

use std::sync::Arc;

use taskboard_proto::task::{CategoryError, MAX_TASK_TEXT_LENGTH};
use taskboard_proto::{Category, Identity, NewTask, TaskId, TaskPatch, Timestamp};

use super::TaskError;
use crate::backend::DocumentStore;
use crate::session::SessionTracker;

/// Raw task form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    /// Task label as typed.
    pub text: String,
    /// Selected category label; empty when nothing was picked.
    pub category: String,
    /// Chosen deadline, if any.
    pub deadline: Option<Timestamp>,
}

/// Checks a draft and builds the document to insert.
///
/// Checks run in form order and stop at the first failure: text length,
/// deadline presence, deadline not before `now`, category presence, category
/// validity.
///
/// # Errors
///
/// Returns the [`TaskError`] validation variant for the first failed check.
pub fn validate_draft(
    draft: &TaskDraft,
    owner: &Identity,
    now: Timestamp,
) -> Result<NewTask, TaskError> {
    let len = draft.text.chars().count();
    if len == 0 || len > MAX_TASK_TEXT_LENGTH {
        return Err(TaskError::TextLength);
    }
    let deadline = draft.deadline.ok_or(TaskError::DeadlineMissing)?;
    if deadline < now {
        return Err(TaskError::DeadlineInPast);
    }
    let category = Category::parse_selection(&draft.category).map_err(|e| match e {
        CategoryError::Missing => TaskError::CategoryMissing,
        CategoryError::Unknown(label) => TaskError::CategoryInvalid(label),
    })?;

    Ok(NewTask {
        text: draft.text.clone(),
        category,
        deadline,
        creation_date: now,
        completed: false,
        owner_id: owner.clone(),
    })
}

/// Issues task writes on behalf of the signed-in identity.
pub struct TaskGateway<S> {
    store: Arc<S>,
    session: SessionTracker,
    collection: String,
}

impl<S> Clone for TaskGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            session: self.session.clone(),
            collection: self.collection.clone(),
        }
    }
}

impl<S: DocumentStore> TaskGateway<S> {
    /// Creates a gateway writing to `collection`.
    pub fn new(store: Arc<S>, session: SessionTracker, collection: impl Into<String>) -> Self {
        Self {
            store,
            session,
            collection: collection.into(),
        }
    }

    /// Validates `draft` against the current time and inserts it.
    ///
    /// # Errors
    ///
    /// See [`create_task_at`](Self::create_task_at).
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<TaskId, TaskError> {
        self.create_task_at(draft, Timestamp::now()).await
    }

    /// Validates `draft` as of `now` and inserts it, owned by the signed-in
    /// identity, with `completed = false` and `creation_date = now`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotSignedIn`] without a session, a validation
    /// variant for bad input, or [`TaskError::CreateFailed`] if the store
    /// rejects the insert. Nothing is written in any error case.
    pub async fn create_task_at(
        &self,
        draft: &TaskDraft,
        now: Timestamp,
    ) -> Result<TaskId, TaskError> {
        let owner = self.session.require()?;
        let doc = validate_draft(draft, &owner, now)?;
        match self.store.insert(&self.collection, doc).await {
            Ok(id) => {
                tracing::debug!(task_id = %id, owner = %owner, "task created");
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(error = %e, owner = %owner, "task insert failed");
                Err(TaskError::CreateFailed)
            }
        }
    }

    /// Flips the completion flag of a task from `current_completed`.
    ///
    /// Returns the value written.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotSignedIn`] without a session, or
    /// [`TaskError::Backend`] if the store rejects the update.
    pub async fn toggle_complete(
        &self,
        task_id: &TaskId,
        current_completed: bool,
    ) -> Result<bool, TaskError> {
        self.session.require()?;
        let completed = !current_completed;
        self.store
            .update(&self.collection, task_id, TaskPatch { completed })
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, %task_id, "task update failed");
                TaskError::Backend(e)
            })?;
        tracing::debug!(%task_id, completed, "task toggled");
        Ok(completed)
    }

    /// Deletes a task. No confirmation step.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotSignedIn`] without a session, or
    /// [`TaskError::Backend`] if the store rejects the delete.
    pub async fn delete_task(&self, task_id: &TaskId) -> Result<(), TaskError> {
        self.session.require()?;
        self.store
            .delete(&self.collection, task_id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, %task_id, "task delete failed");
                TaskError::Backend(e)
            })?;
        tracing::debug!(%task_id, "task deleted");
        Ok(())
    }
}
