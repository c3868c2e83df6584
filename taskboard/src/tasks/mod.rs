//! Task pipeline for `Taskboard`.
//!
//! The live [`feed`] republishes the signed-in user's tasks on every store
//! change, the [`view`] builder turns a task set into the sorted, paged slice
//! that is rendered, and the [`gateway`] validates and issues writes.

pub mod feed;
pub mod gateway;
pub mod view;

pub use feed::{TaskFeed, TaskSet};
pub use gateway::{TaskDraft, TaskGateway, validate_draft};
pub use view::{SortKey, TASKS_PER_PAGE, TaskView, build_view, clamp_page};

use thiserror::Error;

use crate::backend::BackendError;
use crate::session::SessionError;

/// Errors that can occur during task operations.
///
/// The messages are shown inline under the task form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task text is empty or longer than 100 characters.
    #[error("Task must be between 1 and 100 characters")]
    TextLength,
    /// No deadline was given.
    #[error("Please set a deadline")]
    DeadlineMissing,
    /// The deadline lies before the validation instant.
    #[error("Deadline cannot be in the past")]
    DeadlineInPast,
    /// No category was chosen.
    #[error("Please select a category")]
    CategoryMissing,
    /// The chosen category is not one of the selectable ones.
    #[error("Please select a valid category")]
    CategoryInvalid(String),
    /// The operation needs a signed-in identity.
    #[error("You must be logged in to manage tasks")]
    NotSignedIn,
    /// The store rejected the insert; nothing was written.
    #[error("An error occurred while creating the task. Please try again.")]
    CreateFailed,
    /// The store rejected an update or delete.
    #[error("task update failed: {0}")]
    Backend(#[from] BackendError),
}

impl From<SessionError> for TaskError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SignedOut => Self::NotSignedIn,
        }
    }
}
