//! Task data model shared by the pipeline and every backend.
//!
//! A [`Task`] is what the store returns; a [`NewTask`] is what the client
//! inserts (the store assigns the [`TaskId`]). The only mutation the client
//! can express on an existing task is a [`TaskPatch`] of the completion flag.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Identity;

/// Maximum allowed task text length in characters.
pub const MAX_TASK_TEXT_LENGTH: usize = 100;

/// Collection that holds task documents unless configured otherwise.
pub const DEFAULT_COLLECTION: &str = "task-db";

/// Unique identifier for a stored task, based on UUID v7 for time-ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new time-ordered task identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TaskId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Millisecond-precision UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns this timestamp shifted forward, saturating at the maximum.
    #[must_use]
    pub fn saturating_add(self, delta: std::time::Duration) -> Self {
        let delta = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(delta))
    }

    /// Returns this timestamp shifted backward, saturating at the epoch.
    #[must_use]
    pub fn saturating_sub(self, delta: std::time::Duration) -> Self {
        let delta = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_sub(delta))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Errors produced when a user-selected category is not acceptable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    /// No category was chosen.
    #[error("no category selected")]
    Missing,
    /// The chosen label is not one of the selectable categories.
    #[error("unknown category: {0}")]
    Unknown(String),
}

/// Task category.
///
/// `Work`, `Personal` and `Shopping` are selectable when creating a task.
/// Any other label read back from a store is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Work-related task.
    Work,
    /// Personal errand.
    Personal,
    /// Shopping list item.
    Shopping,
    /// Any label outside the selectable set.
    Other(String),
}

impl Category {
    /// The categories a user may pick for a new task, in menu order.
    pub const SELECTABLE: [Self; 3] = [Self::Work, Self::Personal, Self::Shopping];

    /// Maps a stored label onto a category. Never fails.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "Work" => Self::Work,
            "Personal" => Self::Personal,
            "Shopping" => Self::Shopping,
            other => Self::Other(other.to_string()),
        }
    }

    /// Parses a user selection, accepting only the selectable categories.
    ///
    /// # Errors
    ///
    /// Returns [`CategoryError::Missing`] for an empty selection and
    /// [`CategoryError::Unknown`] for any label outside [`Self::SELECTABLE`].
    pub fn parse_selection(label: &str) -> Result<Self, CategoryError> {
        if label.is_empty() {
            return Err(CategoryError::Missing);
        }
        match Self::from_label(label) {
            Self::Other(other) => Err(CategoryError::Unknown(other)),
            category => Ok(category),
        }
    }

    /// Returns the label written to the store and to exports.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
            Self::Shopping => "Shopping",
            Self::Other(label) => label,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A stored task, as delivered by a live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Task label, 1 to [`MAX_TASK_TEXT_LENGTH`] characters.
    pub text: String,
    /// Task category.
    pub category: Category,
    /// When the task is due.
    pub deadline: Timestamp,
    /// When the task was created. Never changes.
    pub creation_date: Timestamp,
    /// Whether the task has been completed.
    pub completed: bool,
    /// Identity that created the task. Never changes.
    pub owner_id: Identity,
}

/// A task document ready to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Task label.
    pub text: String,
    /// Task category.
    pub category: Category,
    /// When the task is due.
    pub deadline: Timestamp,
    /// Creation instant, stamped by the client at validation time.
    pub creation_date: Timestamp,
    /// Always `false` for a freshly created task.
    pub completed: bool,
    /// Identity that owns the task.
    pub owner_id: Identity,
}

impl NewTask {
    /// Materializes the stored form of this document under `id`.
    #[must_use]
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            text: self.text,
            category: self.category,
            deadline: self.deadline,
            creation_date: self.creation_date,
            completed: self.completed,
            owner_id: self.owner_id,
        }
    }
}

/// Partial update of an existing task.
///
/// Completion is the only field that may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New completion flag.
    pub completed: bool,
}

impl TaskPatch {
    /// Applies this patch to a stored task.
    pub const fn apply(self, task: &mut Task) {
        task.completed = self.completed;
    }
}

/// Equality filter selecting the tasks owned by one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerQuery {
    /// Owner to match.
    pub owner_id: Identity,
}

impl OwnerQuery {
    /// Creates a query for the tasks owned by `owner_id`.
    #[must_use]
    pub const fn new(owner_id: Identity) -> Self {
        Self { owner_id }
    }

    /// Returns `true` if the task belongs to the queried owner.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        task.owner_id == self.owner_id
    }
}
