//! Shared data model for `Taskboard`: identities, tasks and store queries.

pub mod identity;
pub mod task;

pub use identity::Identity;
pub use task::{Category, NewTask, OwnerQuery, Task, TaskId, TaskPatch, Timestamp};
