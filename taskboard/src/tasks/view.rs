//! Derived view builder.
//!
//! Maps `{task set, sort key, page}` to the slice that is rendered plus the
//! page count. Pure and deterministic: no clock, no I/O.
//!
//! A stale page (one past the end after the set shrank) is *not* corrected
//! here; it yields an empty slice. Callers that want the page pulled back use
//! [`clamp_page`].

use taskboard_proto::{Task, Timestamp};

/// Number of tasks shown per page unless configured otherwise.
pub const TASKS_PER_PAGE: usize = 5;

/// Field the task list is ordered by, always ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Oldest task first.
    #[default]
    CreationDate,
    /// Earliest deadline first.
    Deadline,
}

impl SortKey {
    /// Returns the time value this key orders by.
    #[must_use]
    pub const fn key(self, task: &Task) -> Timestamp {
        match self {
            Self::CreationDate => task.creation_date,
            Self::Deadline => task.deadline,
        }
    }

    /// Parses a user-facing sort name (`created` / `deadline`).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "created" | "creation" | "creation_date" => Some(Self::CreationDate),
            "deadline" | "due" => Some(Self::Deadline),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreationDate => write!(f, "creation date"),
            Self::Deadline => write!(f, "deadline"),
        }
    }
}

/// The rendered portion of a task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    /// Tasks on the requested page, in sort order.
    pub visible: Vec<Task>,
    /// The whole set in sort order.
    pub sorted: Vec<Task>,
    /// Requested page (1-based), not clamped.
    pub page: usize,
    /// `ceil(count / page_size)`; zero for an empty set.
    pub total_pages: usize,
}

impl TaskView {
    /// Number of tasks in the whole set.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.sorted.len()
    }

    /// Whether page controls should be rendered at all.
    #[must_use]
    pub const fn shows_page_controls(&self) -> bool {
        self.total_pages > 1
    }

    /// Page buttons to render; empty when there is at most one page.
    #[must_use]
    pub fn page_numbers(&self) -> Vec<usize> {
        if self.shows_page_controls() {
            (1..=self.total_pages).collect()
        } else {
            Vec::new()
        }
    }
}

/// Returns a copy of `tasks` ordered by `key`. Stable for equal keys.
#[must_use]
pub fn sort_tasks(tasks: &[Task], key: SortKey) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|task| key.key(task));
    sorted
}

/// `ceil(count / page_size)`. A page size of zero is treated as one.
#[must_use]
pub const fn total_pages(count: usize, page_size: usize) -> usize {
    let size = if page_size == 0 { 1 } else { page_size };
    count.div_ceil(size)
}

/// Pulls `page` back into `1..=total_pages` (page 1 for an empty set).
#[must_use]
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Builds the view of `tasks` sorted by `sort` at 1-based `page`.
///
/// Page 0 is read as page 1. A page past the end gives an empty slice.
#[must_use]
pub fn build_view(tasks: &[Task], sort: SortKey, page: usize, page_size: usize) -> TaskView {
    let size = page_size.max(1);
    let page = page.max(1);
    let sorted = sort_tasks(tasks, sort);
    let start = (page - 1).saturating_mul(size);
    let visible = if start >= sorted.len() {
        Vec::new()
    } else {
        let end = start.saturating_add(size).min(sorted.len());
        sorted[start..end].to_vec()
    };
    TaskView {
        visible,
        total_pages: total_pages(sorted.len(), size),
        sorted,
        page,
    }
}
