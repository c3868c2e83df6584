//! CSV export of task lists.
//!
//! The document is a header line plus one row per task. Fields are joined
//! with `,` and rows with `\n`, with no trailing newline. Fields are written
//! as-is: a comma inside a task label shifts the remaining columns of that
//! row.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Offset};

use taskboard_proto::{Task, Timestamp};

/// First line of every export.
pub const CSV_HEADER: &str = "Task Text,Category,Deadline,Completed";

/// File name written by [`write_export`].
pub const EXPORT_FILE_NAME: &str = "tasks.csv";

/// Default deadline rendering, e.g. `3/7/2025`.
pub const DEFAULT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Errors produced while exporting.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The task list was empty; no document was produced.
    #[error("No tasks to export!")]
    NothingToExport,

    /// The configured deadline format is not a valid strftime string.
    #[error("invalid export date format: {0}")]
    InvalidDateFormat(String),

    /// Writing the export file failed.
    #[error("failed to write export {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Which tasks an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportScope {
    /// Every task in the current sort order.
    #[default]
    AllTasks,
    /// Only the tasks on the current page.
    CurrentPage,
}

/// How deadlines are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// strftime-style pattern applied to the deadline.
    pub date_format: String,
    /// Offset the deadline is shown in.
    pub utc_offset: FixedOffset,
}

impl ExportOptions {
    /// Options rendering dates with `date_format` in UTC.
    #[must_use]
    pub fn utc(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
            utc_offset: chrono::Utc.fix(),
        }
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            utc_offset: chrono::Local::now().offset().fix(),
        }
    }
}

/// Encodes `tasks` in the order given.
///
/// # Errors
///
/// Returns [`ExportError::NothingToExport`] for an empty slice, or
/// [`ExportError::InvalidDateFormat`] if the date pattern cannot be rendered.
pub fn encode_csv(tasks: &[Task], options: &ExportOptions) -> Result<String, ExportError> {
    if tasks.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    check_date_format(&options.date_format)?;

    let mut out = String::from(CSV_HEADER);
    for task in tasks {
        out.push('\n');
        out.push_str(&task.text);
        out.push(',');
        out.push_str(task.category.label());
        out.push(',');
        out.push_str(&format_deadline(task.deadline, options)?);
        out.push(',');
        out.push_str(if task.completed { "Yes" } else { "No" });
    }
    Ok(out)
}

/// Encodes `tasks` and writes them to `dir/tasks.csv`, creating `dir` if
/// needed. Returns the written path.
///
/// # Errors
///
/// Returns [`ExportError::NothingToExport`] without touching the filesystem
/// when `tasks` is empty, or [`ExportError::Io`] if the write fails.
pub fn write_export(
    dir: &Path,
    tasks: &[Task],
    options: &ExportOptions,
) -> Result<PathBuf, ExportError> {
    let document = encode_csv(tasks, options)?;
    let path = dir.join(EXPORT_FILE_NAME);
    std::fs::create_dir_all(dir)
        .and_then(|()| std::fs::write(&path, document.as_bytes()))
        .map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
    tracing::info!(path = %path.display(), count = tasks.len(), "tasks exported");
    Ok(path)
}

fn check_date_format(format: &str) -> Result<(), ExportError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ExportError::InvalidDateFormat(format.to_string()));
    }
    Ok(())
}

/// Renders a deadline as a calendar date using `options`.
///
/// # Errors
///
/// Returns [`ExportError::InvalidDateFormat`] if the pattern cannot be
/// rendered.
pub fn format_deadline(at: Timestamp, options: &ExportOptions) -> Result<String, ExportError> {
    let datetime = i64::try_from(at.as_millis())
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|utc| utc.with_timezone(&options.utc_offset));
    let Some(datetime) = datetime else {
        // Out of chrono's range; fall back to the raw value.
        return Ok(at.as_millis().to_string());
    };
    let mut out = String::new();
    write!(out, "{}", datetime.format(&options.date_format))
        .map_err(|_| ExportError::InvalidDateFormat(options.date_format.clone()))?;
    Ok(out)
}
