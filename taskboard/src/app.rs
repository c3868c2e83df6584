//! Application state and command handling.
//!
//! [`App`] holds everything the terminal front end shows: the auth and task
//! forms, the sort key and page, the latest [`TaskSet`] from the feed, and
//! pending notices. [`Command`] is one parsed input line, and [`execute`]
//! routes it to the auth flows, the task gateway or the exporter.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::NaiveDate;

use taskboard_proto::{Task, Timestamp};

use crate::auth::{AuthError, AuthFlow};
use crate::backend::{AuthProvider, DocumentStore};
use crate::config::ClientConfig;
use crate::export::{self, ExportOptions, ExportScope};
use crate::session::SessionTracker;
use crate::tasks::{
    SortKey, TaskDraft, TaskError, TaskGateway, TaskSet, TaskView, build_view, clamp_page,
};

/// Shown for `help` and after an unknown command.
pub const HELP_TEXT: &str = "\
commands:
  signup <email> <password>           create an account
  login <email> <password>            sign in
  logout                              sign out
  add <YYYY-MM-DD> <category> <text>  add a task (Work, Personal, Shopping)
  toggle <row>                        mark a task done / not done
  delete <row>                        delete a task
  sort created|deadline               change the sort order
  page <n>                            jump to a page
  export                              write tasks.csv
  help                                show this help
  quit                                exit";

/// Notice for task commands issued while signed out.
pub const SIGN_IN_FIRST: &str = "Log in or sign up to manage tasks";

/// Notice for `signup` or `login` issued while a session is active.
pub const LOG_OUT_FIRST: &str = "Already signed in; log out before switching accounts";

/// Notice for row commands issued before the feed caught up with the session.
pub const TASKS_LOADING: &str = "Tasks are still loading, try again";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account. Missing words parse as empty strings.
    SignUp {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Sign in. Missing words parse as empty strings.
    LogIn {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Sign out.
    LogOut,
    /// Fill the task form and submit it.
    Add {
        /// Deadline as typed (`YYYY-MM-DD`).
        deadline: String,
        /// Category label as typed.
        category: String,
        /// Task label; the rest of the line.
        text: String,
    },
    /// Toggle the task at a 1-based row on the current page.
    Toggle(usize),
    /// Delete the task at a 1-based row on the current page.
    Delete(usize),
    /// Change the sort key.
    Sort(SortKey),
    /// Jump to a 1-based page.
    Page(usize),
    /// Export tasks to CSV.
    Export,
    /// Show the command list.
    Help,
    /// Leave the program.
    Quit,
}

/// Errors from [`Command::parse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The first word is not a known command.
    #[error("unknown command: {0} (type `help`)")]
    Unknown(String),

    /// The command needs an argument it did not get.
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    /// Parses a line. Returns `Ok(None)` for a blank line.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] for unknown commands or malformed arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let Some((name, rest)) = split_word(line) else {
            return Ok(None);
        };

        let cmd = match name.to_ascii_lowercase().as_str() {
            "signup" | "register" => {
                let (email, password) = two_words(rest);
                Self::SignUp { email, password }
            }
            "login" => {
                let (email, password) = two_words(rest);
                Self::LogIn { email, password }
            }
            "logout" => Self::LogOut,
            "add" => {
                let (deadline, rest) = split_word(rest).unwrap_or_default();
                let (category, text) = split_word(rest).unwrap_or_default();
                Self::Add {
                    deadline: deadline.to_string(),
                    category: category.to_string(),
                    text: text.to_string(),
                }
            }
            "toggle" | "done" => Self::Toggle(parse_number(rest, "toggle <row>")?),
            "delete" | "rm" => Self::Delete(parse_number(rest, "delete <row>")?),
            "sort" => Self::Sort(
                SortKey::parse(rest.trim()).ok_or(CommandError::Usage("sort created|deadline"))?,
            ),
            "page" => Self::Page(parse_number(rest, "page <n>")?),
            "export" => Self::Export,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(cmd))
    }

    /// Whether the command is accepted without a session.
    #[must_use]
    pub const fn allowed_signed_out(&self) -> bool {
        matches!(
            self,
            Self::SignUp { .. } | Self::LogIn { .. } | Self::Help | Self::Quit
        )
    }

    /// Whether the command opens a session.
    #[must_use]
    pub const fn starts_session(&self) -> bool {
        matches!(self, Self::SignUp { .. } | Self::LogIn { .. })
    }

    /// Whether the command acts on the rows currently shown.
    #[must_use]
    pub const fn reads_rows(&self) -> bool {
        matches!(self, Self::Toggle(_) | Self::Delete(_) | Self::Export)
    }
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    Some(
        s.split_once(char::is_whitespace)
            .map_or((s, ""), |(word, rest)| (word, rest.trim_start())),
    )
}

fn two_words(s: &str) -> (String, String) {
    let mut words = s.split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let second = words.next().unwrap_or_default().to_string();
    (first, second)
}

fn parse_number(s: &str, usage: &'static str) -> Result<usize, CommandError> {
    s.trim().parse().map_err(|_| CommandError::Usage(usage))
}

/// Parses a `YYYY-MM-DD` form date as midnight UTC of that day.
///
/// Returns `None` for an empty or malformed date.
#[must_use]
pub fn parse_deadline(date: &str) -> Option<Timestamp> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let millis = day.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis();
    u64::try_from(millis).ok().map(Timestamp::from_millis)
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    // -- Auth form --
    /// Email field.
    pub email: String,
    /// Password field.
    pub password: String,
    /// Inline auth error, cleared on success.
    pub auth_error: Option<String>,

    // -- Task form --
    /// Task label field.
    pub input: String,
    /// Deadline field (`YYYY-MM-DD`).
    pub deadline: String,
    /// Category field; empty when nothing is selected.
    pub category: String,
    /// Inline task form error, cleared on success.
    pub form_error: Option<String>,

    // -- View --
    /// Active sort key.
    pub sort_key: SortKey,
    /// 1-based page index.
    pub current_page: usize,
    page_size: usize,
    clamp_stale_page: bool,
    task_set: TaskSet,

    // -- Export --
    export_scope: ExportScope,
    export_dir: PathBuf,
    export_options: ExportOptions,

    notices: Vec<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
}

impl App {
    /// Creates the signed-out initial state.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            auth_error: None,
            input: String::new(),
            deadline: String::new(),
            category: String::new(),
            form_error: None,
            sort_key: config.default_sort,
            current_page: 1,
            page_size: config.page_size,
            clamp_stale_page: config.clamp_page,
            task_set: TaskSet::default(),
            export_scope: config.export_scope,
            export_dir: config.export_dir.clone(),
            export_options: config.export_options(),
            notices: Vec::new(),
            should_quit: false,
        }
    }

    /// Overrides the deadline rendering options.
    #[must_use]
    pub fn with_export_options(mut self, options: ExportOptions) -> Self {
        self.export_options = options;
        self
    }

    /// Replaces the task set with a fresh feed snapshot.
    ///
    /// With page clamping enabled a page that fell off the end is pulled back
    /// to the last page.
    pub fn apply_task_set(&mut self, set: TaskSet) {
        self.task_set = set;
        if self.clamp_stale_page {
            let pages = crate::tasks::view::total_pages(self.task_set.len(), self.page_size);
            self.current_page = clamp_page(self.current_page, pages);
        }
    }

    /// The latest task set.
    #[must_use]
    pub const fn task_set(&self) -> &TaskSet {
        &self.task_set
    }

    /// Whether the latest task set belongs to a signed-in identity.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.task_set.owner.is_some()
    }

    /// The current derived view.
    #[must_use]
    pub fn view(&self) -> TaskView {
        build_view(
            &self.task_set.tasks,
            self.sort_key,
            self.current_page,
            self.page_size,
        )
    }

    /// Changes the sort key; the page is kept.
    pub const fn set_sort(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    /// Jumps to a 1-based page. Page 0 is read as page 1.
    pub fn go_to_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    /// Fills the task form.
    pub fn set_form(&mut self, text: &str, deadline: &str, category: &str) {
        text.clone_into(&mut self.input);
        deadline.clone_into(&mut self.deadline);
        category.clone_into(&mut self.category);
    }

    /// The task form as a draft for the gateway.
    #[must_use]
    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            text: self.input.clone(),
            category: self.category.clone(),
            deadline: parse_deadline(&self.deadline),
        }
    }

    /// Clears the task form and its error.
    pub fn reset_form(&mut self) {
        self.input.clear();
        self.deadline.clear();
        self.category.clear();
        self.form_error = None;
    }

    /// The task at a 1-based row of the current page.
    #[must_use]
    pub fn task_at(&self, row: usize) -> Option<Task> {
        let index = row.checked_sub(1)?;
        self.view().visible.into_iter().nth(index)
    }

    /// The tasks an export covers, in the current sort order.
    #[must_use]
    pub fn export_tasks(&self) -> Vec<Task> {
        let view = self.view();
        match self.export_scope {
            ExportScope::AllTasks => view.sorted,
            ExportScope::CurrentPage => view.visible,
        }
    }

    /// Writes the export file and records the outcome as a notice.
    ///
    /// Returns the written path, or `None` if nothing was written.
    pub fn export(&mut self) -> Option<PathBuf> {
        let tasks = self.export_tasks();
        match export::write_export(&self.export_dir, &tasks, &self.export_options) {
            Ok(path) => {
                self.push_notice(format!(
                    "Exported {} task(s) to {}",
                    tasks.len(),
                    path.display()
                ));
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                self.push_notice(e.to_string());
                None
            }
        }
    }

    /// Records the outcome of a sign-up or log-in.
    pub fn record_auth(&mut self, result: Result<&'static str, AuthError>) {
        match result {
            Ok(notice) => {
                self.email.clear();
                self.password.clear();
                self.auth_error = None;
                self.push_notice(notice);
            }
            Err(e) => self.auth_error = Some(e.to_string()),
        }
    }

    /// Records the outcome of a task create.
    pub fn record_create<T>(&mut self, result: Result<T, TaskError>) {
        match result {
            Ok(_) => self.reset_form(),
            Err(e) => self.form_error = Some(e.to_string()),
        }
    }

    /// Queues a one-shot notice.
    pub fn push_notice(&mut self, notice: impl Into<String>) {
        self.notices.push(notice.into());
    }

    /// Drains queued notices.
    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    /// Renders the current screen as text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some(owner) = &self.task_set.owner else {
            out.push_str("Not signed in. Use `signup <email> <password>` or `login <email> <password>`.\n");
            if let Some(err) = &self.auth_error {
                let _ = writeln!(out, "! {err}");
            }
            return out;
        };

        let view = self.view();
        let _ = writeln!(
            out,
            "Tasks for {owner} | sorted by {} | {} task(s)",
            self.sort_key,
            view.total_count()
        );
        if let Some(err) = &self.form_error {
            let _ = writeln!(out, "! {err}");
        }
        if view.visible.is_empty() {
            out.push_str("  (no tasks)\n");
        }
        for (row, task) in view.visible.iter().enumerate() {
            let mark = if task.completed { 'x' } else { ' ' };
            let due = export::format_deadline(task.deadline, &self.export_options)
                .unwrap_or_else(|_| task.deadline.to_string());
            let _ = writeln!(
                out,
                "  {:>2}. [{mark}] {}  ({}, due {due})",
                row + 1,
                task.text,
                task.category,
            );
        }
        if view.shows_page_controls() {
            out.push_str("pages:");
            for page in view.page_numbers() {
                if page == view.page {
                    let _ = write!(out, " [{page}]");
                } else {
                    let _ = write!(out, " {page}");
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Runs one command against the app state and the backend.
///
/// Access is decided by `session`, not by the task set, which trails it.
/// Row commands run only once the task set belongs to the session's identity.
pub async fn execute<A, S>(
    app: &mut App,
    command: Command,
    session: &SessionTracker,
    auth: &AuthFlow<A>,
    gateway: &TaskGateway<S>,
) where
    A: AuthProvider,
    S: DocumentStore,
{
    let identity = session.current();
    if identity.is_none() && !command.allowed_signed_out() {
        app.push_notice(SIGN_IN_FIRST);
        return;
    }
    if identity.is_some() && command.starts_session() {
        app.push_notice(LOG_OUT_FIRST);
        return;
    }
    if command.reads_rows() && app.task_set().owner != identity {
        tracing::debug!(?command, "task set trails the session, command refused");
        app.push_notice(TASKS_LOADING);
        return;
    }

    match command {
        Command::SignUp { email, password } => {
            app.email = email;
            app.password = password;
            let result = auth.sign_up(&app.email, &app.password).await;
            app.record_auth(result);
        }
        Command::LogIn { email, password } => {
            app.email = email;
            app.password = password;
            let result = auth.log_in(&app.email, &app.password).await;
            app.record_auth(result);
        }
        Command::LogOut => match auth.log_out().await {
            Ok(notice) => app.push_notice(notice),
            Err(e) => app.push_notice(e.to_string()),
        },
        Command::Add {
            deadline,
            category,
            text,
        } => {
            app.set_form(&text, &deadline, &category);
            let result = gateway.create_task(&app.draft()).await;
            app.record_create(result);
        }
        Command::Toggle(row) => {
            let Some(task) = app.task_at(row) else {
                app.push_notice(format!("no task at row {row}"));
                return;
            };
            if let Err(e) = gateway.toggle_complete(&task.id, task.completed).await {
                app.push_notice(e.to_string());
            }
        }
        Command::Delete(row) => {
            let Some(task) = app.task_at(row) else {
                app.push_notice(format!("no task at row {row}"));
                return;
            };
            if let Err(e) = gateway.delete_task(&task.id).await {
                app.push_notice(e.to_string());
            }
        }
        Command::Sort(key) => app.set_sort(key),
        Command::Page(page) => app.go_to_page(page),
        Command::Export => {
            app.export();
        }
        Command::Help => app.push_notice(HELP_TEXT),
        Command::Quit => app.should_quit = true,
    }
}
