//! Integration tests for the task pipeline.
//!
//! Drives the terminal command layer end to end against the in-process
//! backend: sign in, create, toggle, delete, page and export, with every
//! visible change arriving through the live task feed.
//!
//! Verification command: `cargo test --test task_pipeline`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};

use taskboard::app::{self, App, Command, SIGN_IN_FIRST};
use taskboard::auth::AuthFlow;
use taskboard::backend::memory::MemoryBackend;
use taskboard::backend::AuthProvider;
use taskboard::config::ClientConfig;
use taskboard::export::{CSV_HEADER, EXPORT_FILE_NAME, ExportOptions};
use taskboard::session::SessionTracker;
use taskboard::tasks::{TaskFeed, TaskGateway, TaskSet};
use taskboard_proto::TaskId;

const WAIT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Everything the binary wires together, minus stdin and stdout.
struct Harness {
    backend: Arc<MemoryBackend>,
    session: SessionTracker,
    auth: AuthFlow<MemoryBackend>,
    gateway: TaskGateway<MemoryBackend>,
    feed: TaskFeed,
    app: App,
    export_dir: PathBuf,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    fn with_config(mut config: ClientConfig) -> Self {
        let export_dir = std::env::temp_dir().join(format!("taskboard-pipeline-{}", TaskId::new()));
        config.export_dir.clone_from(&export_dir);

        let backend = MemoryBackend::shared();
        let session = SessionTracker::new(backend.session());
        let auth = AuthFlow::new(Arc::clone(&backend));
        let gateway = TaskGateway::new(
            Arc::clone(&backend),
            session.clone(),
            config.collection.clone(),
        );
        let feed = TaskFeed::spawn(Arc::clone(&backend), &session, config.collection.clone());
        let app = App::new(&config).with_export_options(ExportOptions::utc("%Y-%m-%d"));
        Self {
            backend,
            session,
            auth,
            gateway,
            feed,
            app,
            export_dir,
        }
    }

    async fn run(&mut self, line: &str) {
        let command = Command::parse(line).unwrap().unwrap();
        app::execute(&mut self.app, command, &self.session, &self.auth, &self.gateway).await;
    }

    /// Waits for a feed snapshot matching `pred` and hands it to the app.
    async fn settle(&mut self, pred: impl FnMut(&TaskSet) -> bool) {
        let set = tokio::time::timeout(WAIT, self.feed.wait_for(pred))
            .await
            .expect("feed did not settle in time")
            .expect("feed stopped");
        self.app.apply_task_set(set);
    }

    async fn sign_in(&mut self) {
        self.run("signup user@example.com secret1").await;
        self.settle(|s| s.owner.is_some()).await;
        assert!(self.app.is_signed_in());
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.export_dir);
    }
}

fn tomorrow() -> String {
    Utc::now()
        .date_naive()
        .checked_add_days(Days::new(1))
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_toggle_export() {
    let mut h = Harness::new();
    h.sign_in().await;

    h.run(&format!("add {} Shopping Buy milk", tomorrow())).await;
    assert!(h.app.form_error.is_none(), "{:?}", h.app.form_error);
    assert!(h.app.input.is_empty(), "form resets after create");
    h.settle(|s| s.len() == 1).await;

    let task = h.app.task_at(1).unwrap();
    assert_eq!(task.text, "Buy milk");
    assert!(!task.completed);

    h.run("toggle 1").await;
    h.settle(|s| s.tasks.iter().any(|t| t.completed)).await;
    assert!(h.app.task_at(1).unwrap().completed);

    h.run("export").await;
    let path = h.export_dir.join(EXPORT_FILE_NAME);
    let csv = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = csv.split('\n').collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], CSV_HEADER);
    assert!(lines[1].starts_with(&format!("Buy milk,Shopping,{}", tomorrow())));
    assert!(lines[1].ends_with(",Yes"));
}

#[tokio::test]
async fn delete_removes_exactly_one() {
    let mut h = Harness::new();
    h.sign_in().await;
    for text in ["one", "two", "three"] {
        h.run(&format!("add {} Work {text}", tomorrow())).await;
    }
    h.settle(|s| s.len() == 3).await;

    let doomed = h.app.task_at(2).unwrap();
    h.run("delete 2").await;
    h.settle(|s| s.len() == 2).await;

    assert!(h.app.task_set().find(&doomed.id).is_none());
    assert_eq!(h.backend.document_count("task-db"), 2);
}

#[tokio::test]
async fn invalid_form_keeps_input_and_writes_nothing() {
    let mut h = Harness::new();
    h.sign_in().await;

    h.run("add 2000-01-01 Work too late").await;
    assert_eq!(
        h.app.form_error.as_deref(),
        Some("Deadline cannot be in the past")
    );
    assert_eq!(h.app.input, "too late");

    h.run(&format!("add {} Garden weeds", tomorrow())).await;
    assert_eq!(
        h.app.form_error.as_deref(),
        Some("Please select a valid category")
    );

    h.run("add").await;
    assert_eq!(
        h.app.form_error.as_deref(),
        Some("Task must be between 1 and 100 characters")
    );
    assert_eq!(h.backend.document_count("task-db"), 0);
}

#[tokio::test]
async fn empty_export_only_notifies() {
    let mut h = Harness::new();
    h.sign_in().await;
    h.app.take_notices();

    h.run("export").await;
    assert_eq!(h.app.take_notices(), vec!["No tasks to export!"]);
    assert!(!h.export_dir.join(EXPORT_FILE_NAME).exists());
}

#[tokio::test]
async fn task_commands_need_a_session() {
    let mut h = Harness::new();
    h.run(&format!("add {} Work sneaky", tomorrow())).await;
    h.run("export").await;
    assert_eq!(h.app.take_notices(), vec![SIGN_IN_FIRST, SIGN_IN_FIRST]);
    assert_eq!(h.backend.document_count("task-db"), 0);
}

#[tokio::test]
async fn deleting_the_last_row_of_a_page_pulls_the_page_back() {
    let mut h = Harness::new();
    h.sign_in().await;
    for i in 0..6 {
        h.run(&format!("add {} Personal task {i}", tomorrow())).await;
    }
    h.settle(|s| s.len() == 6).await;

    h.run("page 2").await;
    assert_eq!(h.app.view().visible.len(), 1);
    assert_eq!(h.app.view().page_numbers(), vec![1, 2]);

    h.run("delete 1").await;
    h.settle(|s| s.len() == 5).await;
    assert_eq!(h.app.current_page, 1);
    assert_eq!(h.app.view().visible.len(), 5);
    assert!(h.app.view().page_numbers().is_empty());
}

#[tokio::test]
async fn stale_page_renders_empty_without_clamping() {
    let config = ClientConfig {
        clamp_page: false,
        ..ClientConfig::default()
    };
    let mut h = Harness::with_config(config);
    h.sign_in().await;
    for i in 0..6 {
        h.run(&format!("add {} Personal task {i}", tomorrow())).await;
    }
    h.settle(|s| s.len() == 6).await;

    h.run("page 2").await;
    h.run("delete 1").await;
    h.settle(|s| s.len() == 5).await;
    assert_eq!(h.app.current_page, 2);
    assert!(h.app.view().visible.is_empty());
}

#[tokio::test]
async fn sort_by_deadline_orders_rows() {
    let mut h = Harness::new();
    h.sign_in().await;
    let today = Utc::now().date_naive();
    let far = today.checked_add_days(Days::new(30)).unwrap();
    let near = today.checked_add_days(Days::new(2)).unwrap();
    h.run(&format!("add {} Work later", far.format("%Y-%m-%d"))).await;
    h.run(&format!("add {} Work sooner", near.format("%Y-%m-%d"))).await;
    h.settle(|s| s.len() == 2).await;

    h.run("sort deadline").await;
    assert_eq!(h.app.task_at(1).unwrap().text, "sooner");
    assert_eq!(h.app.task_at(2).unwrap().text, "later");
}
