//! Integration tests for sign-up, log-in and log-out.
//!
//! Runs the auth commands through the terminal command layer and checks the
//! inline errors, notices and the session the task feed follows.
//!
//! Verification command: `cargo test --test auth_flow`

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use taskboard::app::{self, App, Command, LOG_OUT_FIRST, SIGN_IN_FIRST, TASKS_LOADING};
use taskboard::auth::{AuthFlow, LOGGED_IN_NOTICE, LOGGED_OUT_NOTICE, SIGNED_UP_NOTICE};
use taskboard::backend::AuthProvider;
use taskboard::backend::memory::MemoryBackend;
use taskboard::config::ClientConfig;
use taskboard::session::SessionTracker;
use taskboard::tasks::{TaskFeed, TaskGateway, TaskSet};

const WAIT: Duration = Duration::from_secs(2);
const COLLECTION: &str = "task-db";
const FAR_DEADLINE: &str = "2999-01-01";

struct Harness {
    backend: Arc<MemoryBackend>,
    session: SessionTracker,
    auth: AuthFlow<MemoryBackend>,
    gateway: TaskGateway<MemoryBackend>,
    feed: TaskFeed,
    app: App,
}

impl Harness {
    fn new() -> Self {
        let config = ClientConfig::default();
        let backend = MemoryBackend::shared();
        let session = SessionTracker::new(backend.session());
        let auth = AuthFlow::new(Arc::clone(&backend));
        let gateway = TaskGateway::new(
            Arc::clone(&backend),
            session.clone(),
            config.collection.clone(),
        );
        let feed = TaskFeed::spawn(Arc::clone(&backend), &session, config.collection.clone());
        Self {
            backend,
            session,
            auth,
            gateway,
            feed,
            app: App::new(&config),
        }
    }

    async fn run(&mut self, line: &str) {
        let command = Command::parse(line).unwrap().unwrap();
        app::execute(&mut self.app, command, &self.session, &self.auth, &self.gateway).await;
    }

    async fn settle(&mut self, pred: impl FnMut(&TaskSet) -> bool) {
        let set = tokio::time::timeout(WAIT, self.feed.wait_for(pred))
            .await
            .expect("feed did not settle in time")
            .expect("feed stopped");
        self.app.apply_task_set(set);
    }
}

#[tokio::test]
async fn sign_up_signs_in_and_clears_the_form() {
    let mut h = Harness::new();
    h.run("signup alice@example.com secret1").await;

    assert_eq!(h.app.take_notices(), vec![SIGNED_UP_NOTICE]);
    assert!(h.app.email.is_empty());
    assert!(h.app.password.is_empty());
    assert!(h.app.auth_error.is_none());
    assert!(h.session.is_signed_in());

    h.settle(|s| s.owner.is_some()).await;
    assert!(h.app.is_signed_in());
}

#[tokio::test]
async fn missing_credentials_never_reach_the_provider() {
    let mut h = Harness::new();
    h.run("login alice@example.com").await;

    assert_eq!(
        h.app.auth_error.as_deref(),
        Some("Email and Password are required")
    );
    assert_eq!(h.app.email, "alice@example.com", "fields kept on failure");
    assert!(h.app.take_notices().is_empty());
    assert!(!h.session.is_signed_in());
}

#[tokio::test]
async fn provider_errors_are_shown_verbatim() {
    let mut h = Harness::new();

    h.run("signup not-an-email secret1").await;
    assert_eq!(h.app.auth_error.as_deref(), Some("invalid email address"));

    h.run("signup alice@example.com short").await;
    assert_eq!(
        h.app.auth_error.as_deref(),
        Some("password should be at least 6 characters")
    );

    h.run("login alice@example.com secret1").await;
    assert_eq!(
        h.app.auth_error.as_deref(),
        Some("invalid email or password")
    );
    assert!(!h.session.is_signed_in());
}

#[tokio::test]
async fn duplicate_sign_up_is_rejected() {
    let mut h = Harness::new();
    h.run("signup alice@example.com secret1").await;
    h.settle(|s| s.owner.is_some()).await;
    h.run("logout").await;
    h.settle(|s| s.owner.is_none()).await;

    h.run("signup alice@example.com secret1").await;
    assert_eq!(h.app.auth_error.as_deref(), Some("email already in use"));
}

#[tokio::test]
async fn log_out_then_log_in_again() {
    let mut h = Harness::new();
    h.run("signup alice@example.com secret1").await;
    let alice = h.session.current().unwrap();
    h.settle(|s| s.owner.is_some()).await;

    h.run("logout").await;
    h.settle(|s| s.owner.is_none()).await;
    assert!(!h.app.is_signed_in());

    h.run("login alice@example.com secret1").await;
    h.settle(|s| s.owner.is_some()).await;
    assert_eq!(h.app.task_set().owner, Some(alice));

    assert_eq!(
        h.app.take_notices(),
        vec![SIGNED_UP_NOTICE, LOGGED_OUT_NOTICE, LOGGED_IN_NOTICE]
    );
}

#[tokio::test]
async fn two_accounts_get_distinct_identities() {
    let h = Harness::new();
    let alice = h
        .backend
        .create_account("alice@example.com", "secret1")
        .await
        .unwrap();
    let bob = h
        .backend
        .create_account("bob@example.com", "secret1")
        .await
        .unwrap();
    assert_ne!(alice, bob);
    assert_eq!(h.session.current(), Some(bob));
}

#[tokio::test]
async fn switching_accounts_needs_a_log_out() {
    let mut h = Harness::new();
    h.run("signup alice@example.com secret1").await;
    let alice = h.session.current().unwrap();
    h.run(&format!("add {FAR_DEADLINE} Work keep me")).await;
    h.settle(|s| s.len() == 1).await;
    h.app.take_notices();

    h.run("signup bob@example.com secret2").await;
    h.run("login alice@example.com secret1").await;

    assert_eq!(h.app.take_notices(), vec![LOG_OUT_FIRST, LOG_OUT_FIRST]);
    assert!(h.app.auth_error.is_none());
    assert_eq!(h.session.current(), Some(alice));

    // bob was never created, so logging in as bob later fails.
    h.run("logout").await;
    h.run("login bob@example.com secret2").await;
    assert_eq!(
        h.app.auth_error.as_deref(),
        Some("invalid email or password")
    );
    assert_eq!(h.backend.document_count(COLLECTION), 1);
}

#[tokio::test]
async fn rows_from_the_previous_account_are_not_addressable() {
    let mut h = Harness::new();
    h.run("signup bob@example.com secret2").await;
    let bob = h.session.current().unwrap();
    h.run("logout").await;

    h.run("signup alice@example.com secret1").await;
    h.run(&format!("add {FAR_DEADLINE} Work alice only")).await;
    h.settle(|s| s.len() == 1).await;

    // The app still shows alice's rows while bob's session starts.
    h.run("logout").await;
    h.run("login bob@example.com secret2").await;
    assert_eq!(h.session.current(), Some(bob.clone()));
    h.app.take_notices();

    h.run("toggle 1").await;
    h.run("delete 1").await;
    h.run("export").await;
    assert_eq!(
        h.app.take_notices(),
        vec![TASKS_LOADING, TASKS_LOADING, TASKS_LOADING]
    );
    assert_eq!(h.backend.document_count(COLLECTION), 1);

    h.settle(|s| s.owner.as_ref() == Some(&bob)).await;
    h.run("delete 1").await;
    assert_eq!(h.app.take_notices(), vec!["no task at row 1"]);
    assert_eq!(h.backend.document_count(COLLECTION), 1);
}

#[tokio::test]
async fn task_commands_work_before_the_feed_catches_up() {
    let mut h = Harness::new();
    h.run("signup alice@example.com secret1").await;
    assert!(h.app.task_set().owner.is_none(), "feed not applied yet");

    h.run(&format!("add {FAR_DEADLINE} Personal right away")).await;
    assert!(h.app.form_error.is_none(), "{:?}", h.app.form_error);
    assert!(!h.app.take_notices().iter().any(|n| n == SIGN_IN_FIRST));
    assert_eq!(h.backend.document_count(COLLECTION), 1);

    h.settle(|s| s.len() == 1).await;
    assert_eq!(h.app.task_at(1).unwrap().text, "right away");
}

#[tokio::test]
async fn log_out_takes_effect_before_the_feed_empties() {
    let mut h = Harness::new();
    h.run("signup alice@example.com secret1").await;
    h.run(&format!("add {FAR_DEADLINE} Work stays")).await;
    h.settle(|s| s.len() == 1).await;

    h.run("logout").await;
    h.app.take_notices();
    h.run(&format!("add {FAR_DEADLINE} Work refused")).await;
    h.run("delete 1").await;
    assert_eq!(h.app.take_notices(), vec![SIGN_IN_FIRST, SIGN_IN_FIRST]);
    assert_eq!(h.backend.document_count(COLLECTION), 1);
}
