//! `Taskboard`: personal task tracker for the terminal.
//!
//! Reads commands line by line from stdin and redraws the task list after
//! every command and every store change. Configuration via CLI flags,
//! environment variables, or config file (`~/.config/taskboard/config.toml`).
//!
//! ```bash
//! cargo run --bin taskboard
//!
//! # Ten tasks per page, exports under ~/exports
//! cargo run --bin taskboard -- --page-size 10 --export-dir ~/exports
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing_appender::non_blocking::WorkerGuard;

use taskboard::app::{self, App, Command};
use taskboard::auth::AuthFlow;
use taskboard::backend::AuthProvider;
use taskboard::backend::memory::MemoryBackend;
use taskboard::config::{CliArgs, ClientConfig};
use taskboard::session::SessionTracker;
use taskboard::tasks::{TaskFeed, TaskGateway};

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // CLI args > env > config file > defaults.
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Logs go to a file; stdout belongs to the task list.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(collection = %config.collection, "taskboard starting");

    let backend = MemoryBackend::shared();
    let session = SessionTracker::new(backend.session());
    let auth = AuthFlow::new(Arc::clone(&backend));
    let gateway = TaskGateway::new(
        Arc::clone(&backend),
        session.clone(),
        config.collection.clone(),
    );
    let mut feed = TaskFeed::spawn(Arc::clone(&backend), &session, config.collection.clone());

    let mut app = App::new(&config);
    app.apply_task_set(feed.current());

    let result = run_app(&mut app, &mut feed, &session, &auth, &gateway).await;

    tracing::info!("taskboard exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskboard.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main loop: redraw, then wait for either a feed snapshot or an input line.
async fn run_app(
    app: &mut App,
    feed: &mut TaskFeed,
    session: &SessionTracker,
    auth: &AuthFlow<MemoryBackend>,
    gateway: &TaskGateway<MemoryBackend>,
) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    app.push_notice("Type `help` for the command list.");

    loop {
        draw(&mut stdout, app).await?;

        tokio::select! {
            set = feed.changed() => {
                let Some(set) = set else {
                    tracing::warn!("task feed stopped");
                    return Ok(());
                };
                app.apply_task_set(set);
            }
            line = lines.next_line() => {
                // EOF ends the session like `quit`.
                let Some(line) = line? else {
                    return Ok(());
                };
                match Command::parse(&line) {
                    Ok(Some(command)) => {
                        app::execute(app, command, session, auth, gateway).await;
                    }
                    Ok(None) => {}
                    Err(e) => app.push_notice(e.to_string()),
                }
                if app.should_quit {
                    return Ok(());
                }
            }
        }
    }
}

async fn draw(stdout: &mut Stdout, app: &mut App) -> io::Result<()> {
    let mut frame = String::new();
    for notice in app.take_notices() {
        frame.push_str("* ");
        frame.push_str(&notice);
        frame.push('\n');
    }
    frame.push_str(&app.render());
    frame.push_str("> ");
    stdout.write_all(frame.as_bytes()).await?;
    stdout.flush().await
}
