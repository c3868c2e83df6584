//! Configuration system for the `Taskboard` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};

use taskboard_proto::task::DEFAULT_COLLECTION;

use crate::export::{DEFAULT_DATE_FORMAT, ExportOptions, ExportScope};
use crate::tasks::{SortKey, TASKS_PER_PAGE};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    store: StoreFileConfig,
    view: ViewFileConfig,
    export: ExportFileConfig,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StoreFileConfig {
    collection: Option<String>,
}

/// `[view]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ViewFileConfig {
    page_size: Option<usize>,
    default_sort: Option<SortKey>,
    clamp_page: Option<bool>,
}

/// `[export]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ExportFileConfig {
    dir: Option<PathBuf>,
    date_format: Option<String>,
    scope: Option<ExportScope>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    // -- Store --
    /// Document collection holding the tasks.
    pub collection: String,

    // -- View --
    /// Tasks per page; never zero.
    pub page_size: usize,
    /// Sort key selected at startup.
    pub default_sort: SortKey,
    /// Pull a stale page index back into range when the task set shrinks.
    pub clamp_page: bool,

    // -- Export --
    /// Directory `tasks.csv` is written to.
    pub export_dir: PathBuf,
    /// strftime-style pattern for deadlines in the export.
    pub export_date_format: String,
    /// Which tasks an export covers.
    pub export_scope: ExportScope,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            page_size: TASKS_PER_PAGE,
            default_sort: SortKey::default(),
            clamp_page: true,
            export_dir: PathBuf::from("."),
            export_date_format: DEFAULT_DATE_FORMAT.to_string(),
            export_scope: ExportScope::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path
    /// (`~/.config/taskboard/config.toml`) is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            collection: cli
                .collection
                .clone()
                .or_else(|| file.store.collection.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.collection),
            page_size: cli
                .page_size
                .or(file.view.page_size)
                .filter(|&size| size > 0)
                .unwrap_or(defaults.page_size),
            default_sort: cli
                .sort
                .or(file.view.default_sort)
                .unwrap_or(defaults.default_sort),
            clamp_page: file.view.clamp_page.unwrap_or(defaults.clamp_page),
            export_dir: cli
                .export_dir
                .clone()
                .or_else(|| file.export.dir.clone())
                .unwrap_or(defaults.export_dir),
            export_date_format: file
                .export
                .date_format
                .clone()
                .unwrap_or(defaults.export_date_format),
            export_scope: file.export.scope.unwrap_or(defaults.export_scope),
        }
    }

    /// Export rendering options in the local UTC offset.
    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            date_format: self.export_date_format.clone(),
            ..ExportOptions::default()
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Personal task tracker for the terminal")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Document collection holding the tasks.
    #[arg(long, env = "TASKBOARD_COLLECTION")]
    pub collection: Option<String>,

    /// Tasks shown per page.
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Initial sort key (`created` or `deadline`).
    #[arg(long, value_parser = parse_sort_key)]
    pub sort: Option<SortKey>,

    /// Directory the CSV export is written to.
    #[arg(long, env = "TASKBOARD_EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn parse_sort_key(value: &str) -> Result<SortKey, String> {
    SortKey::parse(value)
        .ok_or_else(|| format!("unknown sort key `{value}` (expected `created` or `deadline`)"))
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskboard").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
