//! Tracing setup for the command line.
//!
//! Everything goes to stderr so `compare` can print its report on stdout. A
//! daily rolling file is added when `ENABLE_FILE_LOGS` is set.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "cloze-similarity.log";

/// Target of the per-item events emitted when an embedding leaves an item
/// out. Silent at the default level; `--verbose` turns it on.
pub const DROPPED_ITEMS_TARGET: &str = "cloze_similarity::dropped";

/// Keeps the file writer flushing; drop it only at exit
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `RUST_LOG`-style filter
    pub filter: String,
    pub show_dropped: bool,
    /// Directory of the rolling log file, `None` for stderr only
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env(filter: &str) -> Self {
        let file_dir = file_logging_enabled().then(|| {
            PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()))
        });
        Self {
            filter: filter.to_string(),
            show_dropped: false,
            file_dir,
        }
    }

    /// The configured filter, falling back to `info` when it does not parse
    pub fn env_filter(&self) -> EnvFilter {
        let filter = EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"));
        if !self.show_dropped {
            return filter;
        }
        match format!("{DROPPED_ITEMS_TARGET}=debug").parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    }
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Installs the global subscriber
pub fn init_tracing(settings: &LogSettings) -> Option<FileLogGuard> {
    let stderr_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let file = settings.file_dir.as_ref().and_then(|dir| {
        if let Err(err) = std::fs::create_dir_all(dir) {
            eprintln!("failed to create log directory {}: {err}", dir.display());
            return None;
        }
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
        Some(tracing_appender::non_blocking(appender))
    });
    let (file_writer, guard) = file.unzip();
    let file_layer = file_writer.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard.map(|guard| FileLogGuard { _guard: guard })
}
