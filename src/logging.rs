use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Console log verbosity, mapped from the CLI flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Warnings and errors only (default)
    Warnings,
    /// Info output (`-v`)
    Verbose,
    /// Debug output including every SteamCMD line (`--vv`)
    Debug,
}

impl Verbosity {
    fn filter(self) -> EnvFilter {
        EnvFilter::new(match self {
            Verbosity::Warnings => "warn",
            Verbosity::Verbose => "info",
            Verbosity::Debug => "debug",
        })
    }
}

/// Setup console logging, optionally with a daily-rotating file appender.
///
/// # Arguments
/// * `verbosity` - Console log level
/// * `log_dir` - When set, logs are additionally written to daily-rotating
///   files in this directory (created if missing)
///
/// # Returns
/// A guard that must be held for the duration of the program to keep the
/// file writer flushing; `None` when no log directory was requested.
pub fn setup_logging(verbosity: Verbosity, log_dir: Option<&Utf8Path>) -> Result<Option<WorkerGuard>> {
    match log_dir {
        Some(dir) => {
            let console_layer = tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false);

            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory: {dir}"))?;
            }

            let file_appender = rolling::daily(dir.as_std_path(), "workshopdl");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No ANSI codes in log files
                .with_target(true);

            tracing_subscriber::registry()
                .with(verbosity.filter())
                .with(file_layer)
                .with(console_layer)
                .init();

            tracing::info!("logging initialized: dir={}, verbosity={:?}", dir, verbosity);
            Ok(Some(guard))
        }
        None => {
            let console_layer = tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false);

            tracing_subscriber::registry()
                .with(verbosity.filter())
                .with(console_layer)
                .init();
            Ok(None)
        }
    }
}
