// workshopdl - Steam Workshop mod downloader
//
// This is the library crate containing the download orchestration engine and
// its supporting pieces. The binary crate (main.rs) provides the CLI entry
// point.

pub mod config;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod paths;
pub mod replicate;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{App, Config, DestinationIndex, Login, Mod, Steam};
pub use services::{DownloadError, DownloadReport, DownloadService, LineClassifier, PathStyle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
