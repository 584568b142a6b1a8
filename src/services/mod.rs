//! Services module - the download orchestration engine.
//!
//! This module contains the core logic for driving SteamCMD and relocating
//! downloaded workshop items. The services are **interface-agnostic** and have
//! no dependencies on the CLI layer, making them testable and reusable.
//!
//! # Components
//!
//! - [`LineClassifier`]: turns single lines of SteamCMD output into
//!   [`DownloadEvent`]s. Pure and stateless; the path separator convention is
//!   selected via [`PathStyle`] so output captured on one platform can be
//!   parsed on another.
//!
//! - [`DownloadService`]: owns the SteamCMD process lifecycle for one run:
//!   - Building the scripted argument vector (login, download items, quit)
//!   - Streaming stdout through the classifier while stderr is drained for
//!     diagnostics only
//!   - Relocating each completed download concurrently with continued output
//!     consumption
//!   - Enforcing a single wall-clock deadline with forced termination
//!
//! # Data flow
//!
//! ```text
//! SteamCMD stdout -> LineClassifier -> DownloadEvent -> DestinationIndex
//!     lookup -> directory replication -> destination
//! ```
//!
//! Events move through an owned channel between the stdout reader and the
//! relocation loop; no task shares mutable state with another.

pub mod classify;
pub mod download;

pub use classify::{DownloadEvent, LineClassifier, PathStyle};
pub use download::{DownloadError, DownloadReport, DownloadService};
