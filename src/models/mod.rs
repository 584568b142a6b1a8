//! Data models for the workshopdl application.
//!
//! This module contains the configuration structures and the per-run lookup
//! index derived from them:
//! - [`Config`]: SteamCMD location, login credentials and the apps/mods to
//!   fetch, loaded from `.workshopdl.yaml`
//! - [`DestinationIndex`]: read-only app id → destination mapping built once
//!   per download run
//!
//! # Architecture Note
//!
//! The models are designed to be:
//! - **Serializable**: config structs derive `Serialize`/`Deserialize` for
//!   YAML persistence
//! - **Explicit**: parsed results flow through values (events, the index),
//!   never through process-wide state

pub mod config;

pub use config::{App, Config, Destination, DestinationIndex, Login, Mod, Steam, default_steamcmd_path};
