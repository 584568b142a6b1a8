use anyhow::{Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::paths;

/// Top-level configuration: where SteamCMD lives, how to log in, and which
/// workshop items to fetch for which games.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub steam: Steam,

    /// Games with mods to download, in download order.
    #[serde(default)]
    pub apps: Vec<App>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Steam {
    /// SteamCMD executable path, e.g. /usr/games/steamcmd
    #[serde(default = "default_steamcmd_path")]
    pub cmd: String,

    #[serde(default)]
    pub login: Login,

    /// Wall-clock deadline for one download run, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Stop consuming output and terminate SteamCMD on the first relocation
    /// failure. When false the failure is still the run's outcome, but
    /// SteamCMD is left to finish on its own within the deadline.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Login {
    #[serde(default = "default_username")]
    pub username: String,

    /// Empty means anonymous mode; no password argument is passed at all.
    #[serde(default)]
    pub password: String,
}

impl Default for Login {
    fn default() -> Self {
        Self {
            username: default_username(),
            password: String::new(),
        }
    }
}

/// Masked display: the password never appears in logs.
impl fmt::Display for Login {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.password.is_empty() {
            write!(f, "{}", self.username)
        } else {
            write!(f, "{}:***", self.username)
        }
    }
}

impl Login {
    /// SteamCMD login arguments.
    pub fn cmd_args(&self) -> Vec<String> {
        if self.password.is_empty() {
            vec!["+login".to_string(), self.username.clone()]
        } else {
            vec!["+login".to_string(), self.username.clone(), self.password.clone()]
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    /// Name of the game
    #[serde(default)]
    pub name: String,

    /// Steam App ID
    pub id: String,

    /// Destination directory mods are relocated into
    pub path: String,

    /// Workshop items to download for this game
    #[serde(default)]
    pub mods: Vec<Mod>,
}

impl App {
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.clone()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mod {
    /// Name of the mod
    #[serde(default)]
    pub name: String,

    /// Steam Workshop ID
    pub id: String,
}

impl Config {
    /// Run every user-supplied path through the resolver, in place. Call
    /// before [`Config::validate`].
    pub fn resolve_paths(&mut self) -> Result<()> {
        self.steam.cmd = paths::resolve(&self.steam.cmd)?.into_string();
        for app in &mut self.apps {
            app.path = paths::resolve(&app.path)?.into_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let cmd = Utf8Path::new(&self.steam.cmd);
        if !cmd.is_file() {
            bail!("SteamCMD executable not found at {cmd}");
        }
        if self.steam.login.username.is_empty() {
            bail!("steam login username must not be empty");
        }

        let mut seen = HashSet::new();
        for app in &self.apps {
            if app.id.is_empty() {
                bail!("app {:?} has an empty id", app.name);
            }
            if !seen.insert(app.id.as_str()) {
                bail!("duplicate app id {}", app.id);
            }
            if !Utf8Path::new(&app.path).is_dir() {
                bail!("destination {} for app {} is not a directory", app.path, app.label());
            }
            for item in &app.mods {
                if item.id.is_empty() {
                    bail!("app {} has a mod with an empty workshop id", app.label());
                }
            }
        }
        Ok(())
    }

    /// The complete SteamCMD argument vector for one run: login first, one
    /// `workshop_download_item` triple per configured (app, mod) pair in
    /// configured order, `quit` last. SteamCMD executes these as a sequential
    /// script, so the order is part of the contract.
    pub fn steam_args(&self) -> Vec<String> {
        let mut args = self.steam.login.cmd_args();
        for app in &self.apps {
            for item in &app.mods {
                args.push("+workshop_download_item".to_string());
                args.push(app.id.clone());
                args.push(item.id.clone());
            }
        }
        args.push("+quit".to_string());
        args
    }

    /// Number of workshop items configured across all apps.
    pub fn item_count(&self) -> usize {
        self.apps.iter().map(|app| app.mods.len()).sum()
    }
}

/// Where a completed download for an app gets relocated to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub app_name: String,
    pub path: Utf8PathBuf,
}

/// Read-only mapping from app id to destination, built once per run before
/// SteamCMD starts and immutable afterwards.
#[derive(Debug, Clone)]
pub struct DestinationIndex {
    entries: IndexMap<String, Destination>,
}

impl DestinationIndex {
    pub fn build(apps: &[App]) -> Self {
        let mut entries = IndexMap::with_capacity(apps.len());
        for app in apps {
            entries.insert(
                app.id.clone(),
                Destination {
                    app_name: app.name.clone(),
                    path: Utf8PathBuf::from(&app.path),
                },
            );
        }
        Self { entries }
    }

    pub fn lookup(&self, app_id: &str) -> Option<&Destination> {
        self.entries.get(app_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn default_steamcmd_path() -> String {
    if cfg!(target_os = "windows") {
        r"C:\steamcmd\steamcmd.exe".to_string()
    } else if cfg!(target_os = "macos") {
        "/usr/local/bin/steamcmd".to_string()
    } else {
        "/usr/games/steamcmd".to_string()
    }
}

fn default_username() -> String {
    "anonymous".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_fail_fast() -> bool {
    true
}
