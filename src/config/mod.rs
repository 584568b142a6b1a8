use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

use crate::models::{Config, default_steamcmd_path};

/// Default config file name, looked up in `$HOME` and the working directory.
pub const CONFIG_FILE_NAME: &str = ".workshopdl.yaml";

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `SWD_STEAM__LOGIN__USERNAME`.
pub const ENV_PREFIX: &str = "SWD";

/// Configuration manager for locating, layering and persisting the YAML
/// configuration file.
///
/// Values are resolved in three layers, each overriding the previous:
/// built-in defaults (platform SteamCMD path, anonymous login), the config
/// file if one is found, and `SWD_*` environment variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    explicit_path: Option<Utf8PathBuf>,
}

impl ConfigManager {
    /// Create a new ConfigManager.
    ///
    /// # Arguments
    /// * `explicit_path` - Config file passed on the command line; when
    ///   `None`, the default locations are searched
    pub fn new(explicit_path: Option<Utf8PathBuf>) -> Self {
        Self { explicit_path }
    }

    /// The config file this manager will read, if any exists.
    ///
    /// Search order: the explicit path, `$HOME/.workshopdl.yaml`, then
    /// `./.workshopdl.yaml`.
    pub fn locate(&self) -> Option<Utf8PathBuf> {
        if let Some(path) = &self.explicit_path {
            return Some(path.clone());
        }

        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            let candidate = Utf8PathBuf::from(home).join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        None
    }

    /// Load the layered configuration.
    ///
    /// A missing config file is not an error; defaults and environment
    /// overrides alone can describe a valid (if empty) run.
    pub fn load(&self) -> Result<Config> {
        let mut builder = config::Config::builder()
            .set_default("steam.cmd", default_steamcmd_path())?
            .set_default("steam.login.username", "anonymous")?
            .set_default("steam.login.password", "")?;

        let located = self.locate();
        if let Some(path) = &located {
            builder = builder
                .add_source(config::File::from(path.as_std_path()).format(config::FileFormat::Yaml));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let cfg: Config = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;

        match &located {
            Some(path) => tracing::info!(path = %path, "loaded config file"),
            None => tracing::warn!("no config file found, using defaults and environment only"),
        }

        Ok(cfg)
    }

    /// Persist a configuration as YAML to the given path.
    pub fn save(&self, cfg: &Config, path: &Utf8Path) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(cfg).context("failed to serialize configuration to YAML")?;

        fs::write(path, yaml_string)
            .with_context(|| format!("failed to write configuration: {path}"))?;

        tracing::info!(path = %path, "saved configuration");
        Ok(())
    }
}
