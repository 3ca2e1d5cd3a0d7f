//! Shared configuration for MedKit tools.
//!
//! TOML profiles, layered loading (defaults, file, `MEDKIT_` environment)
//! and translation into a `medkit_domain::RuntimeConfig` plus a backend
//! selection. The domain crate never reads files; this crate does.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use medkit_domain::{NameFormat, RuntimeConfig};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "MEDKIT_CONFIG";

/// Profile used when nothing else selects one.
pub const DEFAULT_PROFILE: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' is not defined")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub name_format: NameFormat,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            name_format: NameFormat::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// Which backend a profile runs against.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    /// Rejects every mutation; nothing is stored.
    #[default]
    Default,
    /// In-memory store, optionally loaded from and saved to a JSON file.
    Memory,
}

/// A named profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub backend: BackendKind,

    /// JSON store file for the memory backend.
    pub store: Option<PathBuf>,

    /// Overrides `defaults.name_format`.
    pub name_format: Option<NameFormat>,
}

/// A profile with defaults applied, ready to build a runtime from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProfile {
    pub name: String,
    pub backend: BackendKind,
    pub store: Option<PathBuf>,
    pub runtime: RuntimeConfig,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `MEDKIT_CONFIG`, else platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("dev", "medkit", "medkit").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("medkit");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file. A missing file yields the defaults.
///
/// Environment overrides use `__` as the nesting separator, for example
/// `MEDKIT_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MEDKIT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile resolution ──────────────────────────────────────────────

impl Config {
    /// Name of the profile to use: the explicit one, else `default_profile`.
    pub fn active_profile_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE)
    }

    /// Resolve a profile and apply defaults.
    ///
    /// The default profile may be left undefined, in which case it runs
    /// against the stub backend. Any other undefined name is an error.
    pub fn resolve_profile(&self, explicit: Option<&str>) -> Result<ResolvedProfile, ConfigError> {
        let name = self.active_profile_name(explicit);
        let profile = match self.profiles.get(name) {
            Some(profile) => profile.clone(),
            None if name == DEFAULT_PROFILE => Profile::default(),
            None => {
                return Err(ConfigError::UnknownProfile {
                    profile: name.into(),
                });
            }
        };

        if profile.backend == BackendKind::Default && profile.store.is_some() {
            return Err(ConfigError::Validation {
                field: format!("profiles.{name}.store"),
                reason: "a store file requires backend = \"memory\"".into(),
            });
        }

        let name_format = profile.name_format.unwrap_or(self.defaults.name_format);
        Ok(ResolvedProfile {
            name: name.to_owned(),
            backend: profile.backend,
            store: profile.store,
            runtime: RuntimeConfig::default().with_name_format(name_format),
        })
    }
}
