//! CLI configuration: thin wrapper around `medkit_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--profile, --store).

use medkit_config::{BackendKind, ConfigError, ResolvedProfile};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use medkit_config::{Config, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Resolve the active profile, applying CLI flag overrides.
///
/// `--store` always wins and implies the memory backend.
pub fn resolve_profile(global: &GlobalOpts, config: &Config) -> Result<ResolvedProfile, CliError> {
    let mut resolved = config
        .resolve_profile(global.profile.as_deref())
        .map_err(|err| match err {
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: available_profiles(config),
            },
            other => CliError::Config(other),
        })?;

    if let Some(ref store) = global.store {
        resolved.backend = BackendKind::Memory;
        resolved.store = Some(store.clone());
    }
    Ok(resolved)
}
