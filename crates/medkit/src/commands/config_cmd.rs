//! Config subcommand handlers.

use std::io::IsTerminal;
use std::path::PathBuf;

use dialoguer::{Input, Select};

use medkit_config::BackendKind;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn parse_backend(raw: &str) -> Result<BackendKind, CliError> {
    raw.parse().map_err(|_| CliError::Validation {
        field: "backend".into(),
        reason: format!("expected 'default' or 'memory', got '{raw}'"),
    })
}

/// Values for `config init`, prompting for whatever was not given.
#[derive(Debug)]
struct InitAnswers {
    name: String,
    backend: BackendKind,
    store: Option<PathBuf>,
}

impl InitAnswers {
    fn gather(
        name: Option<String>,
        backend: Option<String>,
        store: Option<PathBuf>,
        interactive: bool,
    ) -> Result<Self, CliError> {
        let name = match name {
            Some(name) => name,
            None if interactive => Input::new()
                .with_prompt("Profile name")
                .default(medkit_config::DEFAULT_PROFILE.to_owned())
                .interact_text()
                .map_err(prompt_err)?,
            None => medkit_config::DEFAULT_PROFILE.to_owned(),
        };

        let backend = match backend {
            Some(raw) => parse_backend(&raw)?,
            None if store.is_some() => BackendKind::Memory,
            None if interactive => {
                let choices = &[
                    "memory (local JSON store)",
                    "default (read-only, rejects changes)",
                ];
                let selection = Select::new()
                    .with_prompt("Backend")
                    .items(choices)
                    .default(0)
                    .interact()
                    .map_err(prompt_err)?;
                if selection == 0 {
                    BackendKind::Memory
                } else {
                    BackendKind::Default
                }
            }
            None => BackendKind::Default,
        };

        let store = match (backend, store) {
            (BackendKind::Default, Some(_)) => {
                return Err(CliError::Validation {
                    field: "store-file".into(),
                    reason: "a store file requires the memory backend".into(),
                });
            }
            (BackendKind::Memory, None) if interactive => {
                let path: String = Input::new()
                    .with_prompt("Store file (empty for none)")
                    .allow_empty(true)
                    .interact_text()
                    .map_err(prompt_err)?;
                (!path.is_empty()).then(|| PathBuf::from(path))
            }
            (_, store) => store,
        };

        Ok(Self {
            name,
            backend,
            store,
        })
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |_| config::config_path().display().to_string(),
            );
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        // ── Init: guided profile setup ──────────────────────────────
        ConfigCommand::Init {
            name,
            backend,
            store_file,
        } => {
            let interactive = !global.yes && std::io::stdin().is_terminal();
            let answers = InitAnswers::gather(name, backend, store_file, interactive)?;

            let mut cfg = config::load_config()?;
            let profile = cfg.profiles.entry(answers.name.clone()).or_default();
            profile.backend = answers.backend;
            profile.store = answers.store;
            if cfg.profiles.len() == 1 {
                cfg.default_profile = Some(answers.name.clone());
            }

            let path = config::save_config(&cfg)?;
            output::status(
                global,
                &format!(
                    "Profile '{}' ({}) written to {}",
                    answers.name,
                    answers.backend,
                    path.display()
                ),
            );
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let default = cfg.active_profile_name(None);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: medkit config init");
                return Ok(());
            }
            let mut names: Vec<_> = cfg.profiles.keys().collect();
            names.sort();
            let lines: Vec<String> = names
                .into_iter()
                .map(|name| {
                    let marker = if name == default { " *" } else { "" };
                    format!("{name}{marker}")
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config()?;

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            output::status(global, &format!("Default profile set to '{name}'"));
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use medkit_config::{Config, Profile};

    use super::*;

    #[test]
    fn store_implies_memory_backend() {
        let answers =
            InitAnswers::gather(None, None, Some("ward.json".into()), false).unwrap();
        assert_eq!(answers.name, "default");
        assert_eq!(answers.backend, BackendKind::Memory);
        assert_eq!(answers.store, Some(PathBuf::from("ward.json")));
    }

    #[test]
    fn store_with_default_backend_is_rejected() {
        let err = InitAnswers::gather(
            Some("ward".into()),
            Some("default".into()),
            Some("ward.json".into()),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(parse_backend("postgres").is_err());
        assert_eq!(parse_backend("Memory").unwrap(), BackendKind::Memory);
    }

    #[test]
    fn profile_default_is_stub_backend() {
        assert_eq!(Profile::default().backend, BackendKind::Default);
        assert!(Config::default().profiles.is_empty());
    }
}
