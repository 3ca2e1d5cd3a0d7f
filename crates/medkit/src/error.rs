//! CLI error types with miette diagnostics.
//!
//! Maps `DomainError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use medkit_config::ConfigError;
use medkit_domain::DomainError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONFLICT: i32 = 6;
    pub const BACKEND: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(medkit::not_found),
        help("Run: medkit {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(medkit::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("Malformed {resource_type}: {message}")]
    #[diagnostic(
        code(medkit::malformed),
        help("Check the document against the {resource_type} profile format.")
    )]
    Malformed {
        resource_type: String,
        message: String,
    },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Operation '{operation}' is not supported by the '{profile}' profile")]
    #[diagnostic(
        code(medkit::unsupported),
        help(
            "The default backend rejects every change.\n\
             Use a memory store: medkit --store patients.json ...\n\
             Or configure one with: medkit config init --backend memory"
        )
    )]
    Unsupported { operation: String, profile: String },

    #[error("Backend error: {message}")]
    #[diagnostic(code(medkit::backend))]
    Backend { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(medkit::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(medkit::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: medkit config init --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(medkit::config))]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(medkit::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid store file {path}: {source}")]
    #[diagnostic(
        code(medkit::store),
        help("The store is a JSON document with `accounts`, `primary` and `patients`.")
    )]
    Store {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Backend { .. } => exit_code::BACKEND,
            Self::Validation { .. }
            | Self::Malformed { .. }
            | Self::ProfileNotFound { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to an unsupported-operation error.
    pub fn with_profile(self, name: &str) -> Self {
        match self {
            Self::Unsupported { operation, .. } => Self::Unsupported {
                operation,
                profile: name.to_owned(),
            },
            other => other,
        }
    }
}

// ── DomainError → CliError mapping ───────────────────────────────────

impl From<DomainError> for CliError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotSupported { operation } => CliError::Unsupported {
                operation,
                profile: "current".into(),
            },

            DomainError::Duplicate {
                resource,
                identifier,
            } => CliError::Conflict {
                resource_type: resource,
                identifier,
            },

            DomainError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{entity_type}s list"),
                resource_type: entity_type,
                identifier,
            },

            DomainError::MalformedRepresentation {
                entity_type,
                message,
            } => CliError::Malformed {
                resource_type: entity_type,
                message,
            },

            DomainError::Backend(source) => CliError::Backend {
                message: source.to_string(),
            },

            DomainError::Abandoned => CliError::Backend {
                message: "operation abandoned before reporting an outcome".into(),
            },
        }
    }
}
