//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use medkit_domain::{Identifier, Identity, Patient, PatientDirectory};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Look up a patient by identifier through the directory.
pub async fn find_patient(
    directory: &PatientDirectory,
    identifier: &str,
) -> Result<Arc<Patient>, CliError> {
    Ok(directory
        .find_patient_with_identifier(&Identifier::new(identifier))
        .await?)
}

/// Parse `name` or `kind:name` into an account identity.
pub fn parse_identity(raw: &str) -> Result<Identity, CliError> {
    let identity: Identity = raw.parse().map_err(|_| CliError::Validation {
        field: "identity".into(),
        reason: format!(
            "'{raw}' has an unknown kind prefix; expected user, device, organization or service"
        ),
    })?;
    if identity.name.is_empty() {
        return Err(CliError::Validation {
            field: "identity".into(),
            reason: "name cannot be empty".into(),
        });
    }
    Ok(identity)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, global: &GlobalOpts) -> Result<bool, CliError> {
    if global.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(confirmed)
}

/// Read and parse a JSON document.
pub fn read_json_file(path: &Path) -> Result<serde_json::Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "file".into(),
        reason: format!("{}: invalid JSON: {e}", path.display()),
    })
}
