//! Account command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use secrecy::SecretString;
use serde::Serialize;
use tabled::Tabled;

use medkit_domain::{Account, AccountManager, AccountProfile, Identity};

use crate::cli::{AccountsArgs, AccountsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::store::Session;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "")]
    primary: String,
    #[tabled(rename = "Identity")]
    identity: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Serialized listing entry: the stored profile plus the primary flag.
#[derive(Serialize)]
struct AccountEntry {
    #[serde(flatten)]
    profile: AccountProfile,
    primary: bool,
}

impl AccountEntry {
    fn collect(manager: &AccountManager) -> Vec<Self> {
        let primary = manager.primary();
        let view = manager.subscribe();
        view.members()
            .iter()
            .map(|account| Self {
                profile: account.profile(),
                primary: primary.as_ref().is_some_and(|p| Arc::ptr_eq(p, account)),
            })
            .collect()
    }
}

fn account_detail(entry: &AccountEntry) -> String {
    format!(
        "Identity:    {}\nType:        {}\nDescription: {}\nPrimary:     {}",
        entry.profile.identity,
        entry.profile.identity.kind,
        entry.profile.description.as_deref().unwrap_or("-"),
        output::flag(entry.primary, false),
    )
}

fn member(manager: &AccountManager, identity: &Identity) -> Result<Arc<Account>, CliError> {
    manager.account(identity).ok_or_else(|| CliError::NotFound {
        resource_type: "account".into(),
        identifier: identity.to_string(),
        list_command: "accounts list".into(),
    })
}

fn read_secret(secret: Option<String>, global: &GlobalOpts) -> Result<SecretString, CliError> {
    if let Some(secret) = secret {
        return Ok(SecretString::from(secret));
    }
    if global.yes || !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: "pass --secret or set MEDKIT_SECRET in non-interactive mode".into(),
        });
    }
    let secret = dialoguer::Password::new()
        .with_prompt("Account secret")
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))?;
    Ok(SecretString::from(secret))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: AccountsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let manager = session.runtime().accounts();

    match args.command {
        AccountsCommand::List => {
            let entries = AccountEntry::collect(manager);
            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &entries,
                |e| AccountRow {
                    primary: output::primary_marker(e.primary, color),
                    identity: e.profile.identity.name.clone(),
                    kind: e.profile.identity.kind.to_string(),
                    description: e.profile.description.clone().unwrap_or_default(),
                },
                |e| e.profile.identity.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountsCommand::Add {
            identity,
            description,
            secret,
        } => {
            let identity = util::parse_identity(&identity)?;
            let secret = read_secret(secret, global)?;
            let account = manager
                .add_account(&identity, description.as_deref(), &secret)
                .await?;
            output::status(global, &format!("Account '{}' added", account.identity()));
            Ok(())
        }

        AccountsCommand::Remove { identity } => {
            let identity = util::parse_identity(&identity)?;
            if !util::confirm(
                &format!("Remove account '{identity}'?"),
                "accounts remove",
                global,
            )? {
                return Ok(());
            }
            manager.remove_account(&identity).await?;
            output::status(global, &format!("Account '{identity}' removed"));
            Ok(())
        }

        AccountsCommand::Primary { identity, clear } => {
            if clear {
                manager.update_primary(None).await?;
                output::status(global, "Primary account cleared");
                return Ok(());
            }

            if let Some(identity) = identity {
                let identity = util::parse_identity(&identity)?;
                let account = member(manager, &identity)?;
                manager.update_primary(Some(&account)).await?;
                output::status(global, &format!("Primary account set to '{identity}'"));
                return Ok(());
            }

            let Some(primary) = manager.primary() else {
                if !global.quiet {
                    eprintln!("No primary account");
                }
                return Ok(());
            };
            let entry = AccountEntry {
                profile: primary.profile(),
                primary: true,
            };
            let out = output::render_single(&global.output, &entry, account_detail, |e| {
                e.profile.identity.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountsCommand::Describe {
            identity,
            description,
        } => {
            let identity = util::parse_identity(&identity)?;
            let account = member(manager, &identity)?;
            let cleared = description.is_none();
            account.update_description(description).await?;
            let verb = if cleared { "cleared" } else { "updated" };
            output::status(global, &format!("Description for '{identity}' {verb}"));
            Ok(())
        }
    }
}
