//! Command dispatch: bridges CLI args -> runtime operations -> output formatting.

pub mod accounts;
pub mod config_cmd;
pub mod patients;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::store::Session;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let result = match cmd {
        Command::Patients(args) => patients::handle(session, args, global).await,
        Command::Accounts(args) => accounts::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    };
    result.map_err(|err| err.with_profile(session.profile_name()))
}
