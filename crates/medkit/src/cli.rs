//! Clap derive structures for the `medkit` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// medkit -- manage patients, devices and accounts from the command line
#[derive(Debug, Parser)]
#[command(
    name = "medkit",
    version,
    about = "Manage MedKit patients and accounts from the command line",
    long_about = "Administer the patients, assigned devices and accounts held by a MedKit\n\
        backend. Profiles select the backend; the memory backend can be\n\
        persisted to a local JSON store file.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "MEDKIT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// JSON store file (selects the memory backend, overrides profile)
    #[arg(long, short = 's', env = "MEDKIT_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MEDKIT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage patients and their devices
    #[command(alias = "pt")]
    Patients(PatientsArgs),

    /// Manage accounts and the primary account
    #[command(alias = "acct")]
    Accounts(AccountsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Patients ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PatientsArgs {
    #[command(subcommand)]
    pub command: PatientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PatientsCommand {
    /// List patients, optionally filtered by name or identifier
    #[command(alias = "ls", alias = "search")]
    List {
        /// Case-insensitive text matched against name and identifier
        text: Option<String>,
    },

    /// Show a single patient
    Get {
        /// Patient identifier
        id: String,
    },

    /// Decode a patient profile JSON file and display it
    Show {
        /// Path to a patient profile JSON document
        file: PathBuf,
    },

    /// Add a patient to the directory
    Add {
        /// Patient identifier (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Given name
        #[arg(long)]
        first: Option<String>,

        /// Family name
        #[arg(long)]
        last: Option<String>,

        /// Birthdate (YYYY-MM-DD)
        #[arg(long)]
        birthdate: Option<chrono::NaiveDate>,

        /// Read the full profile from a JSON file instead
        #[arg(long, short = 'F', conflicts_with_all = ["id", "first", "last", "birthdate"])]
        from_file: Option<PathBuf>,
    },

    /// Remove a patient from the directory
    #[command(alias = "rm")]
    Remove {
        /// Patient identifier
        id: String,
    },

    /// Change a patient's name
    Rename {
        /// Patient identifier
        id: String,

        /// Given name
        #[arg(long)]
        first: Option<String>,

        /// Family name
        #[arg(long)]
        last: Option<String>,
    },

    /// Set or clear a patient's photo
    Photo {
        /// Patient identifier
        id: String,

        #[command(flatten)]
        photo: PhotoArgs,
    },

    /// Enable or disable notifications for a patient
    Notify {
        /// Patient identifier
        id: String,

        /// Desired state
        state: Toggle,
    },

    /// Assign one or more devices to a patient
    AssignDevice {
        /// Patient identifier
        id: String,

        /// Device identifiers
        #[arg(required = true)]
        devices: Vec<String>,

        /// Device name (applied to every listed device)
        #[arg(long)]
        name: Option<String>,

        /// Device model
        #[arg(long)]
        model: Option<String>,

        /// Device manufacturer
        #[arg(long)]
        manufacturer: Option<String>,
    },
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PhotoArgs {
    /// Image file to store as photo data
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Symbolic image name
    #[arg(long)]
    pub named: Option<String>,

    /// Remove the photo
    #[arg(long)]
    pub clear: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List accounts
    #[command(alias = "ls")]
    List,

    /// Add an account; the new account becomes primary
    Add {
        /// Identity, either `name` for a user or `kind:name`
        identity: String,

        /// Free-form description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// Account secret (prompted when omitted)
        #[arg(long, env = "MEDKIT_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Remove an account
    #[command(alias = "rm")]
    Remove {
        /// Identity, either `name` for a user or `kind:name`
        identity: String,
    },

    /// Show, set or clear the primary account
    Primary {
        /// Identity to make primary
        identity: Option<String>,

        /// Clear the primary account
        #[arg(long, conflicts_with = "identity")]
        clear: bool,
    },

    /// Set or clear an account description
    Describe {
        /// Identity, either `name` for a user or `kind:name`
        identity: String,

        /// New description (cleared when omitted)
        description: Option<String>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display current configuration
    Show,

    /// Create or update a profile, prompting for missing values
    Init {
        /// Profile name
        #[arg(long)]
        name: Option<String>,

        /// Backend for the profile
        #[arg(long)]
        backend: Option<String>,

        /// JSON store file for the memory backend
        #[arg(long)]
        store_file: Option<PathBuf>,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
