use clap::{Parser, Subcommand, ValueEnum};

use docket_core::SyncType;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "docket")]
#[command(
    author,
    version,
    about = "Mirror case-management data into the Docket dashboard database"
)]
#[command(after_help = "Examples:
  docket sync --actor 42
  docket sync --actor 42 --type reference
  docket status --actor 42
  docket stats
  docket classify \"RFE Response Filed\"")]
pub struct Config {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a sync in the foreground and wait for it to finish
    Sync {
        /// Dashboard user whose account is synced
        #[arg(short, long)]
        actor: i64,

        /// Which phases to run
        #[arg(short = 't', long = "type", value_enum, default_value = "full")]
        sync_type: SyncTypeArg,

        /// Base URL of the remote case-management API
        #[arg(long, env = "DOCKET_API_URL")]
        api_url: String,

        /// Bearer token; falls back to the api_credentials table when unset
        #[arg(long, env = "DOCKET_API_TOKEN", hide_env_values = true)]
        api_token: Option<String>,

        /// Maximum number of matters to fetch individually
        #[arg(long)]
        detail_limit: Option<usize>,
    },
    /// Show the persisted sync status of an actor
    Status {
        #[arg(short, long)]
        actor: i64,

        #[arg(short = 't', long = "type", value_enum, default_value = "full")]
        sync_type: SyncTypeArg,
    },
    /// Show aggregate matter statistics
    Stats,
    /// Classify a status label without touching the database
    #[command(after_help = "Example: docket classify \"Pending Interview\"")]
    Classify {
        /// Free-text status label
        label: String,
    },
}

/// Sync type selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncTypeArg {
    /// Reference data, matter list and matter details
    Full,
    /// Users, contacts, categories, matter types and statuses only
    Reference,
    /// Matter list and matter details only
    Matters,
}

impl From<SyncTypeArg> for SyncType {
    fn from(arg: SyncTypeArg) -> Self {
        match arg {
            SyncTypeArg::Full => SyncType::Full,
            SyncTypeArg::Reference => SyncType::Reference,
            SyncTypeArg::Matters => SyncType::Matters,
        }
    }
}
