use clap::Parser;

/// Server configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "docket-server")]
#[command(author, version, about = "REST API server for Docket practice-data synchronization")]
pub struct ServerConfig {
    /// PostgreSQL database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Base URL of the remote case-management API
    #[arg(long, env = "DOCKET_API_URL")]
    pub api_url: String,

    /// Bearer token used for every actor. When unset, tokens are read from
    /// the api_credentials table.
    #[arg(long, env = "DOCKET_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Server port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Allowed CORS origins, comma separated, or "*" for any
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Create missing tables on startup
    #[arg(long, env = "DOCKET_APPLY_SCHEMA", default_value_t = true, action = clap::ArgAction::Set)]
    pub apply_schema: bool,
}
