use clap::Args;
use uuid::Uuid;

use crate::session::CallerId;

/// Connection settings for the Postgres record store.
#[derive(Debug, Clone, Args)]
pub struct DatabaseConfig {
    /// Postgres connection string
    #[arg(long = "database-url", env = "DATABASE_URL", hide_env_values = true)]
    pub url: String,

    /// Upper bound on pooled connections
    #[arg(long, env = "SCAMWATCH_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,
}

/// Who the commands act on behalf of.
#[derive(Debug, Clone, Args)]
pub struct CallerConfig {
    /// Caller id used to scope every query; unset means "nobody signed in"
    #[arg(long = "caller", env = "SCAMWATCH_CALLER_ID")]
    pub caller_id: Option<Uuid>,
}

impl CallerConfig {
    pub fn caller(&self) -> Option<CallerId> {
        self.caller_id.map(CallerId::from)
    }
}
