//! Runtime configuration for the `sluice` binary.
//!
//! Every flag falls back to an environment variable and then to a default,
//! so `sluice` with no arguments serves on `127.0.0.1:5000`.

use clap::Parser;

/// Secret used when none is configured. Fine for local runs, never for a
/// deployment.
pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rate limit must be at least 1 request per minute")]
    ZeroRateLimit,

    #[error("JWT secret must not be empty")]
    EmptySecret,
}

/// sluice: auth + todos JSON API
#[derive(Clone, Debug, Parser)]
#[command(name = "sluice", version, about, long_about = None)]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Value of the Access-Control-Allow-Origin header
    #[arg(long, env = "CORS_ALLOW_ORIGIN", default_value = "*")]
    pub cors_allow_origin: String,

    /// HMAC secret for signing bearer tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEFAULT_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Requests allowed per client per sliding minute
    #[arg(long, env = "RATE_LIMIT_PER_MIN", default_value_t = 60)]
    pub rate_limit_per_min: usize,

    /// SQLite database file, or `:memory:`
    #[arg(long, env = "DATABASE_PATH", default_value = "sluice.db")]
    pub database: String,

    /// Skip creating the demo user
    #[arg(long)]
    pub no_seed: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_per_min == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::EmptySecret);
        }
        Ok(())
    }

    /// `host:port` for [`Server::bind`](crate::Server::bind). IPv6 hosts are
    /// bracketed.
    pub fn listen_addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}
