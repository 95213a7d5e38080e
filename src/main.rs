//! `sluice` binary: the auth + todos API on the sluice engine.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use sluice::api::{self, AppState};
use sluice::config::Config;
use sluice::middleware::RateLimiter;
use sluice::Server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    config.validate()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if config.uses_default_secret() {
        warn!("JWT_SECRET not set, signing tokens with the development default");
    }

    let state = Arc::new(AppState::open(&config.database, config.jwt_secret.as_bytes())?);
    if !config.no_seed {
        api::seed_demo_user(&state)?;
    }

    let limiter = Arc::new(RateLimiter::per_minute(config.rate_limit_per_min));
    spawn_purger(Arc::clone(&limiter));

    let dispatcher = api::dispatcher(&state, limiter, &config.cors_allow_origin);
    info!(
        rate_limit_per_min = config.rate_limit_per_min,
        database = %config.database,
        "starting sluice"
    );
    Server::bind(&config.listen_addr())?.serve(dispatcher).await?;
    Ok(())
}

/// Drops idle client windows once per window width so the key space stays
/// bounded by the clients seen in the last window.
fn spawn_purger(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(limiter.window());
        tick.tick().await;
        loop {
            tick.tick().await;
            limiter.purge(Instant::now());
        }
    });
}
