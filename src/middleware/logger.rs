//! Request logging middleware.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{Middleware, Next};
use crate::handler::Outcome;
use crate::request::Request;

/// Emits one `tracing` event per request: method, path, client, status and
/// latency. Failed outcomes are logged at `warn`; the dispatcher logs the
/// fault itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct Logger;

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, req: Request, next: Next) -> Outcome {
        let method = req.method();
        let path = req.path().to_owned();
        let client = req.client().to_owned();
        let started = Instant::now();

        let outcome = next.run(req).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            Ok(res) => info!(
                %method, %path, %client,
                status = res.status_code().as_u16(),
                latency_ms,
                "request handled",
            ),
            Err(_) => warn!(%method, %path, %client, latency_ms, "request failed"),
        }
        outcome
    }
}
