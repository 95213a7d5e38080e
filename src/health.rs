//! Built-in health-check handler.
//!
//! ```rust
//! use sluice::{Method, Router, health};
//!
//! let app = Router::new().on(Method::Get, "/health", health::liveness);
//! ```
//!
//! Wrap it in a custom handler if readiness should depend on a collaborator
//! (database, downstream service) instead.

use std::convert::Infallible;

use serde_json::{Value, json};

use crate::request::Request;

/// Liveness handler.
///
/// Always `200 OK` with `{"status":"ok"}`. If the process can answer HTTP at
/// all it is alive, so this handler has no dependencies and is idempotent.
pub async fn liveness(_req: Request) -> Result<Value, Infallible> {
    Ok(json!({ "status": "ok" }))
}
