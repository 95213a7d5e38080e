//! # sluice
//!
//! A small HTTP routing and middleware-dispatch engine, plus the auth +
//! todos JSON API it was built to serve.
//!
//! The engine is four pieces:
//!
//! - an ordered route table, matched first-registered-first-served
//!   ([`Router`], [`Pattern`]);
//! - onion-ordered middleware ([`middleware::Chain`]);
//! - a per-client sliding-window rate limiter
//!   ([`middleware::RateLimiter`]);
//! - a [`Dispatcher`] that turns every request into exactly one response:
//!   404 and 405 are told apart, handler errors and panics become a
//!   sanitized 500, and nothing escapes.
//!
//! [`Server`] puts a dispatcher on hyper with graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use serde_json::{Value, json};
//! use sluice::middleware::{Logger, RateLimit, RateLimiter};
//! use sluice::{Dispatcher, Fault, Method, Request, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new()
//!         .on(Method::Get, "/users/:id", get_user);
//!
//!     let dispatcher = Dispatcher::builder(router)
//!         .layer(RateLimit::new(Arc::new(RateLimiter::per_minute(60))))
//!         .layer(Logger)
//!         .build();
//!
//!     Server::bind("127.0.0.1:3000")?.serve(dispatcher).await?;
//!     Ok(())
//! }
//!
//! async fn get_user(req: Request) -> Result<Value, Fault> {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Ok(json!({ "id": id }))
//! }
//! ```

mod dispatcher;
mod error;
mod handler;
mod method;
mod pattern;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod api;
pub mod config;
pub mod health;
pub mod middleware;

pub use dispatcher::{Dispatcher, DispatcherBuilder, RawRequest};
pub use error::{Error, Fault};
pub use handler::{Handler, Outcome};
pub use method::Method;
pub use pattern::{Pattern, PatternError};
pub use request::{QueryValue, Request};
pub use response::{IntoResponse, Response};
pub use router::{RouteError, Router};
pub use server::Server;
pub use status::Status;
