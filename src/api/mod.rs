//! The auth + todos JSON API served by the `sluice` binary.
//!
//! Everything here is an ordinary user of the engine: handlers are plain
//! async functions registered on a [`Router`], the auth guard is a
//! [`Middleware`](crate::middleware::Middleware), and the rate limiter is the
//! stock [`RateLimit`] layer.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sluice::api::{self, AppState};
//! use sluice::middleware::RateLimiter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let state = Arc::new(AppState::open(":memory:", b"secret")?);
//! let limiter = Arc::new(RateLimiter::per_minute(60));
//! let dispatcher = api::dispatcher(&state, limiter, "*");
//! # let _ = dispatcher;
//! # Ok(())
//! # }
//! ```

mod auth;
mod crypto;
mod guard;
mod openapi;
mod store;
mod todos;

pub use crypto::{Claims, CryptoError, Passwords, TOKEN_TTL, Tokens, parse_bearer};
pub use guard::{AuthGuard, AuthUser};
pub use store::{Credentials, Store, StoreError, Todo, User};

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task;
use tracing::info;

use crate::middleware::{Logger, RateLimit, RateLimiter};
use crate::{Dispatcher, Handler, Method, Request, Response, Router, health};

pub const DEMO_EMAIL: &str = "demo@user.com";
pub const DEMO_PASSWORD: &str = "demo123";

/// Collaborator failures inside API handlers. Each one surfaces as a 500
/// whose detail is only the short message here; the source is logged.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("storage failure")]
    Store(#[from] StoreError),

    #[error("credential processing failure")]
    Crypto(#[from] CryptoError),

    #[error("blocking task failed")]
    Join(#[from] tokio::task::JoinError),
}

/// Shared collaborators of every API handler.
pub struct AppState {
    pub store: Store,
    pub passwords: Passwords,
    pub tokens: Tokens,
}

impl AppState {
    pub fn new(store: Store, jwt_secret: &[u8]) -> Self {
        Self {
            store,
            passwords: Passwords::new(),
            tokens: Tokens::new(jwt_secret, TOKEN_TTL),
        }
    }

    /// Opens the database at `path` (`":memory:"` for a throwaway one).
    pub fn open(path: &str, jwt_secret: &[u8]) -> Result<Self, ApiError> {
        Ok(Self::new(Store::open(path)?, jwt_secret))
    }
}

/// Runs storage and password-hashing work on tokio's blocking pool so it
/// never stalls the async worker threads.
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppState) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    task::spawn_blocking(move || f(&state)).await?
}

/// Adapts a `(state, request)` handler to the engine's `request`-only shape.
fn bind<F, Fut>(state: &Arc<AppState>, f: F) -> impl Handler
where
    F: Fn(Arc<AppState>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ApiError>> + Send + 'static,
{
    let state = Arc::clone(state);
    move |req: Request| f(Arc::clone(&state), req)
}

async fn hello(_req: Request) -> Result<Value, Infallible> {
    Ok(json!({ "message": "Hello from sluice (SQLite + JWT + rate-limit)" }))
}

/// The route table of the API.
pub fn router(state: &Arc<AppState>) -> Router {
    Router::new()
        .on(Method::Get, "/health", health::liveness)
        .on(Method::Get, "/hello", hello)
        .on(Method::Get, "/openapi.json", openapi::document)
        .on(Method::Post, "/auth/register", bind(state, auth::register))
        .on(Method::Post, "/auth/login", bind(state, auth::login))
        .on_authed(Method::Get, "/me", bind(state, auth::me))
        .on_authed(Method::Get, "/todos", bind(state, todos::list))
        .on_authed(Method::Post, "/todos", bind(state, todos::create))
        .on_authed(Method::Patch, "/todos/:id/toggle", bind(state, todos::toggle))
        .on_authed(Method::Delete, "/todos/:id", bind(state, todos::delete))
}

/// The API router behind rate limiting (outermost), request logging, and the
/// bearer-token guard on authenticated routes.
pub fn dispatcher(state: &Arc<AppState>, limiter: Arc<RateLimiter>, allow_origin: &str) -> Dispatcher {
    Dispatcher::builder(router(state))
        .layer(RateLimit::new(limiter))
        .layer(Logger)
        .auth(AuthGuard::new(Arc::clone(state)))
        .allow_origin(allow_origin)
        .build()
}

/// Creates the demo account unless it already exists. Returns whether it was
/// created. Runs synchronously; call it before serving.
pub fn seed_demo_user(state: &AppState) -> Result<bool, ApiError> {
    if state.store.find_credentials(DEMO_EMAIL)?.is_some() {
        return Ok(false);
    }
    let digest = state.passwords.hash(DEMO_PASSWORD)?;
    let created = state.store.insert_user(DEMO_EMAIL, &digest)?.is_some();
    if created {
        info!(email = DEMO_EMAIL, "seeded demo user");
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_is_idempotent() {
        let state = AppState::open(":memory:", b"secret").unwrap();
        assert!(seed_demo_user(&state).unwrap());
        assert!(!seed_demo_user(&state).unwrap());

        let creds = state.store.find_credentials(DEMO_EMAIL).unwrap().unwrap();
        assert!(state.passwords.verify(&creds.password_hash, DEMO_PASSWORD));
    }

    #[test]
    fn collaborator_errors_hide_their_source_from_the_detail() {
        let err = ApiError::from(StoreError::Io(std::io::Error::other("/var/lib/secret.db")));
        let fault = crate::Fault::from(err);
        assert_eq!(fault.detail(), "storage failure");
        assert!(fault.chain().contains("/var/lib/secret.db"));
    }

    #[test]
    fn router_registers_every_route() {
        let state = Arc::new(AppState::open(":memory:", b"secret").unwrap());
        // /todos carries GET and POST on one pattern.
        assert_eq!(router(&state).len(), 9);
    }
}
