//! Bearer-token auth guard.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::AppState;
use super::crypto::parse_bearer;
use super::store::User;
use crate::middleware::{Middleware, Next};
use crate::{Outcome, Request, Response, Status};

/// The authenticated caller, placed in the request extensions by [`AuthGuard`].
#[derive(Clone, Debug)]
pub struct AuthUser(pub User);

/// Rejects requests without a valid `Authorization: Bearer <token>` header
/// with `401 {"error":"unauthorized"}`; the handler never runs. Otherwise
/// inserts [`AuthUser`] and delegates.
pub struct AuthGuard {
    state: Arc<AppState>,
}

impl AuthGuard {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Middleware for AuthGuard {
    async fn handle(&self, mut req: Request, next: Next) -> Outcome {
        let claims = req.header("authorization")
            .and_then(parse_bearer)
            .and_then(|token| self.state.tokens.verify(token));

        let Some(claims) = claims else {
            debug!(path = %req.path(), "missing or invalid bearer token");
            return Ok(Response::error(Status::Unauthorized, "unauthorized"));
        };

        req.extensions_mut().insert(AuthUser(claims.user()));
        next.run(req).await
    }
}
