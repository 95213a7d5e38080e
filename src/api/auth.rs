//! Registration, login and the current-user endpoint.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::info;

use super::guard::AuthUser;
use super::{ApiError, AppState, blocking};
use crate::{Request, Response, Status};

/// Email (trimmed, lower-cased) and password from a JSON body.
///
/// An absent, non-object or empty body is `invalid JSON body`.
fn credentials(req: &Request) -> Result<(String, String), Response> {
    let body = req.json()
        .and_then(Value::as_object)
        .filter(|o| !o.is_empty())
        .ok_or_else(|| Response::error(Status::BadRequest, "invalid JSON body"))?;

    let email = body.get("email").and_then(Value::as_str).unwrap_or_default().trim().to_lowercase();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default().to_owned();
    Ok((email, password))
}

/// `POST /auth/register {email, password}`
pub async fn register(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let (email, password) = match credentials(&req) {
        Ok(c) => c,
        Err(res) => return Ok(res),
    };
    if email.is_empty() || password.is_empty() {
        return Ok(Response::error(Status::BadRequest, "email and password required"));
    }
    // The unique index settles a race between two registrations of one email.
    let created = blocking(&state, move |s| {
        if s.store.find_credentials(&email)?.is_some() {
            return Ok(None);
        }
        let digest = s.passwords.hash(&password)?;
        Ok(s.store.insert_user(&email, &digest)?)
    })
    .await?;
    let Some(user) = created else {
        return Ok(Response::error(Status::Conflict, "email already in use"));
    };
    let token = state.tokens.sign(&user)?;

    info!(user_id = user.id, "user registered");
    Ok(Response::json(json!({ "user": user, "token": token })))
}

/// `POST /auth/login {email, password}`
pub async fn login(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let (email, password) = match credentials(&req) {
        Ok(c) => c,
        Err(res) => return Ok(res),
    };

    let user = blocking(&state, move |s| {
        let creds = s.store.find_credentials(&email)?;
        Ok(creds
            .filter(|c| s.passwords.verify(&c.password_hash, &password))
            .map(|c| c.user))
    })
    .await?;
    let Some(user) = user else {
        return Ok(Response::error(Status::Unauthorized, "invalid credentials"));
    };
    let token = state.tokens.sign(&user)?;

    Ok(Response::json(json!({ "user": user, "token": token })))
}

/// `GET /me`
pub async fn me(_state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    Ok(match req.extensions().get::<AuthUser>() {
        Some(AuthUser(user)) => Response::json(json!({ "user": user })),
        None => Response::error(Status::Unauthorized, "unauthorized"),
    })
}
