//! Owner-scoped todo endpoints. All of them sit behind the auth guard.

use std::sync::Arc;

use serde_json::{Value, json};

use super::guard::AuthUser;
use super::store::User;
use super::{ApiError, AppState, blocking};
use crate::{Request, Response, Status};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 50;

fn caller(req: &Request) -> Result<User, Response> {
    req.extensions()
        .get::<AuthUser>()
        .map(|AuthUser(user)| user.clone())
        .ok_or_else(|| Response::error(Status::Unauthorized, "unauthorized"))
}

/// `page` (default 1, at least 1) and `limit` (default 10, within 1..=50).
/// A value that is not an integer is `None`.
fn pagination(req: &Request) -> Option<(i64, i64)> {
    let number = |key: &str, default: i64| match req.query_first(key) {
        Some(raw) => raw.trim().parse::<i64>().ok(),
        None => Some(default),
    };
    let page = number("page", DEFAULT_PAGE)?.max(1);
    let limit = number("limit", DEFAULT_LIMIT)?.clamp(1, MAX_LIMIT);
    Some((page, limit))
}

/// Path ids that are not integers cannot name a todo, so they are a 404.
fn todo_id(req: &Request) -> Option<i64> {
    req.param("id").and_then(|id| id.parse().ok())
}

/// `GET /todos?page=&limit=`
pub async fn list(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let user = match caller(&req) {
        Ok(u) => u,
        Err(res) => return Ok(res),
    };
    let Some((page, limit)) = pagination(&req) else {
        return Ok(Response::error(Status::BadRequest, "bad pagination params"));
    };

    let offset = (page - 1).saturating_mul(limit).unsigned_abs();
    let per_page = limit.unsigned_abs() as u32;
    let (items, total) = blocking(&state, move |s| Ok(s.store.list_todos(user.id, per_page, offset)?)).await?;

    Ok(Response::json(json!({
        "items": items,
        "page": page,
        "limit": limit,
        "total": total,
    })))
}

/// `POST /todos {title}`
pub async fn create(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let user = match caller(&req) {
        Ok(u) => u,
        Err(res) => return Ok(res),
    };
    let Some(body) = req.json().and_then(Value::as_object).filter(|o| !o.is_empty()) else {
        return Ok(Response::error(Status::BadRequest, "invalid JSON body"));
    };
    let title = body.get("title").and_then(Value::as_str).unwrap_or_default().trim();
    if title.is_empty() {
        return Ok(Response::error(Status::BadRequest, "title is required"));
    }

    let title = title.to_owned();
    let todo = blocking(&state, move |s| Ok(s.store.create_todo(user.id, &title)?)).await?;
    Ok(Response::json(json!(todo)).with_status(Status::Created))
}

/// `PATCH /todos/:id/toggle`
pub async fn toggle(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let user = match caller(&req) {
        Ok(u) => u,
        Err(res) => return Ok(res),
    };
    let todo = match todo_id(&req) {
        Some(id) => blocking(&state, move |s| Ok(s.store.toggle_todo(user.id, id)?)).await?,
        None => None,
    };

    Ok(match todo {
        Some(todo) => Response::json(json!(todo)),
        None => Response::error(Status::NotFound, "not found"),
    })
}

/// `DELETE /todos/:id`
pub async fn delete(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
    let user = match caller(&req) {
        Ok(u) => u,
        Err(res) => return Ok(res),
    };
    let deleted = match todo_id(&req) {
        Some(id) => blocking(&state, move |s| Ok(s.store.delete_todo(user.id, id)?)).await?,
        None => false,
    };

    Ok(if deleted {
        Response::json(json!({ "status": "deleted" }))
    } else {
        Response::error(Status::NotFound, "not found")
    })
}
