//! HTTP status codes as a typed enum.
//!
//! Only the codes this engine and its API actually produce. Use [`Status`]
//! anywhere a status code is accepted: `Response::json(..).with_status()`,
//! `Response::error()`, or as the second half of a `(body, status)` pair
//! returned from a handler.
//!
//! ```rust
//! use serde_json::json;
//! use sluice::{Response, Status};
//!
//! // body + explicit status
//! Response::json(json!({"id": 1})).with_status(Status::Created);
//!
//! // the canonical error envelope: {"error": "..."}
//! Response::error(Status::NotFound, "not found");
//! ```

use std::fmt;

#[allow(clippy::enum_variant_names)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                  // 200
    Created,             // 201
    NoContent,           // 204

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,          // 400
    Unauthorized,        // 401
    Forbidden,           // 403
    NotFound,            // 404
    MethodNotAllowed,    // 405
    Conflict,            // 409
    TooManyRequests,     // 429

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError, // 500
    ServiceUnavailable,  // 503
}

impl Status {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Ok                  => 200,
            Self::Created             => 201,
            Self::NoContent           => 204,
            Self::BadRequest          => 400,
            Self::Unauthorized        => 401,
            Self::Forbidden           => 403,
            Self::NotFound            => 404,
            Self::MethodNotAllowed    => 405,
            Self::Conflict            => 409,
            Self::TooManyRequests     => 429,
            Self::InternalServerError => 500,
            Self::ServiceUnavailable  => 503,
        }
    }

    pub fn is_success(self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn is_server_error(self) -> bool {
        self.as_u16() >= 500
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 { s.as_u16() }
}

impl From<Status> for http::StatusCode {
    fn from(s: Status) -> http::StatusCode {
        // Every variant above is a registered code.
        http::StatusCode::from_u16(s.as_u16()).unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_http() {
        assert_eq!(http::StatusCode::from(Status::TooManyRequests), http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(u16::from(Status::MethodNotAllowed), 405);
        assert!(Status::Created.is_success());
        assert!(!Status::NotFound.is_success());
        assert!(Status::InternalServerError.is_server_error());
    }
}
