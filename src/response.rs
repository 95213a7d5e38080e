//! Outgoing response envelope and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] is a JSON body plus a status code. Every body this engine
//! sends is JSON, so the envelope holds a [`serde_json::Value`] and only
//! serialises it at the transport boundary.

use bytes::Bytes;
use http_body_util::Full;
use serde_json::{Value, json};

use crate::status::Status;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use serde_json::json;
/// use sluice::{Response, Status};
///
/// Response::json(json!({"status": "ok"}));
/// Response::json(json!({"id": 42})).with_status(Status::Created);
/// Response::error(Status::Conflict, "email already in use");
/// Response::status(Status::NoContent);
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) status: Status,
    pub(crate) body: Option<Value>,
    pub(crate) headers: Vec<(String, String)>,
}

impl Response {
    /// `200 OK` with a JSON body.
    pub fn json(body: Value) -> Self {
        Self { status: Status::Ok, body: Some(body), headers: Vec::new() }
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { status: code, body: None, headers: Vec::new() }
    }

    /// The canonical error envelope `{"error": message}`.
    pub fn error(code: Status, message: impl Into<String>) -> Self {
        Self::json(json!({ "error": message.into() })).with_status(code)
    }

    pub fn with_status(mut self, code: Status) -> Self {
        self.status = code;
        self
    }

    /// Appends a header. Names are stored as given; lookups are case-insensitive.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn status_code(&self) -> Status { self.status }
    pub fn body(&self) -> Option<&Value> { self.body.as_ref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Serialised body bytes. Empty when there is no body.
    pub fn body_bytes(&self) -> Vec<u8> {
        self.body.as_ref().map(|v| v.to_string().into_bytes()).unwrap_or_default()
    }

    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let body = self.body_bytes();
        let mut builder = http::Response::builder().status(http::StatusCode::from(self.status));
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        match builder.body(Full::new(Bytes::from(body))) {
            Ok(res) => res,
            Err(e) => {
                // Only reachable with a header name or value that is not valid HTTP.
                tracing::error!("invalid response header: {e}");
                let mut res = http::Response::new(Full::new(Bytes::new()));
                *res.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                res
            }
        }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into a [`Response`].
///
/// A bare body becomes `200 OK`; a `(body, status)` pair is used verbatim.
///
/// ```rust
/// use serde_json::{json, Value};
/// use sluice::{Fault, Request, Status};
///
/// async fn create(_req: Request) -> Result<(Value, Status), Fault> {
///     Ok((json!({"id": 1, "done": false}), Status::Created))
/// }
/// ```
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response { Response::json(self) }
}

impl IntoResponse for (Value, Status) {
    fn into_response(self) -> Response { Response::json(self.0).with_status(self.1) }
}

/// Return a [`Status`] directly from a handler: `return Ok(Status::NoContent)`
impl IntoResponse for Status {
    fn into_response(self) -> Response { Response::status(self) }
}
