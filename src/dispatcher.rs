//! Request dispatch: match → build context → run chain → normalise → reply.
//!
//! [`Dispatcher::dispatch`] is the boundary between the transport and the
//! application. It never fails. Every request ends in exactly one of:
//!
//! | Terminal state | Status |
//! |---|---|
//! | `not_found` | 404 `{"error":"Route not found"}` |
//! | `method_not_allowed` | 405 `{"error":"Method <M> not allowed"}` |
//! | `success` | whatever the chain returned (2xx, or an intended 4xx) |
//! | `handler_failure` | 500 `{"error":"Internal Server Error","detail":…}` |
//!
//! `OPTIONS` on any path short-circuits before routing with a bodyless 204.
//! Every reply carries the CORS headers; every reply except that 204 also
//! carries `Content-Type: application/json`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use serde_json::json;
use tracing::{Instrument, Span, debug, error, field, info_span};

use crate::error::Fault;
use crate::handler::{BoxedHandler, ErasedHandler};
use crate::method::Method;
use crate::middleware::{Chain, Middleware, Next};
use crate::request::{Request, parse_query};
use crate::response::Response;
use crate::router::{RouteError, Router};
use crate::status::Status;

const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const ALLOW_METHODS: &str = "GET,POST,PATCH,DELETE,OPTIONS";

/// A request as the transport hands it over.
#[derive(Clone, Debug)]
pub struct RawRequest {
    pub method: String,
    /// Path plus optional `?query`.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Client key for rate limiting, normally the peer IP.
    pub client: String,
}

impl RawRequest {
    pub fn new(method: &str, target: &str) -> Self {
        Self {
            method: method.to_owned(),
            target: target.to_owned(),
            headers: Vec::new(),
            body: Bytes::new(),
            client: "local".to_owned(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn client(mut self, client: &str) -> Self {
        self.client = client.to_owned();
        self
    }
}

/// Builder for [`Dispatcher`]. Setup-time only; `build` freezes everything.
pub struct DispatcherBuilder {
    router: Router,
    chain: Chain,
    guard: Option<Arc<dyn Middleware>>,
    allow_origin: String,
}

impl DispatcherBuilder {
    /// Appends a global middleware. The first one added is the outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.chain.push(middleware);
        self
    }

    /// Sets the guard placed directly around every `on_authed` handler.
    pub fn auth(mut self, guard: impl Middleware) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Value of `Access-Control-Allow-Origin`. Defaults to `*`.
    pub fn allow_origin(mut self, origin: &str) -> Self {
        self.allow_origin = origin.to_owned();
        self
    }

    /// Wraps every endpoint once and freezes the route table and chain.
    ///
    /// Authenticated endpoints get the guard innermost, then the global
    /// chain around that. With no guard configured they fail closed: every
    /// request to them is answered 401.
    pub fn build(mut self) -> Dispatcher {
        let guard: Arc<dyn Middleware> = match self.guard.take() {
            Some(guard) => guard,
            None => Arc::new(deny_all),
        };
        let mut guard_chain = Chain::new();
        guard_chain.push_shared(guard);

        let mut unguarded = 0usize;
        for endpoint in self.router.endpoints_mut() {
            let mut handler: BoxedHandler = Arc::clone(&endpoint.handler);
            if endpoint.requires_auth {
                handler = guard_chain.wrap(handler);
            } else {
                unguarded += 1;
            }
            endpoint.handler = self.chain.wrap(handler);
        }
        debug!(routes = self.router.len(), public_endpoints = unguarded, layers = self.chain.len(), "dispatcher built");

        Dispatcher { router: self.router, allow_origin: self.allow_origin }
    }
}

async fn deny_all(_req: Request, _next: Next) -> Result<Response, Fault> {
    error!("authenticated route reached without an auth guard configured");
    Ok(Response::error(Status::Unauthorized, "unauthorized"))
}

/// Routes requests through the frozen route table and middleware chain.
pub struct Dispatcher {
    router: Router,
    allow_origin: String,
}

impl Dispatcher {
    pub fn builder(router: Router) -> DispatcherBuilder {
        DispatcherBuilder {
            router,
            chain: Chain::new(),
            guard: None,
            allow_origin: "*".to_owned(),
        }
    }

    /// Produces the response for one request. Never fails and never lets a
    /// handler error or panic escape.
    pub async fn dispatch(&self, raw: RawRequest) -> Response {
        let (path, query) = match raw.target.split_once('?') {
            Some((path, query)) => (path.to_owned(), query.to_owned()),
            None => (raw.target.clone(), String::new()),
        };
        let span = info_span!(
            "request",
            method = %raw.method,
            path = %path,
            client = %raw.client,
            outcome = field::Empty,
        );

        let preflight = raw.method == Method::Options.as_str();
        let response = self.route(raw, path, query).instrument(span).await;
        self.finish(response, preflight)
    }

    async fn route(&self, raw: RawRequest, path: String, query: String) -> Response {
        if raw.method == Method::Options.as_str() {
            Span::current().record("outcome", "preflight");
            return Response::status(Status::NoContent);
        }

        let (endpoint, params) = match self.router.lookup(&raw.method, &path) {
            Ok(found) => found,
            Err(RouteError::NotFound) => {
                Span::current().record("outcome", "not_found");
                return Response::error(Status::NotFound, "Route not found");
            }
            Err(RouteError::MethodNotAllowed { allowed }) => {
                Span::current().record("outcome", "method_not_allowed");
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                return Response::error(Status::MethodNotAllowed, format!("Method {} not allowed", raw.method))
                    .header("Allow", &allow);
            }
        };

        // Malformed or absent bodies become `None`; handlers validate presence.
        let body = if endpoint.method.carries_body() && !raw.body.is_empty() {
            serde_json::from_slice(&raw.body).ok()
        } else {
            None
        };

        let req = Request::new(
            endpoint.method,
            path,
            parse_query(&query),
            raw.headers,
            body,
            params,
            raw.client,
        );

        let handler = Arc::clone(&endpoint.handler);
        match AssertUnwindSafe(handler.call(req)).catch_unwind().await {
            Ok(Ok(response)) => {
                Span::current().record("outcome", "success");
                response
            }
            Ok(Err(fault)) => {
                Span::current().record("outcome", "handler_failure");
                error!(fault = %fault.chain(), debug = ?fault, "handler failed");
                internal_error(&fault.detail())
            }
            Err(panic) => {
                Span::current().record("outcome", "handler_failure");
                error!(panic = panic_message(panic.as_ref()), "handler panicked");
                internal_error("handler panicked")
            }
        }
    }

    /// Adds the CORS headers, and `Content-Type` on everything but a preflight
    /// reply, bodyless handler replies included.
    fn finish(&self, mut response: Response, preflight: bool) -> Response {
        if !preflight && response.header_value("content-type").is_none() {
            response = response.header("Content-Type", "application/json");
        }
        response
            .header("Access-Control-Allow-Origin", &self.allow_origin)
            .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
            .header("Access-Control-Allow-Methods", ALLOW_METHODS)
    }
}

fn internal_error(detail: &str) -> Response {
    Response::json(json!({ "error": "Internal Server Error", "detail": detail }))
        .with_status(Status::InternalServerError)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
