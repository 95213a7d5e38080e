//! Middleware layer.
//!
//! Middleware intercepts a request before its handler runs and the response
//! after. A middleware may:
//!
//! - short-circuit by returning a response without calling [`Next::run`];
//! - put data in the request's extensions before delegating;
//! - call [`Next::run`] and post-process what comes back.
//!
//! # Ordering
//!
//! [`Chain::wrap`] composes onion-style: the **first** middleware pushed is
//! the **outermost** layer. With `A` then `B` pushed, a request runs
//! `A-pre, B-pre, handler, B-post, A-post`.
//!
//! Wrapping happens once, when the dispatcher is built. The chain is frozen
//! from then on and shared read-only across requests.
//!
//! # Writing middleware
//!
//! Either implement [`Middleware`] on a type, or pass a plain async function:
//!
//! ```rust
//! use sluice::middleware::{Chain, Next};
//! use sluice::{Outcome, Request};
//!
//! async fn tag(req: Request, next: Next) -> Outcome {
//!     let res = next.run(req).await?;
//!     Ok(res.header("x-served-by", "sluice"))
//! }
//!
//! let chain = Chain::new().with(tag);
//! assert_eq!(chain.len(), 1);
//! ```

mod logger;
mod rate_limit;

pub use logger::Logger;
pub use rate_limit::{RateLimit, RateLimiter};

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Outcome};
use crate::request::Request;

/// A composable wrapper around the rest of the chain.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, req: Request, next: Next) -> Outcome;
}

/// Async functions `fn(Request, Next) -> Outcome` are middleware.
#[async_trait]
impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    async fn handle(&self, req: Request, next: Next) -> Outcome {
        (self)(req, next).await
    }
}

/// The remainder of the chain, ending in the route handler.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    pub async fn run(self, req: Request) -> Outcome {
        self.inner.call(req).await
    }
}

/// An ordered, append-only list of middleware.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Appends a middleware. It runs inside every middleware pushed before it.
    pub fn push(&mut self, middleware: impl Middleware) {
        self.layers.push(Arc::new(middleware));
    }

    /// Appends an already shared middleware.
    pub fn push_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(middleware);
    }

    /// Chaining form of [`push`](Chain::push).
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.push(middleware);
        self
    }

    pub fn len(&self) -> usize { self.layers.len() }

    pub fn is_empty(&self) -> bool { self.layers.is_empty() }

    /// Wraps `handler` in every layer, first-pushed outermost.
    #[doc(hidden)]
    pub fn wrap(&self, handler: BoxedHandler) -> BoxedHandler {
        self.layers.iter().rev().fold(handler, |inner, middleware| {
            Arc::new(Layered { middleware: Arc::clone(middleware), inner })
        })
    }
}

/// One middleware around an inner handler.
struct Layered {
    middleware: Arc<dyn Middleware>,
    inner: BoxedHandler,
}

impl ErasedHandler for Layered {
    fn call(&self, req: Request) -> BoxFuture {
        let middleware = Arc::clone(&self.middleware);
        let next = Next { inner: Arc::clone(&self.inner) };
        Box::pin(async move { middleware.handle(req, next).await })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::error::Fault;
    use crate::handler::Handler;
    use crate::method::Method;
    use crate::response::Response;
    use crate::status::Status;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        log: Log,
    }

    #[async_trait]
    impl Middleware for Recorder {
        async fn handle(&self, req: Request, next: Next) -> Outcome {
            self.log.lock().push(format!("{}-pre", self.name));
            let res = next.run(req).await;
            self.log.lock().push(format!("{}-post", self.name));
            res
        }
    }

    fn request() -> Request {
        Request::new(Method::Get, "/".into(), HashMap::new(), Vec::new(), None, HashMap::new(), "test".into())
    }

    fn recording_handler(log: Log) -> BoxedHandler {
        (move |_req: Request| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push("handler".into());
                Ok::<_, Fault>(json!({"ok": true}))
            }
        })
        .into_boxed_handler()
    }

    #[tokio::test]
    async fn first_pushed_is_outermost() {
        let log: Log = Arc::default();
        let chain = Chain::new()
            .with(Recorder { name: "A", log: Arc::clone(&log) })
            .with(Recorder { name: "B", log: Arc::clone(&log) });

        let res = chain.wrap(recording_handler(Arc::clone(&log))).call(request()).await.unwrap();

        assert_eq!(res.status_code(), Status::Ok);
        assert_eq!(*log.lock(), ["A-pre", "B-pre", "handler", "B-post", "A-post"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_layers() {
        let log: Log = Arc::default();
        let chain = Chain::new()
            .with(|_req: Request, _next: Next| async { Ok::<_, Fault>(Response::error(Status::Forbidden, "no")) })
            .with(Recorder { name: "B", log: Arc::clone(&log) });

        let res = chain.wrap(recording_handler(Arc::clone(&log))).call(request()).await.unwrap();

        assert_eq!(res.status_code(), Status::Forbidden);
        assert!(log.lock().is_empty());
    }

    #[derive(Clone)]
    struct Marker(&'static str);

    #[tokio::test]
    async fn extensions_reach_the_handler() {
        let chain = Chain::new().with(|mut req: Request, next: Next| async move {
            req.extensions_mut().insert(Marker("from middleware"));
            next.run(req).await
        });
        let handler = (|req: Request| async move {
            let marker = req.extensions().get::<Marker>().map(|m| m.0);
            Ok::<_, Fault>(json!(marker))
        })
        .into_boxed_handler();

        let res = chain.wrap(handler).call(request()).await.unwrap();
        assert_eq!(res.body(), Some(&json!("from middleware")));
    }

    #[tokio::test]
    async fn post_processing_sees_the_response() {
        let chain = Chain::new().with(|req: Request, next: Next| async move {
            let res = next.run(req).await?;
            Ok::<_, Fault>(res.header("x-post", "done"))
        });
        let handler = (|_req: Request| async { Ok::<_, Fault>(json!(1)) }).into_boxed_handler();

        let res = chain.wrap(handler).call(request()).await.unwrap();
        assert_eq!(res.header_value("x-post"), Some("done"));
    }

    #[tokio::test]
    async fn empty_chain_is_the_handler() {
        let handler = (|_req: Request| async { Ok::<_, Fault>(json!("bare")) }).into_boxed_handler();
        let res = Chain::new().wrap(handler).call(request()).await.unwrap();
        assert_eq!(res.body(), Some(&json!("bare")));
    }
}
