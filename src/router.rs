//! Ordered route table.
//!
//! Routes are kept in a plain `Vec`, in registration order, and matched
//! front to back. The first pattern that fits the path wins, even when a
//! later one would be "more specific". There is no ranking.
//!
//! A path that fits no pattern is [`RouteError::NotFound`] (404). A path
//! that fits a pattern whose method map lacks the request method is
//! [`RouteError::MethodNotAllowed`] (405), never a 404.

use std::collections::HashMap;

use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::pattern::Pattern;

/// Why a lookup did not produce a handler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RouteError {
    NotFound,
    MethodNotAllowed { allowed: Vec<Method> },
}

/// One method's handler on a route, plus whether it sits behind the auth guard.
pub(crate) struct Endpoint {
    pub(crate) method: Method,
    pub(crate) handler: BoxedHandler,
    pub(crate) requires_auth: bool,
}

pub(crate) struct Route {
    pub(crate) pattern: Pattern,
    pub(crate) endpoints: Vec<Endpoint>,
}

/// The application router.
///
/// Build it once at startup and hand it to
/// [`Dispatcher::builder`](crate::Dispatcher::builder). Each registration
/// returns `self` so calls chain naturally.
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a public handler for a method + pattern pair.
    ///
    /// Path parameters use `:name` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust
    /// # use serde_json::{json, Value};
    /// # use sluice::{Fault, Method, Request, Router};
    /// # async fn health(_: Request) -> Result<Value, Fault> { Ok(json!({"status": "ok"})) }
    /// # async fn delete_todo(_: Request) -> Result<Value, Fault> { Ok(json!({})) }
    /// Router::new()
    ///     .on(Method::Get, "/health", health)
    ///     .on_authed(Method::Delete, "/todos/:id", delete_todo);
    /// ```
    ///
    /// Registering the same (pattern, method) twice replaces the first handler.
    ///
    /// # Panics
    ///
    /// Panics on a malformed pattern (missing leading `/`, unnamed or
    /// duplicated parameter). Routes are a startup-time declaration.
    pub fn on(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler, false)
    }

    /// Register a handler that runs only for authenticated requests.
    ///
    /// The dispatcher places its auth guard directly around this handler.
    pub fn on_authed(self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.add(method, path, handler, true)
    }

    fn add(mut self, method: Method, path: &str, handler: impl Handler, requires_auth: bool) -> Self {
        let endpoint = Endpoint { method, handler: handler.into_boxed_handler(), requires_auth };

        let idx = match self.routes.iter().position(|r| r.pattern.as_str() == path) {
            Some(idx) => idx,
            None => {
                let pattern = Pattern::parse(path)
                    .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
                self.routes.push(Route { pattern, endpoints: Vec::new() });
                self.routes.len() - 1
            }
        };
        let route = &mut self.routes[idx];

        match route.endpoints.iter_mut().find(|ep| ep.method == method) {
            Some(existing) => *existing = endpoint,
            None => route.endpoints.push(endpoint),
        }
        self
    }

    /// Number of distinct patterns registered.
    pub fn len(&self) -> usize { self.routes.len() }

    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    pub(crate) fn endpoints_mut(&mut self) -> impl Iterator<Item = &mut Endpoint> {
        self.routes.iter_mut().flat_map(|r| r.endpoints.iter_mut())
    }

    /// Finds the handler for a raw method token and a path (no query string).
    ///
    /// The method is matched only after a pattern fits, so an unknown method
    /// token on a known path is a 405 and not a 404.
    pub(crate) fn lookup(
        &self,
        method: &str,
        path: &str,
    ) -> Result<(&Endpoint, HashMap<String, String>), RouteError> {
        let (route, params) = self.routes.iter()
            .find_map(|r| r.pattern.matches(path).map(|params| (r, params)))
            .ok_or(RouteError::NotFound)?;

        let wanted = method.parse::<Method>().ok();
        route.endpoints.iter()
            .find(|ep| Some(ep.method) == wanted)
            .map(|ep| (ep, params))
            .ok_or_else(|| RouteError::MethodNotAllowed {
                allowed: route.endpoints.iter().map(|ep| ep.method).collect(),
            })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::error::Fault;
    use crate::handler::ErasedHandler;
    use crate::request::Request;

    fn tagged(tag: &'static str) -> impl Handler {
        move |_req: Request| async move { Ok::<_, Fault>(json!(tag)) }
    }

    fn request(method: Method, path: &str, params: HashMap<String, String>) -> Request {
        Request::new(method, path.into(), HashMap::new(), Vec::new(), None, params, "test".into())
    }

    async fn call(router: &Router, method: &str, path: &str) -> Result<Value, RouteError> {
        let (ep, params) = router.lookup(method, path)?;
        let res = ep.handler.call(request(ep.method, path, params)).await.unwrap();
        Ok(res.body().cloned().unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn first_registered_wins() {
        let router = Router::new()
            .on(Method::Get, "/todos/:id", tagged("param"))
            .on(Method::Get, "/todos/latest", tagged("literal"));

        assert_eq!(call(&router, "GET", "/todos/latest").await, Ok(json!("param")));
    }

    #[tokio::test]
    async fn distinguishes_not_found_from_method_not_allowed() {
        let router = Router::new()
            .on(Method::Get, "/todos", tagged("list"))
            .on(Method::Post, "/todos", tagged("create"));

        assert_eq!(call(&router, "GET", "/nope").await, Err(RouteError::NotFound));
        assert_eq!(
            call(&router, "DELETE", "/todos").await,
            Err(RouteError::MethodNotAllowed { allowed: vec![Method::Get, Method::Post] }),
        );
        assert!(matches!(call(&router, "BREW", "/todos").await, Err(RouteError::MethodNotAllowed { .. })));
    }

    #[tokio::test]
    async fn duplicate_registration_overwrites() {
        let router = Router::new()
            .on(Method::Get, "/hello", tagged("old"))
            .on_authed(Method::Get, "/hello", tagged("new"));

        assert_eq!(router.len(), 1);
        let (ep, _) = router.lookup("GET", "/hello").unwrap();
        assert!(ep.requires_auth);
        assert_eq!(call(&router, "GET", "/hello").await, Ok(json!("new")));
    }

    #[tokio::test]
    async fn binds_params_for_the_matched_handler() {
        let router = Router::new().on(Method::Patch, "/todos/:id/toggle", |req: Request| async move {
            Ok::<_, Fault>(json!(req.param("id")))
        });

        assert_eq!(call(&router, "PATCH", "/todos/42/toggle").await, Ok(json!("42")));
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn malformed_pattern_panics() {
        let _ = Router::new().on(Method::Get, "/a/:x/:x", tagged("x"));
    }
}
