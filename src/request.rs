//! Incoming request context.

use std::collections::HashMap;

use serde_json::Value;

use crate::method::Method;

/// One value of a query-string key.
///
/// `?page=2` yields `One("2")`; `?tag=a&tag=b` yields `Many(["a", "b"])`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// The first value, which is the only one for `One`.
    pub fn first(&self) -> &str {
        match self {
            Self::One(v) => v,
            Self::Many(vs) => vs.first().map(String::as_str).unwrap_or_default(),
        }
    }
}

/// Decodes an `application/x-www-form-urlencoded` query string.
pub(crate) fn parse_query(raw: &str) -> HashMap<String, QueryValue> {
    let mut out: HashMap<String, QueryValue> = HashMap::new();
    for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
        let v = v.into_owned();
        match out.remove(k.as_ref()) {
            None => { out.insert(k.into_owned(), QueryValue::One(v)); }
            Some(QueryValue::One(prev)) => { out.insert(k.into_owned(), QueryValue::Many(vec![prev, v])); }
            Some(QueryValue::Many(mut vs)) => {
                vs.push(v);
                out.insert(k.into_owned(), QueryValue::Many(vs));
            }
        }
    }
    out
}

/// An incoming HTTP request, one per dispatch.
///
/// Method, path and path parameters are read-only. Middleware that needs to
/// hand data to the handler (an authenticated user, a request id) does it
/// through [`extensions_mut`](Request::extensions_mut).
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: HashMap<String, QueryValue>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Option<Value>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) client: String,
    pub(crate) extensions: http::Extensions,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        query: HashMap<String, QueryValue>,
        headers: Vec<(String, String)>,
        body: Option<Value>,
        params: HashMap<String, String>,
        client: String,
    ) -> Self {
        Self {
            method,
            path,
            query,
            headers,
            body,
            params,
            client,
            extensions: http::Extensions::new(),
        }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }

    /// Client identifier used for rate limiting (the peer IP).
    pub fn client(&self) -> &str { &self.client }

    /// Decoded JSON body. `None` when the method carries no body, the body
    /// was empty, or it failed to parse. Handlers that need a body check this.
    pub fn json(&self) -> Option<&Value> { self.body.as_ref() }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/todos/:id`, `req.param("id")` on `/todos/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> { &self.params }

    pub fn query(&self, key: &str) -> Option<&QueryValue> {
        self.query.get(key)
    }

    /// First value of a query key.
    pub fn query_first(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(QueryValue::first)
    }

    pub fn extensions(&self) -> &http::Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut http::Extensions { &mut self.extensions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_keys_become_lists() {
        let q = parse_query("page=2&tag=a&tag=b&tag=c&q=hello%20world");
        assert_eq!(q["page"], QueryValue::One("2".into()));
        assert_eq!(q["tag"], QueryValue::Many(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(q["tag"].first(), "a");
        assert_eq!(q["q"].first(), "hello world");
    }

    #[test]
    fn empty_query() {
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(
            Method::Get,
            "/me".into(),
            HashMap::new(),
            vec![("Authorization".into(), "Bearer x".into())],
            None,
            HashMap::new(),
            "127.0.0.1".into(),
        );
        assert_eq!(req.header("authorization"), Some("Bearer x"));
        assert_eq!(req.header("x-missing"), None);
    }
}
