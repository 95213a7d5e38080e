//! Route patterns with named segments.
//!
//! A pattern is a `/`-separated template of literal segments and named
//! parameters written `:name`. `/todos/:id/toggle` matches `/todos/42/toggle`
//! and binds `id = "42"`.
//!
//! Rules:
//! - segment counts must be equal;
//! - a literal segment matches only itself, byte for byte;
//! - a parameter matches any single **non-empty** segment;
//! - one leading `/` is stripped before splitting and empty segments are
//!   kept, so `/todos/` (two segments) never matches `/todos` (one).

use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Debug, Eq, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// Why a pattern string was rejected at registration.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("pattern `{0}` must start with `/`")]
    MissingLeadingSlash(String),

    #[error("pattern `{pattern}` has an unnamed parameter segment")]
    EmptyParam { pattern: String },

    #[error("pattern `{pattern}` binds `{name}` more than once")]
    DuplicateParam { pattern: String, name: String },
}

/// A compiled route pattern.
#[derive(Clone, Debug)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        if !raw.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash(raw.to_owned()));
        }

        let mut segments = Vec::new();
        let mut seen: Vec<&str> = Vec::new();
        for part in split(raw) {
            match part.strip_prefix(':') {
                Some("") => return Err(PatternError::EmptyParam { pattern: raw.to_owned() }),
                Some(name) => {
                    if seen.contains(&name) {
                        return Err(PatternError::DuplicateParam {
                            pattern: raw.to_owned(),
                            name: name.to_owned(),
                        });
                    }
                    seen.push(name);
                    segments.push(Segment::Param(name.to_owned()));
                }
                None => segments.push(Segment::Literal(part.to_owned())),
            }
        }

        Ok(Self { raw: raw.to_owned(), segments })
    }

    pub fn as_str(&self) -> &str { &self.raw }

    /// Matches a request path (no query string) and returns the bound
    /// parameters, or `None` when the path does not fit this pattern.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => { params.insert(name.clone(), part.to_owned()); }
            }
        }
        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn split(path: &str) -> std::str::Split<'_, char> {
    path.strip_prefix('/').unwrap_or(path).split('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(raw: &str) -> Pattern {
        Pattern::parse(raw).unwrap()
    }

    #[test]
    fn binds_named_segments() {
        let params = p("/todos/:id/toggle").matches("/todos/42/toggle").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["id"], "42");
    }

    #[test]
    fn literal_only() {
        assert_eq!(p("/health").matches("/health"), Some(HashMap::new()));
        assert_eq!(p("/health").matches("/healthz"), None);
        assert_eq!(p("/").matches("/"), Some(HashMap::new()));
    }

    #[test]
    fn segment_counts_must_agree() {
        assert_eq!(p("/todos/:id").matches("/todos"), None);
        assert_eq!(p("/todos/:id").matches("/todos/1/toggle"), None);
        assert_eq!(p("/todos").matches("/todos/"), None);
    }

    #[test]
    fn params_never_bind_empty_segments() {
        assert_eq!(p("/todos/:id").matches("/todos/"), None);
        assert_eq!(p("/a/:x/b").matches("/a//b"), None);
    }

    #[test]
    fn several_params() {
        let params = p("/users/:user/todos/:todo").matches("/users/7/todos/x9").unwrap();
        assert_eq!(params["user"], "7");
        assert_eq!(params["todo"], "x9");
    }

    #[test]
    fn rejects_bad_patterns() {
        assert_eq!(
            Pattern::parse("/a/:id/b/:id").unwrap_err(),
            PatternError::DuplicateParam { pattern: "/a/:id/b/:id".into(), name: "id".into() },
        );
        assert!(matches!(Pattern::parse("todos"), Err(PatternError::MissingLeadingSlash(_))));
        assert!(matches!(Pattern::parse("/todos/:"), Err(PatternError::EmptyParam { .. })));
    }
}
