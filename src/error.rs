//! Error types.
//!
//! Two kinds of failure exist and they never mix:
//!
//! - [`Error`]: infrastructure failures of the engine itself (binding a
//!   port, an invalid listen address). Returned from [`Server`](crate::Server).
//! - [`Fault`]: an *unexpected* failure inside a handler or middleware, such
//!   as a storage or crypto collaborator breaking. The dispatcher logs it in
//!   full and answers with a sanitized 500.
//!
//! Expected application outcomes (400, 401, 404, 409, 429) are plain
//! [`Response`](crate::Response) values, not errors.

use std::fmt;

/// The error type returned by sluice's fallible infrastructure operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listen address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// An unexpected handler or middleware failure.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into a `Fault`,
/// so handlers can use `?` on collaborator results directly:
///
/// ```rust
/// use sluice::{Fault, Request, Response};
///
/// async fn read_config(_req: Request) -> Result<Response, Fault> {
///     let raw = std::fs::read_to_string("/definitely/missing")?;
///     Ok(Response::json(serde_json::json!({ "len": raw.len() })))
/// }
/// ```
///
/// `Fault` must not implement `std::error::Error` itself, or the blanket
/// `From` impl would overlap with `From<T> for T`.
pub struct Fault(Box<dyn std::error::Error + Send + Sync + 'static>);

impl Fault {
    /// A fault carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into().into())
    }

    /// The outermost error message. Safe to show to a client as a short detail.
    pub fn detail(&self) -> String {
        self.0.to_string()
    }

    /// Every message in the source chain, outermost first, joined by `": "`.
    /// For server-side logs only.
    pub fn chain(&self) -> String {
        let mut out = self.0.to_string();
        let mut source = self.0.source();
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

impl<E> From<E> for Fault
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        Self(Box::new(e))
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
