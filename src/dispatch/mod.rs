//! Request dispatch.
//!
//! A parsed request travels down a chain of pure lookups until it reaches a
//! named handler:
//!
//! ```text
//!   HTTP version ──▶ content type ──▶ method ──▶ named handler
//!      (505)            (415)          (400)
//! ```
//!
//! Each stage answers a miss with a fixed error response instead of failing.
//! The whole graph is assembled once at startup by [`build`] and is read-only
//! afterwards, so connection threads share it through an `Arc` without locks.

pub mod chain;
pub mod registry;

use crate::http::request::Request;
use crate::http::response::Response;

pub use chain::{ContentTypeDispatcher, MethodDispatcher, VersionDispatcher};
pub use registry::{DEFAULT_DISPATCHER, HandlerRegistry, WiringError, build};

/// A stage of the dispatch chain.
pub trait Dispatcher: Send + Sync {
    fn name(&self) -> &str;

    /// Produces the response for `request`. An `Err` is a handler fault and
    /// is answered with a 500 by the connection.
    fn handle(&self, request: &Request) -> anyhow::Result<Response>;
}

/// A terminal request handler, bound to methods by name in the configuration.
pub trait NamedHandler: Send + Sync {
    /// Stable name used in the handler bindings.
    fn name(&self) -> &str;

    fn handle(&self, request: &Request) -> anyhow::Result<Response>;
}
