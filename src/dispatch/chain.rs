use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::dispatch::{Dispatcher, NamedHandler};
use crate::http::request::{HttpVersion, Method, Request};
use crate::http::response::{Response, StatusCode};

/// First stage: selects the next dispatcher by protocol version.
pub struct VersionDispatcher {
    name: String,
    handlers: HashMap<HttpVersion, Arc<dyn Dispatcher>>,
}

impl VersionDispatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
        }
    }

    pub fn with(mut self, version: HttpVersion, next: Arc<dyn Dispatcher>) -> Self {
        self.handlers.insert(version, next);
        self
    }
}

impl Dispatcher for VersionDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        let version = request.version();
        match self.handlers.get(&version) {
            Some(next) => next.handle(request),
            None => Ok(Response::error_with_message(
                StatusCode::HttpVersionNotSupported,
                &format!("Unsupported HTTP version: {version}"),
            )),
        }
    }
}

/// Selects the next dispatcher by media type; parameters are ignored and a
/// request without `Content-Type` looks up `*`.
pub struct ContentTypeDispatcher {
    name: String,
    handlers: HashMap<String, Arc<dyn Dispatcher>>,
}

impl ContentTypeDispatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
        }
    }

    /// Registers `next` for every media type in `media_types`.
    pub fn with<I, S>(mut self, media_types: I, next: Arc<dyn Dispatcher>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for media_type in media_types {
            self.handlers
                .insert(media_type.as_ref().trim().to_string(), next.clone());
        }
        self
    }
}

impl Dispatcher for ContentTypeDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        let media_type = request.media_type();
        match self.handlers.get(media_type) {
            Some(next) => next.handle(request),
            None => Ok(Response::error_with_message(
                StatusCode::UnsupportedMediaType,
                &format!("Content type not supported: {media_type}"),
            )),
        }
    }
}

/// Last stage: hands the request to the named handler bound to its method.
pub struct MethodDispatcher {
    name: String,
    handlers: HashMap<Method, Arc<dyn NamedHandler>>,
}

impl MethodDispatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
        }
    }

    pub fn with(mut self, method: Method, handler: Arc<dyn NamedHandler>) -> Self {
        self.handlers.insert(method, handler);
        self
    }

    pub fn bound_methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.handlers.keys().copied()
    }
}

impl Dispatcher for MethodDispatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, request: &Request) -> anyhow::Result<Response> {
        let method = request.method();
        match self.handlers.get(&method) {
            Some(handler) => {
                debug!(%method, uri = %request.uri(), handler = handler.name(), "Dispatching");
                handler.handle(request)
            }
            None => Ok(Response::error_with_message(
                StatusCode::BadRequest,
                &format!("Unsupported method: {method}"),
            )),
        }
    }
}
