use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::config::{DispatchConfig, HandlerBindings};
use crate::dispatch::chain::{ContentTypeDispatcher, MethodDispatcher, VersionDispatcher};
use crate::dispatch::{Dispatcher, NamedHandler};
use crate::http::request::{HttpVersion, Method};

/// Name of the version dispatcher built by [`build`].
pub const DEFAULT_DISPATCHER: &str = "default";

/// Startup failures while wiring the dispatch graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WiringError {
    #[error("no handler named `{0}` is registered")]
    MissingHandler(String),
    #[error("handler name `{0}` is registered twice")]
    DuplicateHandler(String),
    #[error("`{0}` is not an HTTP method")]
    UnknownMethod(String),
    #[error("no dispatcher named `{0}`")]
    UnknownDispatcher(String),
}

/// Named handlers available for binding.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NamedHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn NamedHandler>) -> Result<(), WiringError> {
        let name = handler.name().to_string();
        if self.handlers.contains_key(&name) {
            return Err(WiringError::DuplicateHandler(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn NamedHandler>, WiringError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| WiringError::MissingHandler(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl TryFrom<Vec<Arc<dyn NamedHandler>>> for HandlerRegistry {
    type Error = WiringError;

    fn try_from(handlers: Vec<Arc<dyn NamedHandler>>) -> Result<Self, Self::Error> {
        let mut registry = Self::new();
        for handler in handlers {
            registry.register(handler)?;
        }
        Ok(registry)
    }
}

/// Builds the dispatch graph and returns the dispatcher named by
/// `config.start`.
///
/// Both protocol versions share one content-type dispatcher, which sends the
/// configured media types to one method dispatcher. Every binding must name a
/// registered handler.
pub fn build(
    config: &DispatchConfig,
    bindings: &HandlerBindings,
    handlers: Vec<Arc<dyn NamedHandler>>,
) -> Result<Arc<dyn Dispatcher>, WiringError> {
    let registry = HandlerRegistry::try_from(handlers)?;

    let mut methods = MethodDispatcher::new("method");
    for (method_name, handler_name) in bindings {
        let method = Method::from_str(&method_name.to_ascii_uppercase())
            .ok_or_else(|| WiringError::UnknownMethod(method_name.clone()))?;
        let handler = registry.resolve(handler_name)?;
        info!(%method, handler = handler_name.as_str(), "Bound handler");
        methods = methods.with(method, handler);
    }
    let methods: Arc<dyn Dispatcher> = Arc::new(methods);

    let content: Arc<dyn Dispatcher> = Arc::new(
        ContentTypeDispatcher::new("content-type").with(&config.text_content_types, methods),
    );

    let versions = VersionDispatcher::new(DEFAULT_DISPATCHER)
        .with(HttpVersion::Http10, content.clone())
        .with(HttpVersion::Http11, content);

    if config.start != DEFAULT_DISPATCHER {
        return Err(WiringError::UnknownDispatcher(config.start.clone()));
    }
    Ok(Arc::new(versions))
}
