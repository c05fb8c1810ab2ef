//! Dotted-path handler registry.
//!
//! Handlers are named by dotted paths such as `site.handlers.Page`. The
//! registry is assembled once at startup and never mutated afterwards;
//! registering a handler also makes each of its parent namespaces (`site`,
//! `site.handlers`) resolvable, so a path can name something that exists but
//! is not a handler.

use crate::dispatch::Handler;
use crate::error::HandlerError;
use crate::node::Node;
use crate::redirect::RedirectHandler;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Builds a handler bound to one node.
pub type HandlerFactory = Arc<dyn Fn(&Node) -> Box<dyn Handler> + Send + Sync>;

/// What a dotted path resolved to.
#[derive(Clone)]
pub enum Importable {
    Namespace(String),
    Handler(HandlerFactory),
}

impl std::fmt::Debug for Importable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Importable::Namespace(name) => f.debug_tuple("Namespace").field(name).finish(),
            Importable::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// Immutable table of handler factories keyed by dotted path.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, HandlerFactory>,
    namespaces: BTreeSet<String>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: BTreeMap<String, HandlerFactory>,
}

impl HandlerRegistryBuilder {
    pub fn register(mut self, path: impl Into<String>, factory: HandlerFactory) -> Self {
        self.handlers.insert(path.into(), factory);
        self
    }

    pub fn build(self) -> HandlerRegistry {
        let mut namespaces = BTreeSet::new();
        for path in self.handlers.keys() {
            let mut end = path.len();
            while let Some(dot) = path[..end].rfind('.') {
                namespaces.insert(path[..dot].to_string());
                end = dot;
            }
        }
        HandlerRegistry {
            handlers: self.handlers,
            namespaces,
        }
    }
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Registry holding the handlers shipped with this crate.
    pub fn builtin() -> Self {
        Self::builder()
            .register(RedirectHandler::PATH, RedirectHandler::factory())
            .build()
    }

    /// Resolve a dotted path to a namespace or a handler.
    ///
    /// Paths need at least two components; `"antigravity"` and `""` are
    /// rejected as malformed before any lookup.
    pub fn resolve(&self, dotted: &str) -> Result<Importable, HandlerError> {
        if dotted.split('.').count() < 2 {
            return Err(HandlerError::Malformed(dotted.to_string()));
        }
        if let Some(factory) = self.handlers.get(dotted) {
            return Ok(Importable::Handler(factory.clone()));
        }
        if self.namespaces.contains(dotted) {
            return Ok(Importable::Namespace(dotted.to_string()));
        }
        Err(HandlerError::Import(dotted.to_string()))
    }

    /// Resolve a dotted path that must name a handler.
    pub fn resolve_handler(&self, dotted: &str) -> Result<HandlerFactory, HandlerError> {
        match self.resolve(dotted)? {
            Importable::Handler(factory) => Ok(factory),
            Importable::Namespace(name) => Err(HandlerError::NotAHandler(name)),
        }
    }

    pub fn handler_paths(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
