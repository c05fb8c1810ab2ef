//! Handoff from a resolved node to its handler.

use crate::error::{Result, TreeError};
use crate::handler::{HandlerFactory, HandlerRegistry};
use crate::node::Node;
use crate::path;
use crate::resolve;
use crate::store::NodeReader;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The parts of an incoming request the tree cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub path: String,
}

impl Request {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// 301 when `permanent`, 302 otherwise.
    pub fn redirect(location: impl Into<String>, permanent: bool) -> Self {
        Self {
            status: if permanent { 301 } else { 302 },
            headers: vec![("Location".to_string(), location.into())],
            body: String::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Per-node request handling below the node's own url.
///
/// `path` is relative to the node and always starts with `/`; the node's own
/// url arrives as `/`. A path the handler does not serve must fail with
/// [`TreeError::NotFound`].
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request, path: &str, nodes: &dyn NodeReader) -> Result<Response>;
}

type View = Arc<dyn Fn(&Request, &Node) -> Response + Send + Sync>;

/// Serves a single view at the node's own url and nothing beneath it.
pub struct SimpleHandler {
    node: Node,
    view: View,
}

impl SimpleHandler {
    pub fn new(node: &Node, view: View) -> Self {
        Self {
            node: node.clone(),
            view,
        }
    }

    /// A factory binding `view` to whichever node the handler is built for.
    pub fn factory<F>(view: F) -> HandlerFactory
    where
        F: Fn(&Request, &Node) -> Response + Send + Sync + 'static,
    {
        let view: View = Arc::new(view);
        Arc::new(move |node: &Node| Box::new(SimpleHandler::new(node, view.clone())) as Box<dyn Handler>)
    }
}

impl Handler for SimpleHandler {
    fn handle(&self, request: &Request, path: &str, _nodes: &dyn NodeReader) -> Result<Response> {
        if path != "/" {
            return Err(TreeError::NotFound(path.to_string()));
        }
        Ok((self.view)(request, &self.node))
    }
}

/// Resolve `request.path` to its best node and hand the request over.
///
/// Only routable paths (empty, or ending in `/`) reach the tree; anything
/// else is [`TreeError::NotFound`] without a store query.
pub fn dispatch(
    nodes: &dyn NodeReader,
    registry: &HandlerRegistry,
    request: &Request,
) -> Result<Response> {
    if !path::is_routable(&request.path) {
        return Err(TreeError::NotFound(request.path.clone()));
    }
    let node = resolve::best_match(nodes, &request.path)?;
    node.handle(registry, nodes, request)
}
