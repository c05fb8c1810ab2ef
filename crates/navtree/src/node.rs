use crate::dispatch::{Handler, Request, Response};
use crate::error::{Result, TreeError};
use crate::handler::{HandlerFactory, HandlerRegistry};
use crate::path::{self, ROOT_URL};
use crate::redirect::{Redirect, RedirectHandler};
use crate::store::NodeReader;
use serde::{Deserialize, Serialize};

/// Store-assigned node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An entry in the routing tree.
///
/// `url` is a cache of the parent/slug chain: `/` for the root, otherwise the
/// parent's url followed by `slug/`. It is recomputed on every save and must
/// not be edited by hand.
///
/// A node is valid when it has both a parent and a slug (a child) or neither
/// (the root). Construction never checks this; saving does.
///
/// # Builder API
///
/// ```
/// use navtree::v1::{Node, NodeId};
///
/// let root = Node::root("site.handlers.Home");
/// assert!(root.is_root());
///
/// let about = Node::child(NodeId(1), "about", "site.handlers.Page");
/// assert_eq!(about.slug, "about");
/// assert!(about.id.is_none());
/// ```
///
/// # JSON shape
///
/// ```json
/// {
///   "id": 2,
///   "parent": 1,
///   "slug": "about",
///   "url": "/about/",
///   "handler": "site.handlers.Page"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// `None` until the node is first saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub url: String,
    /// Dotted path of the handler bound to this node.
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
    /// Url as last read from or written to the store.
    #[serde(skip)]
    persisted_url: Option<String>,
}

impl Node {
    /// A node with an arbitrary parent/slug combination.
    pub fn new(parent: Option<NodeId>, slug: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            id: None,
            parent,
            slug: slug.into(),
            url: String::new(),
            handler: handler.into(),
            redirect: None,
            persisted_url: None,
        }
    }

    pub fn root(handler: impl Into<String>) -> Self {
        Self::new(None, "", handler)
    }

    pub fn child(parent: NodeId, slug: impl Into<String>, handler: impl Into<String>) -> Self {
        Self::new(Some(parent), slug, handler)
    }

    /// Turn this node into a redirect to `target`.
    pub fn with_redirect(mut self, target: NodeId, permanent: bool) -> Self {
        self.handler = RedirectHandler::PATH.to_string();
        self.redirect = Some(Redirect { target, permanent });
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of slugs in the cached url; the root is at depth 0.
    pub fn depth(&self) -> usize {
        self.url.matches('/').count().saturating_sub(1)
    }

    /// The url the store currently holds for this node, if it has been saved.
    pub fn persisted_url(&self) -> Option<&str> {
        self.persisted_url.as_deref()
    }

    /// Record the current url as the stored one. Stores call this on every
    /// node they hand out.
    pub fn mark_persisted(&mut self) {
        self.persisted_url = Some(self.url.clone());
    }

    pub(crate) fn id_or_err(&self) -> Result<NodeId> {
        self.id
            .ok_or_else(|| TreeError::InvalidState(format!("node {:?} has not been saved", self.url)))
    }

    /// Resolve the handler factory named by `handler`.
    pub fn handler_factory(&self, registry: &HandlerRegistry) -> Result<HandlerFactory> {
        Ok(registry.resolve_handler(&self.handler)?)
    }

    /// Construct this node's handler, bound to the node.
    pub fn handler(&self, registry: &HandlerRegistry) -> Result<Box<dyn Handler>> {
        let factory = self.handler_factory(registry)?;
        Ok(factory(self))
    }

    /// Hand `request` to this node's handler with the path made node-relative.
    pub fn handle(
        &self,
        registry: &HandlerRegistry,
        nodes: &dyn NodeReader,
        request: &Request,
    ) -> Result<Response> {
        let relative = path::node_relative(&self.url, &request.path)
            .ok_or_else(|| TreeError::NotFound(request.path.clone()))?;
        tracing::debug!(url = %self.url, path = %relative, handler = %self.handler, "dispatching");
        self.handler(registry)?.handle(request, &relative, nodes)
    }

    /// Url this node would have under a parent at `parent_url`.
    pub(crate) fn url_under(&self, parent_url: Option<&str>) -> String {
        match parent_url {
            Some(parent_url) => path::join_path(parent_url, &self.slug),
            None => ROOT_URL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::SimpleHandler;
    use crate::store::MemoryStore;

    #[test]
    fn test_root_and_child_constructors() {
        let root = Node::root("a.Handler");
        assert!(root.is_root());
        assert_eq!(root.slug, "");
        assert!(root.id.is_none());
        assert!(root.persisted_url().is_none());

        let child = Node::child(NodeId(1), "leaf", "a.Handler");
        assert!(!child.is_root());
        assert_eq!(child.parent, Some(NodeId(1)));
    }

    #[test]
    fn test_invalid_combination_is_constructible() {
        // Validation happens on save.
        let node = Node::new(None, "slug", "a.Handler");
        assert!(node.is_root());
        assert_eq!(node.slug, "slug");
    }

    #[test]
    fn test_depth() {
        let mut node = Node::root("a.Handler");
        node.url = "/".into();
        assert_eq!(node.depth(), 0);
        node.url = "/branch/leaf/".into();
        assert_eq!(node.depth(), 2);
    }

    #[test]
    fn test_url_under() {
        let node = Node::child(NodeId(1), "leaf", "a.Handler");
        assert_eq!(node.url_under(Some("/branch/")), "/branch/leaf/");
        assert_eq!(Node::root("a.Handler").url_under(None), "/");
    }

    #[test]
    fn test_with_redirect() {
        let node = Node::child(NodeId(1), "old", "a.Handler").with_redirect(NodeId(7), true);
        assert_eq!(node.handler, RedirectHandler::PATH);
        let redirect = node.redirect.unwrap();
        assert_eq!(redirect.target, NodeId(7));
        assert!(redirect.permanent);
    }

    #[test]
    fn test_serialization_skips_persisted_url() {
        let mut node = Node::child(NodeId(1), "leaf", "a.Handler");
        node.id = Some(NodeId(2));
        node.url = "/leaf/".into();
        node.mark_persisted();

        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"id\":2"));
        assert!(json.contains("\"parent\":1"));
        assert!(!json.contains("persisted"));
        assert!(!json.contains("redirect"));

        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, "/leaf/");
        assert!(back.persisted_url().is_none());
    }

    #[test]
    fn test_handler_factory_resolves_registered_handler() {
        let registry = HandlerRegistry::builder()
            .register("site.handlers.Page", SimpleHandler::factory(|_, node| {
                Response::ok(node.url.clone())
            }))
            .build();
        let node = Node::root("site.handlers.Page");
        assert!(node.handler_factory(&registry).is_ok());
        assert!(node.handler(&registry).is_ok());
    }

    #[test]
    fn test_handler_factory_unknown_path() {
        let registry = HandlerRegistry::builder().build();
        let node = Node::root("site.handlers.Missing");
        let err = node.handler_factory(&registry).err().unwrap();
        assert!(matches!(err, TreeError::Handler(_)));
    }

    #[test]
    fn test_handle_passes_node_relative_path() {
        let registry = HandlerRegistry::builder()
            .register("site.handlers.Echo", std::sync::Arc::new(|_: &Node| {
                Box::new(EchoHandler) as Box<dyn Handler>
            }))
            .build();
        let mut node = Node::child(NodeId(1), "branch", "site.handlers.Echo");
        node.url = "/branch/".into();

        let store = MemoryStore::new();
        let response = node
            .handle(&registry, &store, &Request::get("/branch/leaf/"))
            .unwrap();
        assert_eq!(response.body, "/leaf/");
    }

    struct EchoHandler;

    impl Handler for EchoHandler {
        fn handle(&self, _: &Request, path: &str, _: &dyn NodeReader) -> Result<Response> {
            Ok(Response::ok(path))
        }
    }
}
