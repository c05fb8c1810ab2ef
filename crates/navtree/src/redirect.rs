//! Nodes that send the browser somewhere else in the tree.

use crate::dispatch::{Handler, Request, Response};
use crate::error::{Result, TreeError};
use crate::handler::HandlerFactory;
use crate::node::{Node, NodeId};
use crate::store::NodeReader;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// When the owning node is browsed to, redirect to `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub target: NodeId,
    #[serde(default)]
    pub permanent: bool,
}

/// Check a redirect node before it is written. A node cannot redirect to
/// itself.
pub fn validate(node: &Node) -> Result<()> {
    if let (Some(redirect), Some(id)) = (&node.redirect, node.id)
        && redirect.target == id
    {
        return Err(TreeError::validation(
            "target",
            "a redirect cannot redirect to itself",
        ));
    }
    Ok(())
}

/// Answers the node's own url with a redirect to the target's current url.
pub struct RedirectHandler {
    redirect: Option<Redirect>,
}

impl RedirectHandler {
    pub const PATH: &'static str = "navtree.handlers.RedirectHandler";

    pub fn new(node: &Node) -> Self {
        Self {
            redirect: node.redirect,
        }
    }

    pub fn factory() -> HandlerFactory {
        Arc::new(|node: &Node| Box::new(RedirectHandler::new(node)) as Box<dyn Handler>)
    }
}

impl Handler for RedirectHandler {
    fn handle(&self, _request: &Request, path: &str, nodes: &dyn NodeReader) -> Result<Response> {
        if path != "/" {
            return Err(TreeError::NotFound(path.to_string()));
        }
        let redirect = self.redirect.ok_or_else(|| {
            TreeError::InvalidState("redirect handler bound to a node without a target".into())
        })?;
        let target = nodes.get(redirect.target)?;
        Ok(Response::redirect(target.url, redirect.permanent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch;
    use crate::handler::HandlerRegistry;
    use crate::mutate;
    use crate::store::MemoryStore;

    fn setup() -> (MemoryStore, Node) {
        let mut store = MemoryStore::new();
        let mut root = Node::root("site.handlers.Page");
        mutate::save(&mut store, &mut root).unwrap();
        let mut target = Node::child(root.id.unwrap(), "target", "site.handlers.Page");
        mutate::save(&mut store, &mut target).unwrap();
        (store, target)
    }

    #[test]
    fn test_validate_allows_other_target() {
        let mut node = Node::child(NodeId(1), "old", "x.y").with_redirect(NodeId(2), false);
        node.id = Some(NodeId(3));
        assert!(validate(&node).is_ok());
    }

    #[test]
    fn test_validate_rejects_self_target() {
        let mut node = Node::child(NodeId(1), "old", "x.y").with_redirect(NodeId(3), false);
        node.id = Some(NodeId(3));
        let err = validate(&node).unwrap_err();
        assert!(matches!(err, TreeError::Validation { ref field, .. } if field == "target"));
    }

    #[test]
    fn test_save_rejects_self_redirect_before_write() {
        let (mut store, mut target) = setup();
        target.redirect = Some(Redirect {
            target: target.id.unwrap(),
            permanent: false,
        });
        store.reset_stats();

        assert!(mutate::save(&mut store, &mut target).is_err());
        assert_eq!(store.stats().writes, 0);
    }

    #[test]
    fn test_redirect_dispatch() {
        let (mut store, target) = setup();
        let mut old = Node::child(target.parent.unwrap(), "old", "")
            .with_redirect(target.id.unwrap(), true);
        mutate::save(&mut store, &mut old).unwrap();

        let registry = HandlerRegistry::builtin();
        let response = dispatch(&store, &registry, &Request::get("/old/")).unwrap();
        assert_eq!(response.status, 301);
        assert_eq!(response.header("Location"), Some("/target/"));
    }

    #[test]
    fn test_redirect_follows_renamed_target() {
        let (mut store, mut target) = setup();
        let mut old = Node::child(target.parent.unwrap(), "old", "")
            .with_redirect(target.id.unwrap(), false);
        mutate::save(&mut store, &mut old).unwrap();

        target.slug = "moved".into();
        mutate::save(&mut store, &mut target).unwrap();

        let registry = HandlerRegistry::builtin();
        let response = dispatch(&store, &registry, &Request::get("/old/")).unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(response.header("Location"), Some("/moved/"));
    }

    #[test]
    fn test_redirect_rejects_sub_path() {
        let (mut store, target) = setup();
        let mut old = Node::child(target.parent.unwrap(), "old", "")
            .with_redirect(target.id.unwrap(), false);
        mutate::save(&mut store, &mut old).unwrap();

        let registry = HandlerRegistry::builtin();
        let err = dispatch(&store, &registry, &Request::get("/old/deeper/")).unwrap_err();
        assert!(err.is_not_found());
    }
}
