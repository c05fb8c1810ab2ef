use crate::dispatch::{self, Request, Response};
use crate::error::{Result, TreeError};
use crate::handler::HandlerRegistry;
use crate::mutate::{self, Inconsistency};
use crate::node::{Node, NodeId};
use crate::resolve::{self, Resolution};
use crate::store::{MemoryStore, NodeStore};

/// A node store paired with the handlers its nodes may name.
///
/// Every structural change goes through [`mutate::save`], so cached urls
/// stay consistent with the parent/slug chain after each call returns.
#[derive(Debug)]
pub struct RouteTree<S = MemoryStore> {
    store: S,
    registry: HandlerRegistry,
}

impl RouteTree<MemoryStore> {
    /// An empty in-memory tree using the built-in handlers.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), HandlerRegistry::builtin())
    }
}

impl<S: NodeStore> RouteTree<S> {
    pub fn new(store: S, registry: HandlerRegistry) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn create_root(&mut self, handler: impl Into<String>) -> Result<Node> {
        let mut node = Node::root(handler);
        self.save(&mut node)?;
        Ok(node)
    }

    pub fn create_child(
        &mut self,
        parent: NodeId,
        slug: impl Into<String>,
        handler: impl Into<String>,
    ) -> Result<Node> {
        let mut node = Node::child(parent, slug, handler);
        self.save(&mut node)?;
        Ok(node)
    }

    pub fn create_redirect(
        &mut self,
        parent: NodeId,
        slug: impl Into<String>,
        target: NodeId,
        permanent: bool,
    ) -> Result<Node> {
        let mut node = Node::child(parent, slug, "").with_redirect(target, permanent);
        self.save(&mut node)?;
        Ok(node)
    }

    pub fn save(&mut self, node: &mut Node) -> Result<()> {
        mutate::save(&mut self.store, node)
    }

    pub fn rename(&mut self, id: NodeId, slug: impl Into<String>) -> Result<Node> {
        let mut node = self.store.get(id)?;
        node.slug = slug.into();
        self.save(&mut node)?;
        Ok(node)
    }

    /// Re-parent `id` beneath `parent`, keeping its slug.
    pub fn move_to(&mut self, id: NodeId, parent: NodeId) -> Result<Node> {
        let mut node = self.store.get(id)?;
        node.parent = Some(parent);
        self.save(&mut node)?;
        Ok(node)
    }

    /// Remove `id` and everything below it.
    pub fn delete(&mut self, id: NodeId) -> Result<usize> {
        self.store.delete(id)
    }

    pub fn get(&self, id: NodeId) -> Result<Node> {
        self.store.get(id)
    }

    /// The node stored at exactly `url`.
    pub fn get_by_url(&self, url: &str) -> Result<Node> {
        self.store
            .find_by_urls(&[url.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| TreeError::NotFound(url.to_string()))
    }

    /// Every node, parents before children.
    pub fn nodes(&self) -> Result<Vec<Node>> {
        self.store.all()
    }

    pub fn best_match(&self, path: &str) -> Result<Node> {
        resolve::best_match(&self.store, path)
    }

    pub fn resolve(&self, path: &str) -> Result<Resolution> {
        resolve::resolve(&self.store, path)
    }

    pub fn dispatch(&self, request: &Request) -> Result<Response> {
        dispatch::dispatch(&self.store, &self.registry, request)
    }

    pub fn verify(&self) -> Result<Vec<Inconsistency>> {
        mutate::verify(&self.store)
    }
}
