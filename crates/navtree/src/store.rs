//! Persistence boundary for route nodes.
//!
//! [`NodeReader`] and [`NodeStore`] are what the tree needs from a backing
//! store: unique constraints on `(parent, slug)` and on `url`, a pre-ordered
//! descendant fetch and a multi-url lookup, each answered in one round-trip.
//! [`MemoryStore`] implements both in memory and counts every round-trip so
//! the cost of an operation can be asserted.

use crate::error::{Constraint, Result, TreeError};
use crate::node::{Node, NodeId};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Read side of a node store.
pub trait NodeReader {
    fn get(&self, id: NodeId) -> Result<Node>;

    /// All nodes below `id`, every ancestor before its descendants.
    fn descendants(&self, id: NodeId) -> Result<Vec<Node>>;

    /// Nodes whose url is one of `urls`, in no particular order.
    fn find_by_urls(&self, urls: &[String]) -> Result<Vec<Node>>;

    /// Every node, pre-ordered.
    fn all(&self) -> Result<Vec<Node>>;
}

/// Write side of a node store.
pub trait NodeStore: NodeReader {
    /// Persist a new node and return its assigned id.
    fn insert(&mut self, node: &Node) -> Result<NodeId>;

    /// Persist every field of an existing node.
    fn update(&mut self, node: &Node) -> Result<()>;

    /// Overwrite only the cached url of an existing node.
    fn update_url(&mut self, id: NodeId, url: &str) -> Result<()>;

    /// Remove a node together with its subtree and any redirects aimed into
    /// it. Returns the number removed.
    fn delete(&mut self, id: NodeId) -> Result<usize>;

    /// Run `f` as one transaction: if it fails, none of its writes remain.
    fn atomic<T, F>(&mut self, f: F) -> Result<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T>;
}

/// Round-trips made against a [`MemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Every read round-trip, of any kind.
    pub reads: usize,
    pub descendant_fetches: usize,
    pub url_lookups: usize,
    pub writes: usize,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    nodes: HashMap<NodeId, Node>,
    /// Ordered child lists; roots live under `None`.
    children: BTreeMap<Option<NodeId>, Vec<NodeId>>,
    by_url: HashMap<String, NodeId>,
    next_id: u64,
}

impl Tables {
    fn record(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(TreeError::UnknownNode(id))
    }

    fn loaded(&self, id: NodeId) -> Result<Node> {
        let mut node = self.record(id)?.clone();
        node.mark_persisted();
        Ok(node)
    }

    fn check_unique(&self, id: Option<NodeId>, node: &Node) -> Result<()> {
        if let Some(parent) = node.parent {
            if !self.nodes.contains_key(&parent) {
                return Err(TreeError::UnknownNode(parent));
            }
            let clash = self
                .children
                .get(&Some(parent))
                .into_iter()
                .flatten()
                .filter(|sibling| Some(**sibling) != id)
                .any(|sibling| self.nodes[sibling].slug == node.slug);
            if clash {
                return Err(TreeError::Uniqueness(Constraint::ParentSlug {
                    parent,
                    slug: node.slug.clone(),
                }));
            }
        }
        self.check_url(id, &node.url)
    }

    fn check_url(&self, id: Option<NodeId>, url: &str) -> Result<()> {
        match self.by_url.get(url) {
            Some(owner) if Some(*owner) != id => {
                Err(TreeError::Uniqueness(Constraint::Url(url.to_string())))
            }
            _ => Ok(()),
        }
    }

    fn set_url(&mut self, id: NodeId, url: &str) {
        let Some(record) = self.nodes.get_mut(&id) else {
            return;
        };
        if self.by_url.get(&record.url) == Some(&id) {
            self.by_url.remove(&record.url);
        }
        record.url = url.to_string();
        self.by_url.insert(url.to_string(), id);
    }

    fn unlink(&mut self, parent: Option<NodeId>, id: NodeId) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|sibling| *sibling != id);
        }
    }

    /// `id`, its subtree, and every redirect (with its own subtree) whose
    /// target is among them, repeated until nothing new is reached.
    fn doomed(&self, id: NodeId) -> Vec<NodeId> {
        let mut doomed = vec![id];
        doomed.extend(self.walk(Some(id)));
        let mut seen: HashSet<NodeId> = doomed.iter().copied().collect();
        loop {
            let redirects: Vec<NodeId> = self
                .nodes
                .iter()
                .filter(|(other, _)| !seen.contains(*other))
                .filter(|(_, node)| {
                    node.redirect
                        .is_some_and(|redirect| seen.contains(&redirect.target))
                })
                .map(|(other, _)| *other)
                .collect();
            if redirects.is_empty() {
                return doomed;
            }
            for redirect in redirects {
                if !seen.insert(redirect) {
                    continue;
                }
                doomed.push(redirect);
                for below in self.walk(Some(redirect)) {
                    if seen.insert(below) {
                        doomed.push(below);
                    }
                }
            }
        }
    }

    /// Ids below `start` in pre-order, excluding `start` itself. Each id is
    /// visited once, so a stored parent cycle cannot trap the walk.
    fn walk(&self, start: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen: HashSet<NodeId> = start.into_iter().collect();
        let mut stack: Vec<NodeId> = self
            .children
            .get(&start)
            .map(|c| c.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            if let Some(children) = self.children.get(&Some(id)) {
                stack.extend(children.iter().rev().copied());
            }
        }
        out
    }
}

/// In-memory [`NodeStore`] backed by an adjacency list with ordered children.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    stats: Cell<QueryStats>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from saved nodes listed parents-first.
    ///
    /// Every node must carry an id, reference an already listed parent and
    /// satisfy the unique constraints, and every redirect must target a listed
    /// node. Cached urls are taken as given; use
    /// [`crate::mutate::verify`] to check them.
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self> {
        let mut tables = Tables::default();
        for node in nodes {
            let id = node.id.ok_or_else(|| {
                TreeError::InvalidState(format!("stored node {:?} has no id", node.url))
            })?;
            if tables.nodes.contains_key(&id) {
                return Err(TreeError::InvalidState(format!("duplicate node id {}", id)));
            }
            tables.check_unique(Some(id), &node)?;
            tables.children.entry(node.parent).or_default().push(id);
            tables.by_url.insert(node.url.clone(), id);
            tables.next_id = tables.next_id.max(id.0 + 1);
            tables.nodes.insert(id, node);
        }
        if let Some(target) = tables
            .nodes
            .values()
            .filter_map(|node| node.redirect)
            .map(|redirect| redirect.target)
            .find(|target| !tables.nodes.contains_key(target))
        {
            return Err(TreeError::UnknownNode(target));
        }
        Ok(Self {
            tables,
            stats: Cell::default(),
        })
    }

    /// Every node, pre-ordered, without touching the counters.
    pub fn into_nodes(self) -> Vec<Node> {
        let order = self.tables.walk(None);
        let mut nodes = self.tables.nodes;
        order
            .into_iter()
            .filter_map(|id| nodes.remove(&id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tables.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.nodes.is_empty()
    }

    pub fn stats(&self) -> QueryStats {
        self.stats.get()
    }

    pub fn reset_stats(&self) {
        self.stats.set(QueryStats::default());
    }

    fn count(&self, f: impl FnOnce(&mut QueryStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl NodeReader for MemoryStore {
    fn get(&self, id: NodeId) -> Result<Node> {
        self.count(|s| s.reads += 1);
        self.tables.loaded(id)
    }

    fn descendants(&self, id: NodeId) -> Result<Vec<Node>> {
        self.count(|s| {
            s.reads += 1;
            s.descendant_fetches += 1;
        });
        self.tables.record(id)?;
        let nodes = self
            .tables
            .walk(Some(id))
            .into_iter()
            .map(|d| self.tables.loaded(d))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(%id, count = nodes.len(), "fetched descendants");
        Ok(nodes)
    }

    fn find_by_urls(&self, urls: &[String]) -> Result<Vec<Node>> {
        self.count(|s| {
            s.reads += 1;
            s.url_lookups += 1;
        });
        let unique: HashSet<&String> = urls.iter().collect();
        unique
            .into_iter()
            .filter_map(|url| self.tables.by_url.get(url))
            .map(|id| self.tables.loaded(*id))
            .collect()
    }

    fn all(&self) -> Result<Vec<Node>> {
        self.count(|s| s.reads += 1);
        self.tables
            .walk(None)
            .into_iter()
            .map(|id| self.tables.loaded(id))
            .collect()
    }
}

impl NodeStore for MemoryStore {
    fn insert(&mut self, node: &Node) -> Result<NodeId> {
        self.count(|s| s.writes += 1);
        self.tables.check_unique(None, node)?;

        let id = NodeId(self.tables.next_id.max(1));
        self.tables.next_id = id.0 + 1;

        let mut record = node.clone();
        record.id = Some(id);
        self.tables.children.entry(record.parent).or_default().push(id);
        self.tables.by_url.insert(record.url.clone(), id);
        self.tables.nodes.insert(id, record);
        tracing::debug!(%id, url = %node.url, "inserted node");
        Ok(id)
    }

    fn update(&mut self, node: &Node) -> Result<()> {
        self.count(|s| s.writes += 1);
        let id = node.id_or_err()?;
        let old_parent = self.tables.record(id)?.parent;
        self.tables.check_unique(Some(id), node)?;

        if old_parent != node.parent {
            self.tables.unlink(old_parent, id);
            self.tables.children.entry(node.parent).or_default().push(id);
        }
        self.tables.set_url(id, &node.url);
        if let Some(record) = self.tables.nodes.get_mut(&id) {
            *record = node.clone();
        }
        tracing::debug!(%id, url = %node.url, "updated node");
        Ok(())
    }

    fn update_url(&mut self, id: NodeId, url: &str) -> Result<()> {
        self.count(|s| s.writes += 1);
        self.tables.record(id)?;
        self.tables.check_url(Some(id), url)?;
        self.tables.set_url(id, url);
        Ok(())
    }

    fn delete(&mut self, id: NodeId) -> Result<usize> {
        self.count(|s| s.writes += 1);
        self.tables.record(id)?;
        let doomed = self.tables.doomed(id);

        for gone in &doomed {
            if let Some(record) = self.tables.nodes.remove(gone) {
                self.tables.by_url.remove(&record.url);
                self.tables.unlink(record.parent, *gone);
            }
            self.tables.children.remove(&Some(*gone));
        }
        tracing::debug!(%id, removed = doomed.len(), "deleted subtree");
        Ok(doomed.len())
    }

    fn atomic<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let snapshot = self.tables.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::debug!(error = %e, "rolling back");
                self.tables = snapshot;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(parent: Option<NodeId>, slug: &str, url: &str) -> Node {
        let mut node = Node::new(parent, slug, "site.handlers.Page");
        node.url = url.to_string();
        node
    }

    /// `/`, `/a/`, `/a/b/`, `/c/` with ids 1..=4.
    fn populated() -> MemoryStore {
        let mut store = MemoryStore::new();
        let root = store.insert(&node(None, "", "/")).unwrap();
        let a = store.insert(&node(Some(root), "a", "/a/")).unwrap();
        store.insert(&node(Some(a), "b", "/a/b/")).unwrap();
        store.insert(&node(Some(root), "c", "/c/")).unwrap();
        store.reset_stats();
        store
    }

    fn urls(nodes: &[Node]) -> Vec<&str> {
        nodes.iter().map(|n| n.url.as_str()).collect()
    }

    #[test]
    fn test_insert_assigns_ids() {
        let store = populated();
        assert_eq!(store.len(), 4);
        assert_eq!(store.get(NodeId(1)).unwrap().url, "/");
        assert_eq!(store.get(NodeId(3)).unwrap().url, "/a/b/");
    }

    #[test]
    fn test_loaded_nodes_remember_persisted_url() {
        let store = populated();
        let node = store.get(NodeId(2)).unwrap();
        assert_eq!(node.persisted_url(), Some("/a/"));
    }

    #[test]
    fn test_insert_unknown_parent() {
        let mut store = MemoryStore::new();
        let err = store.insert(&node(Some(NodeId(9)), "a", "/a/")).unwrap_err();
        assert!(matches!(err, TreeError::UnknownNode(NodeId(9))));
    }

    #[test]
    fn test_unique_slug_per_parent() {
        let mut store = populated();
        let err = store
            .insert(&node(Some(NodeId(1)), "a", "/other/"))
            .unwrap_err();
        assert!(matches!(
            err,
            TreeError::Uniqueness(Constraint::ParentSlug { parent: NodeId(1), ref slug }) if slug == "a"
        ));
    }

    #[test]
    fn test_unique_url() {
        let mut store = populated();
        let err = store.insert(&node(None, "", "/")).unwrap_err();
        assert!(matches!(err, TreeError::Uniqueness(Constraint::Url(ref u)) if u == "/"));
    }

    #[test]
    fn test_descendants_pre_order() {
        let store = populated();
        let all = store.descendants(NodeId(1)).unwrap();
        assert_eq!(urls(&all), vec!["/a/", "/a/b/", "/c/"]);
        assert_eq!(store.stats().descendant_fetches, 1);
        assert_eq!(store.stats().reads, 1);
    }

    #[test]
    fn test_descendants_of_leaf() {
        let store = populated();
        assert!(store.descendants(NodeId(3)).unwrap().is_empty());
    }

    #[test]
    fn test_find_by_urls_single_lookup() {
        let store = populated();
        let candidates: Vec<String> = ["/", "/a/", "/x/", "/a/b/"].map(String::from).into();
        let mut found = urls(&store.find_by_urls(&candidates).unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        found.sort();
        assert_eq!(found, vec!["/", "/a/", "/a/b/"]);
        assert_eq!(store.stats().url_lookups, 1);
        assert_eq!(store.stats().reads, 1);
    }

    #[test]
    fn test_update_moves_between_child_lists() {
        let mut store = populated();
        let mut b = store.get(NodeId(3)).unwrap();
        b.parent = Some(NodeId(4));
        b.url = "/c/b/".into();
        store.update(&b).unwrap();

        assert!(store.descendants(NodeId(2)).unwrap().is_empty());
        assert_eq!(urls(&store.descendants(NodeId(4)).unwrap()), vec!["/c/b/"]);
        assert_eq!(store.find_by_urls(&["/a/b/".into()]).unwrap().len(), 0);
    }

    #[test]
    fn test_update_url_enforces_uniqueness() {
        let mut store = populated();
        let err = store.update_url(NodeId(3), "/c/").unwrap_err();
        assert!(matches!(err, TreeError::Uniqueness(Constraint::Url(_))));
        store.update_url(NodeId(3), "/a/z/").unwrap();
        assert_eq!(store.get(NodeId(3)).unwrap().url, "/a/z/");
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mut store = populated();
        assert_eq!(store.delete(NodeId(2)).unwrap(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(urls(&store.all().unwrap()), vec!["/", "/c/"]);
        assert!(matches!(store.get(NodeId(3)), Err(TreeError::UnknownNode(_))));
    }

    #[test]
    fn test_delete_removes_redirects_into_subtree() {
        let mut store = populated();
        let old = node(Some(NodeId(4)), "old", "/c/old/").with_redirect(NodeId(3), false);
        let old = store.insert(&old).unwrap();
        let below = store.insert(&node(Some(old), "below", "/c/old/below/")).unwrap();
        let unrelated = node(Some(NodeId(1)), "keep", "/keep/").with_redirect(NodeId(4), true);
        store.insert(&unrelated).unwrap();

        assert_eq!(store.delete(NodeId(2)).unwrap(), 4);
        assert!(matches!(store.get(old), Err(TreeError::UnknownNode(_))));
        assert!(matches!(store.get(below), Err(TreeError::UnknownNode(_))));
        assert_eq!(urls(&store.all().unwrap()), vec!["/", "/c/", "/keep/"]);
    }

    #[test]
    fn test_walk_stops_on_parent_cycle() {
        let mut store = populated();
        // Written directly, below the mutator's checks.
        let mut a = store.get(NodeId(2)).unwrap();
        a.parent = Some(NodeId(3));
        a.url = "/a/b/a/".into();
        store.update(&a).unwrap();

        let below = store.descendants(NodeId(2)).unwrap();
        assert_eq!(urls(&below), vec!["/a/b/"]);
    }

    #[test]
    fn test_atomic_rolls_back_on_error() {
        let mut store = populated();
        let result: Result<()> = store.atomic(|s| {
            s.update_url(NodeId(3), "/a/renamed/")?;
            s.update_url(NodeId(4), "/")?;
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(store.get(NodeId(3)).unwrap().url, "/a/b/");
        assert_eq!(store.get(NodeId(4)).unwrap().url, "/c/");
    }

    #[test]
    fn test_atomic_commits_on_success() {
        let mut store = populated();
        store
            .atomic(|s| s.update_url(NodeId(3), "/a/renamed/"))
            .unwrap();
        assert_eq!(store.get(NodeId(3)).unwrap().url, "/a/renamed/");
    }

    #[test]
    fn test_from_nodes_roundtrip() {
        let nodes = populated().into_nodes();
        assert_eq!(urls(&nodes), vec!["/", "/a/", "/a/b/", "/c/"]);

        let mut store = MemoryStore::from_nodes(nodes).unwrap();
        let id = store.insert(&node(Some(NodeId(1)), "d", "/d/")).unwrap();
        assert_eq!(id, NodeId(5));
    }

    #[test]
    fn test_from_nodes_requires_parent_first() {
        let mut nodes = populated().into_nodes();
        nodes.swap(1, 2);
        assert!(matches!(
            MemoryStore::from_nodes(nodes),
            Err(TreeError::UnknownNode(NodeId(2)))
        ));
    }

    #[test]
    fn test_from_nodes_rejects_duplicate_url() {
        let mut nodes = populated().into_nodes();
        nodes[3].url = "/a/".into();
        assert!(matches!(
            MemoryStore::from_nodes(nodes),
            Err(TreeError::Uniqueness(Constraint::Url(_)))
        ));
    }

    #[test]
    fn test_from_nodes_rejects_missing_redirect_target() {
        let mut nodes = populated().into_nodes();
        nodes[3] = nodes[3].clone().with_redirect(NodeId(9), false);
        assert!(matches!(
            MemoryStore::from_nodes(nodes),
            Err(TreeError::UnknownNode(NodeId(9)))
        ));
    }

    #[test]
    fn test_from_nodes_accepts_forward_redirect() {
        let mut nodes = populated().into_nodes();
        nodes[1] = nodes[1].clone().with_redirect(NodeId(4), true);
        assert!(MemoryStore::from_nodes(nodes).is_ok());
    }
}
