//! Saving nodes and keeping cached urls in step with the tree.
//!
//! A save recomputes the node's url from its parent. When the url is what
//! the store already held, the save is a single write. When it changed, the
//! node's descendants are fetched once, in pre-order, and each gets its new
//! url through [`NodeStore::update_url`], which never cascades again. The
//! node write and the cascade share one transaction.

use crate::error::{Result, TreeError};
use crate::node::{Node, NodeId};
use crate::path::{self, ROOT_URL};
use crate::redirect;
use crate::store::{NodeReader, NodeStore};
use serde::Serialize;
use std::collections::HashMap;

/// The url `node` should have given its parent and slug.
///
/// Reads the parent once. Fails with [`TreeError::InvalidState`] when the
/// node breaks the root/slug rule or names itself as parent.
pub fn compute_url(nodes: &dyn NodeReader, node: &Node) -> Result<String> {
    match (node.parent, node.slug.is_empty()) {
        (None, true) => Ok(ROOT_URL.to_string()),
        (Some(parent_id), false) => {
            if node.id == Some(parent_id) {
                return Err(TreeError::InvalidState(format!(
                    "node {} cannot be its own parent",
                    parent_id
                )));
            }
            let parent = nodes.get(parent_id)?;
            Ok(node.url_under(Some(&parent.url)))
        }
        _ => Err(TreeError::InvalidState(
            "a node can be a root, or have a slug, not both".into(),
        )),
    }
}

/// Validate, persist and, if its url moved, cascade `node` to its subtree.
///
/// Whether the url moved is decided against the url the store holds, not
/// the one `node` was loaded with, so a stale or deserialized node still
/// cascades correctly. On success `node` carries its id and new url. On
/// failure neither `node` nor the store is changed.
pub fn save<S: NodeStore>(store: &mut S, node: &mut Node) -> Result<()> {
    redirect::validate(node)?;
    path::validate_slug(&node.slug)?;
    if let Some(redirect) = &node.redirect {
        store.get(redirect.target)?;
    }

    let mut staged = node.clone();
    staged.url = compute_url(&*store, node)?;

    let id = store.atomic(|s| match staged.id {
        None => s.insert(&staged),
        Some(id) => {
            let stored = s.get(id)?.url;
            if stored == staged.url {
                s.update(&staged)?;
                return Ok(id);
            }
            // Fetched before the write: once a cycle is stored there is no
            // subtree left to walk.
            let descendants = s.descendants(id)?;
            if let Some(parent) = staged.parent
                && descendants.iter().any(|d| d.id == Some(parent))
            {
                return Err(TreeError::InvalidState(format!(
                    "cannot move {} beneath its own descendant {}",
                    stored, parent
                )));
            }
            s.update(&staged)?;
            cascade(s, id, &staged.url, &descendants)?;
            Ok(id)
        }
    })?;

    staged.id = Some(id);
    staged.mark_persisted();
    *node = staged;
    Ok(())
}

/// Rewrite the url of every node in `descendants` (the pre-ordered subtree
/// below `id`, whose own url is now `url`).
///
/// Returns the number of descendants written.
fn cascade<S: NodeStore>(
    store: &mut S,
    id: NodeId,
    url: &str,
    descendants: &[Node],
) -> Result<usize> {
    let mut cached: HashMap<NodeId, String> = HashMap::from([(id, url.to_string())]);

    for descendant in descendants {
        let descendant_id = descendant.id_or_err()?;
        let parent_url = descendant
            .parent
            .and_then(|parent| cached.get(&parent))
            .ok_or_else(|| {
                TreeError::InvalidState(format!(
                    "descendant {} was listed before its parent",
                    descendant_id
                ))
            })?;
        let new_url = path::join_path(parent_url, &descendant.slug);
        store.update_url(descendant_id, &new_url)?;
        cached.insert(descendant_id, new_url);
    }

    if !descendants.is_empty() {
        tracing::info!(%id, %url, count = descendants.len(), "cascaded url change");
    }
    Ok(descendants.len())
}

/// A node whose stored state disagrees with the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    pub id: NodeId,
    pub url: String,
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    RootWithSlug,
    ChildWithoutSlug,
    StaleUrl { expected: String },
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.problem {
            Problem::RootWithSlug => write!(f, "{} ({}): root node has a slug", self.id, self.url),
            Problem::ChildWithoutSlug => {
                write!(f, "{} ({}): non-root node has no slug", self.id, self.url)
            }
            Problem::StaleUrl { expected } => {
                write!(f, "{}: cached url {} should be {}", self.id, self.url, expected)
            }
        }
    }
}

/// Check every node's cached url against its parent/slug chain.
pub fn verify(nodes: &dyn NodeReader) -> Result<Vec<Inconsistency>> {
    let mut expected: HashMap<NodeId, String> = HashMap::new();
    let mut problems = Vec::new();

    for node in nodes.all()? {
        let id = node.id_or_err()?;
        let report = |problem| Inconsistency {
            id,
            url: node.url.clone(),
            problem,
        };
        match (node.parent, node.slug.is_empty()) {
            (None, false) => problems.push(report(Problem::RootWithSlug)),
            (Some(_), true) => problems.push(report(Problem::ChildWithoutSlug)),
            _ => {}
        }

        let parent_url = node.parent.and_then(|p| expected.get(&p)).map(String::as_str);
        let want = node.url_under(parent_url);
        if node.url != want {
            problems.push(report(Problem::StaleUrl {
                expected: want.clone(),
            }));
        }
        expected.insert(id, want);
    }
    Ok(problems)
}
