//! Longest-prefix resolution of request paths.

use crate::error::{Result, TreeError};
use crate::node::Node;
use crate::path;
use crate::store::NodeReader;
use serde::Serialize;

/// The deepest node whose url prefixes `request_path`.
///
/// Every `/`-bounded prefix of the path is looked up in a single store
/// round-trip and the longest stored url wins. A request below a missing
/// node falls back to its nearest existing ancestor; only an empty match
/// (no root, nothing else) is [`TreeError::NotFound`].
pub fn best_match(nodes: &dyn NodeReader, request_path: &str) -> Result<Node> {
    let candidates = path::split_path(request_path);
    let node = nodes
        .find_by_urls(&candidates)?
        .into_iter()
        .max_by_key(|node| node.url.len())
        .ok_or_else(|| TreeError::NotFound(request_path.to_string()))?;
    tracing::debug!(path = request_path, url = %node.url, "best match");
    Ok(node)
}

/// A matched node and the part of the request left for its handler.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub node: Node,
    /// Node-relative remainder, always starting with `/`.
    pub remainder: String,
}

impl Resolution {
    /// True when the request named the node itself rather than a path below it.
    pub fn is_exact(&self) -> bool {
        self.remainder == path::ROOT_URL
    }
}

/// [`best_match`] plus the node-relative remainder of the path.
pub fn resolve(nodes: &dyn NodeReader, request_path: &str) -> Result<Resolution> {
    let node = best_match(nodes, request_path)?;
    let remainder = path::node_relative(&node.url, request_path)
        .ok_or_else(|| TreeError::NotFound(request_path.to_string()))?;
    Ok(Resolution { node, remainder })
}
