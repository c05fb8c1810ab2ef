use anyhow::{Context, Result};
use navtree::v1::{HandlerRegistry, MemoryStore, Node, RouteTree};
use serde::{Deserialize, Serialize};
use std::path::Path;

const FORMAT_VERSION: u32 = 1;

/// On-disk form of a tree: nodes listed parents-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TreeFile {
    version: u32,
    nodes: Vec<Node>,
}

/// Load a tree file into an in-memory tree with the built-in handlers.
pub fn load(path: &Path) -> Result<RouteTree> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file: {}", path.display()))?;
    let file: TreeFile = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse tree file: {}", path.display()))?;
    if file.version != FORMAT_VERSION {
        anyhow::bail!(
            "unsupported tree file version {} in {}",
            file.version,
            path.display()
        );
    }
    let store = MemoryStore::from_nodes(file.nodes)
        .with_context(|| format!("corrupt tree file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), nodes = store.len(), "loaded tree");
    Ok(RouteTree::new(store, HandlerRegistry::builtin()))
}

/// Write `tree` to `path` atomically.
pub fn save(path: &Path, tree: &RouteTree) -> Result<()> {
    let file = TreeFile {
        version: FORMAT_VERSION,
        nodes: tree.nodes().context("failed to read nodes")?,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)
        .context("failed to create temp file for atomic write")?;
    serde_json::to_writer_pretty(&tmp, &file).context("failed to serialize tree")?;
    tmp.persist(path)
        .with_context(|| format!("failed to persist tree file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), nodes = file.nodes.len(), "saved tree");
    Ok(())
}

/// Serialize a value as JSON, pretty or compact.
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("failed to serialize output")
}
