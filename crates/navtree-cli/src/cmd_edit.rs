use anyhow::{Context, Result};
use navtree::v1::{Node, NodeId, RouteTree};
use std::path::Path;

use crate::tree_file;

/// What kind of node `add` creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewNode {
    /// A node served by the handler at this dotted path.
    Handler(String),
    /// A redirect to the node currently at `target`.
    Redirect { target: String, permanent: bool },
}

fn node_id(tree: &RouteTree, url: &str) -> Result<NodeId> {
    let node = tree
        .get_by_url(url)
        .with_context(|| format!("no node at {:?}", url))?;
    node.id
        .ok_or_else(|| anyhow::anyhow!("node at {:?} has no id", url))
}

fn print_node(node: &Node, pretty: bool) -> Result<()> {
    println!("{}", tree_file::to_json(node, pretty)?);
    Ok(())
}

pub fn run_init(path: &Path, handler: String, force: bool, pretty: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    let mut tree = RouteTree::in_memory();
    let root = tree.create_root(handler).context("failed to create root")?;
    tree_file::save(path, &tree)?;
    print_node(&root, pretty)
}

pub fn run_add(path: &Path, parent: &str, slug: String, kind: NewNode, pretty: bool) -> Result<()> {
    let mut tree = tree_file::load(path)?;
    let parent_id = node_id(&tree, parent)?;
    let node = match kind {
        NewNode::Handler(handler) => tree.create_child(parent_id, slug, handler),
        NewNode::Redirect { target, permanent } => {
            let target_id = node_id(&tree, &target)?;
            tree.create_redirect(parent_id, slug, target_id, permanent)
        }
    }
    .context("failed to add node")?;
    tree_file::save(path, &tree)?;
    print_node(&node, pretty)
}

pub fn run_rename(path: &Path, url: &str, slug: String, pretty: bool) -> Result<()> {
    let mut tree = tree_file::load(path)?;
    let id = node_id(&tree, url)?;
    let node = tree.rename(id, slug).context("failed to rename node")?;
    tree_file::save(path, &tree)?;
    print_node(&node, pretty)
}

pub fn run_move(path: &Path, url: &str, to: &str, pretty: bool) -> Result<()> {
    let mut tree = tree_file::load(path)?;
    let id = node_id(&tree, url)?;
    let parent = node_id(&tree, to)?;
    let node = tree.move_to(id, parent).context("failed to move node")?;
    tree_file::save(path, &tree)?;
    print_node(&node, pretty)
}

pub fn run_remove(path: &Path, url: &str) -> Result<()> {
    let mut tree = tree_file::load(path)?;
    let id = node_id(&tree, url)?;
    let removed = tree.delete(id).context("failed to remove node")?;
    tree_file::save(path, &tree)?;
    eprintln!("Removed {} node(s) at {}", removed, url);
    Ok(())
}
