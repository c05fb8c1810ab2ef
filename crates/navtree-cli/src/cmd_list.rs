use anyhow::Result;
use navtree::v1::Node;
use std::path::Path;

use crate::tree_file;

/// One line per node, indented by depth.
fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        let indent = "  ".repeat(node.depth());
        let target = match &node.redirect {
            Some(r) if r.permanent => format!(" -> {} (301)", r.target),
            Some(r) => format!(" -> {} (302)", r.target),
            None => String::new(),
        };
        let id = node.id.map(|id| id.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{}{}  {} {}{}\n",
            indent, node.url, id, node.handler, target
        ));
    }
    out
}

pub fn run(path: &Path, json: bool) -> Result<()> {
    let tree = tree_file::load(path)?;
    let nodes = tree.nodes()?;
    if json {
        println!("{}", tree_file::to_json(&nodes, true)?);
    } else {
        print!("{}", render(&nodes));
    }
    Ok(())
}
