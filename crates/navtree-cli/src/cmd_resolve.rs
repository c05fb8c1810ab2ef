use anyhow::{Context, Result};
use navtree::v1::Node;
use serde::Serialize;
use std::path::Path;

use crate::tree_file;

#[derive(Debug, Serialize)]
struct Resolved {
    node: Node,
    remainder: String,
    exact: bool,
}

pub fn run(path: &Path, request_path: &str, pretty: bool) -> Result<()> {
    let tree = tree_file::load(path)?;
    let resolution = tree
        .resolve(request_path)
        .with_context(|| format!("no node serves {:?}", request_path))?;
    let exact = resolution.is_exact();
    let out = Resolved {
        node: resolution.node,
        remainder: resolution.remainder,
        exact,
    };
    println!("{}", tree_file::to_json(&out, pretty)?);
    Ok(())
}
