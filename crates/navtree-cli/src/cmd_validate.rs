use anyhow::Result;
use std::path::Path;

use crate::tree_file;

pub fn run(path: &Path) -> Result<()> {
    let tree = tree_file::load(path)?;
    let problems = tree.verify()?;
    if problems.is_empty() {
        println!("Valid: {} nodes", tree.store().len());
        return Ok(());
    }
    for problem in &problems {
        eprintln!("  {}", problem);
    }
    anyhow::bail!("{} inconsistent node(s) in {}", problems.len(), path.display())
}
