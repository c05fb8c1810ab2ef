use anyhow::{Context, Result};
use navtree::v1::{HandlerRegistry, Settings, check};
use std::path::Path;

/// Report allowed handlers that do not resolve. Problems are printed, never
/// fatal.
pub fn run(config: &Path) -> Result<()> {
    let json = std::fs::read_to_string(config)
        .with_context(|| format!("failed to read settings: {}", config.display()))?;
    let settings = Settings::from_json(&json)
        .with_context(|| format!("failed to parse settings: {}", config.display()))?;

    let messages = check(&settings, &HandlerRegistry::builtin());
    if messages.is_empty() {
        println!(
            "System check identified no issues ({} handler(s) allowed).",
            settings.allowed_handlers.len()
        );
    }
    for message in &messages {
        println!("{}: {}", message.id, message.msg);
    }
    Ok(())
}
