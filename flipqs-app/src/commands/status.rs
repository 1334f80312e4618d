use anyhow::{Context, Result};

use crate::bootstrap::Runtime;

/// Prints one fresh snapshot of every capability as JSON.
pub async fn run(runtime: &Runtime) -> Result<()> {
    let snapshot = runtime.manager.reader().snapshot().await;
    let json = serde_json::to_string_pretty(&snapshot).context("Failed to encode snapshot")?;
    println!("{}", json);
    Ok(())
}
