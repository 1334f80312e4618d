use anyhow::{Context, Result};
use flipqs_core::Capability;
use serde_json::json;
use std::time::Duration;

use crate::bootstrap::Runtime;

// Room for the delayed reconciliation to land before teardown
const SETTLE_MARGIN: Duration = Duration::from_millis(250);

/// Opens the panel, flips one capability, waits out the settle delay and
/// closes again.
pub async fn run(runtime: &Runtime, capability: Capability) -> Result<()> {
    let manager = &runtime.manager;
    manager
        .activate()
        .await
        .context("Failed to display overlay panel")?;

    let result = manager
        .toggle(capability)
        .await
        .context("Panel closed before the toggle ran")?;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            manager.deactivate().await;
            return Err(e).with_context(|| format!("Could not toggle {}", capability));
        }
    };

    if manager.pending_refreshes().await > 0 {
        tokio::time::sleep(runtime.config.settle_delay() + SETTLE_MARGIN).await;
    }
    manager.deactivate().await;

    let report = json!({
        "capability": capability,
        "transition": outcome.requested_transition,
        "accepted": outcome.accepted,
        "execution": format!("{:?}", outcome.execution),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !outcome.accepted {
        anyhow::bail!("Failed to toggle {}", capability);
    }
    Ok(())
}
