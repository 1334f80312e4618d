use anyhow::Result;
use flipqs_core::{Permission, PermissionProbe};

use crate::bootstrap::Runtime;

pub async fn run(runtime: &Runtime) -> Result<()> {
    println!("Flip-QS environment check\n");

    let mut healthy = true;

    print!("Root shell ({})... ", runtime.config.shell);
    if runtime.executor.preflight().await {
        println!("✓");
    } else {
        println!("✗");
        healthy = false;
    }

    print!("Overlay permission... ");
    if runtime.permissions.is_granted(Permission::DrawOverlay) {
        println!("✓");
    } else {
        println!("✗");
        println!("  Grant it via ADB shell:");
        println!("  {}", grant_hint(&runtime.config.package));
        healthy = false;
    }

    print!("Bluetooth permission... ");
    if runtime.permissions.is_granted(Permission::ShortRangeRadio) {
        println!("✓");
    } else {
        // Only the Bluetooth tile is affected
        println!("✗ (Bluetooth toggle disabled)");
    }

    println!();
    if healthy {
        println!("All checks passed");
        Ok(())
    } else {
        anyhow::bail!("Environment check failed");
    }
}

pub fn grant_hint(package: &str) -> String {
    format!(
        "adb shell pm grant {} android.permission.SYSTEM_ALERT_WINDOW",
        package
    )
}
