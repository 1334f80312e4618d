use anyhow::Result;
use flipqs_interfaces::{parse_input, InputError, InputLine, TerminalInput};

use crate::bootstrap::Runtime;

/// Serves the panel until stdin closes, `quit` arrives or Ctrl-C.
pub async fn run(runtime: &Runtime) -> Result<()> {
    // Surfaces the root prompt early; the outcome is only logged
    let executor = runtime.executor.clone();
    tokio::spawn(async move {
        let granted = executor.preflight().await;
        tracing::info!("Initial root check finished, success: {}", granted);
    });

    let (sender, consumer) = runtime
        .trigger_watcher()
        .spawn(runtime.config.event_buffer);
    let mut input = TerminalInput::new();
    tracing::info!(
        "Watching for '{}' (JSON events, 'tap <capability>', 'dismiss', 'quit' on stdin)",
        runtime.config.trigger_source
    );

    loop {
        let line = tokio::select! {
            line = input.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        match parse_input(&line) {
            Ok(InputLine::Trigger(event)) => {
                if !sender.offer(event) {
                    tracing::warn!("Trigger event dropped");
                }
            }
            Ok(InputLine::Action(action)) => {
                if !runtime.host.dispatch(action).await {
                    eprintln!("No panel open");
                }
            }
            Ok(InputLine::Quit) => break,
            Err(InputError::Empty) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    drop(sender);
    if let Err(e) = consumer.await {
        tracing::error!("Trigger consumer ended abnormally: {}", e);
    }
    runtime.manager.deactivate().await;

    let metrics = runtime.manager.metrics().snapshot();
    tracing::info!(
        "Shutting down: {} activation(s), {} toggle(s), {:.0}% accepted",
        metrics.activations,
        metrics.toggles,
        metrics.toggle_success_rate() * 100.0
    );
    Ok(())
}
