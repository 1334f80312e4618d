use std::sync::Arc;

use async_trait::async_trait;
use flipqs_executor::{CommandRequest, CommandRunner};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::{Activation, PanelError, PanelLifecycleManager};
use crate::metrics::Metrics;
use crate::platform::Notifier;
use crate::types::{TriggerEvent, TriggerKind};

/// Resource id of the system notification shade.
pub const NOTIFICATION_PANEL_ID: &str = "com.android.systemui:id/notification_panel";

/// Collapses the native status bar panel.
pub const COLLAPSE_COMMAND: &str = "service call statusbar 2";

pub const DEFAULT_EVENT_BUFFER: usize = 32;

#[async_trait]
pub trait PanelActivator: Send + Sync {
    async fn activate_panel(&self) -> Result<Activation, PanelError>;
}

#[async_trait]
impl PanelActivator for PanelLifecycleManager {
    async fn activate_panel(&self) -> Result<Activation, PanelError> {
        self.activate().await
    }
}

/// Producer side handed to the platform event callback. Never blocks.
#[derive(Clone)]
pub struct TriggerSender {
    tx: mpsc::Sender<TriggerEvent>,
}

impl TriggerSender {
    /// Returns `false` if the event was dropped.
    pub fn offer(&self, event: TriggerEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::debug!(
                    "Trigger queue full, dropping event from {}",
                    event.source_identifier
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

pub struct TriggerWatcher {
    source_identifier: String,
    runner: Arc<dyn CommandRunner>,
    activator: Arc<dyn PanelActivator>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,
}

impl TriggerWatcher {
    pub fn new(
        source_identifier: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        activator: Arc<dyn PanelActivator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source_identifier: source_identifier.into(),
            runner,
            activator,
            notifier,
            metrics: Metrics::new(),
        }
    }

    /// Shares counters with the lifecycle manager instead of keeping its own.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn matches(&self, event: &TriggerEvent) -> bool {
        event.kind == TriggerKind::WindowStateChanged
            && event.source_identifier == self.source_identifier
    }

    /// `None` for events that are not the shade being pulled down.
    pub async fn handle(&self, event: &TriggerEvent) -> Option<Result<Activation, PanelError>> {
        if !self.matches(event) {
            self.metrics.inc_triggers_ignored();
            return None;
        }
        self.metrics.inc_triggers_matched();
        tracing::info!("Notification panel state change detected: {}", event.source_identifier);

        // Best effort; activation goes ahead either way
        let collapse = self
            .runner
            .execute(&CommandRequest::new(COLLAPSE_COMMAND))
            .await;
        tracing::debug!("Collapse command finished: {:?}", collapse.outcome());

        let result = self.activator.activate_panel().await;
        match &result {
            Ok(activation) => tracing::debug!("Trigger handled: {:?}", activation),
            Err(PanelError::PermissionMissing) => {
                tracing::error!("Cannot show panel: overlay permission missing");
            }
            Err(e) => {
                tracing::error!("Failed to display overlay panel: {}", e);
                self.notifier.notify("Failed to display overlay panel.");
            }
        }
        Some(result)
    }

    /// Starts the consumer task. It ends once every sender is dropped.
    pub fn spawn(self, buffer: usize) -> (TriggerSender, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<TriggerEvent>(buffer.max(1));
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle(&event).await;
            }
            tracing::debug!("Trigger stream closed");
        });
        (TriggerSender { tx }, handle)
    }
}
