use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use flipqs_executor::CommandRunner;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::metrics::Metrics;
use crate::platform::{
    NativeStateQuery, Notifier, OverlayHost, Permission, PermissionProbe, SurfaceError,
};
use crate::reconciler::StateReconciler;
use crate::session::PanelSession;
use crate::state::StateReader;
use crate::toggle::{ToggleController, ToggleError, ToggleOutcome};
use crate::types::{Capability, PanelAction, PanelSnapshot, PanelToken};
use crate::ui::UiThread;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1500);
const DEFAULT_ACTION_BUFFER: usize = 16;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Overlay permission missing")]
    PermissionMissing,
    #[error(transparent)]
    SurfaceConstruction(#[from] SurfaceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Activated(PanelToken),
    AlreadyActive(PanelToken),
}

impl Activation {
    pub fn token(self) -> PanelToken {
        match self {
            Activation::Activated(token) | Activation::AlreadyActive(token) => token,
        }
    }
}

/// Lock-free view of whether a panel is up, shareable with components that
/// never see the surface.
#[derive(Clone, Default)]
pub struct PanelStatus {
    owner: Arc<AtomicU64>,
}

impl PanelStatus {
    pub fn is_active(&self) -> bool {
        self.owner.load(Ordering::Acquire) != 0
    }

    pub fn owner(&self) -> Option<PanelToken> {
        match self.owner.load(Ordering::Acquire) {
            0 => None,
            raw => Some(PanelToken(raw)),
        }
    }

    fn set(&self, token: PanelToken) {
        self.owner.store(token.0, Ordering::Release);
    }

    fn clear(&self) {
        self.owner.store(0, Ordering::Release);
    }
}

pub struct PanelDeps {
    pub runner: Arc<dyn CommandRunner>,
    pub native: Arc<dyn NativeStateQuery>,
    pub permissions: Arc<dyn PermissionProbe>,
    pub host: Arc<dyn OverlayHost>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone)]
pub struct PanelSettings {
    pub settle_delay: Duration,
    pub action_buffer: usize,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            action_buffer: DEFAULT_ACTION_BUFFER,
        }
    }
}

struct ActivePanel {
    session: Arc<PanelSession>,
    reconciler: Arc<StateReconciler>,
    controllers: HashMap<Capability, Arc<ToggleController>>,
    ui: UiThread,
    dispatcher: JoinHandle<()>,
}

/// Owns the one overlay the process may show.
///
/// `activate` and `deactivate` serialize on an async mutex, so racing
/// triggers can never build two surfaces.
pub struct PanelLifecycleManager {
    deps: PanelDeps,
    settings: PanelSettings,
    reader: Arc<StateReader>,
    status: PanelStatus,
    metrics: Arc<Metrics>,
    next_token: AtomicU64,
    active: Mutex<Option<ActivePanel>>,
    this: Weak<PanelLifecycleManager>,
}

impl PanelLifecycleManager {
    pub fn new(deps: PanelDeps, settings: PanelSettings) -> Arc<Self> {
        let reader = Arc::new(StateReader::new(
            Arc::clone(&deps.runner),
            Arc::clone(&deps.native),
            Arc::clone(&deps.permissions),
        ));

        Arc::new_cyclic(|this| Self {
            deps,
            settings,
            reader,
            status: PanelStatus::default(),
            metrics: Metrics::new(),
            next_token: AtomicU64::new(1),
            active: Mutex::new(None),
            this: this.clone(),
        })
    }

    pub fn status(&self) -> PanelStatus {
        self.status.clone()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn reader(&self) -> Arc<StateReader> {
        Arc::clone(&self.reader)
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn activate(&self) -> Result<Activation, PanelError> {
        let mut active = self.active.lock().await;
        if let Some(panel) = active.as_ref() {
            tracing::debug!("{} already running, not starting again", panel.session.token());
            self.metrics.inc_duplicate_activations();
            return Ok(Activation::AlreadyActive(panel.session.token()));
        }

        if !self.deps.permissions.is_granted(Permission::DrawOverlay) {
            tracing::error!("Overlay permission not granted, panel stays inactive");
            self.metrics.inc_activation_failures();
            self.deps
                .notifier
                .notify("Overlay permission missing! Grant via ADB.");
            return Err(PanelError::PermissionMissing);
        }

        let token = PanelToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (action_tx, action_rx) = mpsc::channel(self.settings.action_buffer.max(1));

        let surface = match self.deps.host.create_surface(action_tx) {
            Ok(surface) => surface,
            Err(e) => {
                tracing::error!("{} could not be built: {}", token, e);
                self.metrics.inc_activation_failures();
                self.deps.notifier.notify("Error creating overlay view");
                return Err(e.into());
            }
        };

        let ui = UiThread::spawn(surface, token);
        let session = Arc::new(PanelSession::new(token, ui.handle()));
        let reconciler = Arc::new(StateReconciler::new(
            Arc::clone(&self.reader),
            Arc::clone(&session),
            self.settings.settle_delay,
        ));

        let controllers: HashMap<Capability, Arc<ToggleController>> = Capability::ALL
            .into_iter()
            .map(|capability| {
                let controller = ToggleController::new(
                    capability,
                    Arc::clone(&self.deps.runner),
                    Arc::clone(&self.reader),
                    Arc::clone(&reconciler),
                    Arc::clone(&self.deps.notifier),
                    Arc::clone(&self.metrics),
                );
                (capability, Arc::new(controller))
            })
            .collect();

        let dispatcher = tokio::spawn(dispatch_actions(
            action_rx,
            controllers.clone(),
            self.this.clone(),
            token,
        ));

        reconciler.refresh_now().await;

        self.status.set(token);
        self.metrics.inc_activations();
        *active = Some(ActivePanel {
            session,
            reconciler,
            controllers,
            ui,
            dispatcher,
        });
        tracing::info!("{} active", token);
        Ok(Activation::Activated(token))
    }

    /// Returns `false` when there was nothing to tear down.
    pub async fn deactivate(&self) -> bool {
        let mut active = self.active.lock().await;
        let Some(panel) = active.take() else {
            tracing::debug!("No panel running, nothing to deactivate");
            return false;
        };
        self.teardown(panel).await;
        true
    }

    /// Deactivates only if `token` still owns the panel.
    async fn deactivate_owned(&self, token: PanelToken) -> bool {
        let mut active = self.active.lock().await;
        if active.as_ref().map(|panel| panel.session.token()) != Some(token) {
            return false;
        }
        let Some(panel) = active.take() else {
            return false;
        };
        self.teardown(panel).await;
        true
    }

    async fn teardown(&self, panel: ActivePanel) {
        let token = panel.session.token();
        self.status.clear();
        let cancelled = panel.session.close().await;
        panel.dispatcher.abort();
        panel.ui.shutdown().await;
        tracing::info!("{} deactivated ({} pending refresh(es) cancelled)", token, cancelled);
    }

    /// Toggles `capability` on the active panel. `None` when inactive.
    pub async fn toggle(
        &self,
        capability: Capability,
    ) -> Option<Result<ToggleOutcome, ToggleError>> {
        let controller = {
            let active = self.active.lock().await;
            active
                .as_ref()
                .and_then(|panel| panel.controllers.get(&capability).cloned())
        }?;
        Some(controller.toggle().await)
    }

    pub async fn refresh(&self) -> Option<PanelSnapshot> {
        let reconciler = {
            let active = self.active.lock().await;
            active.as_ref().map(|panel| Arc::clone(&panel.reconciler))
        }?;
        reconciler.refresh_now().await
    }

    /// Scheduled reconciliations that have not run yet.
    pub async fn pending_refreshes(&self) -> usize {
        let session = {
            let active = self.active.lock().await;
            active.as_ref().map(|panel| Arc::clone(&panel.session))
        };
        match session {
            Some(session) => session.tasks().live_count().await,
            None => 0,
        }
    }
}

async fn dispatch_actions(
    mut actions: mpsc::Receiver<PanelAction>,
    controllers: HashMap<Capability, Arc<ToggleController>>,
    manager: Weak<PanelLifecycleManager>,
    token: PanelToken,
) {
    while let Some(action) = actions.recv().await {
        match action {
            PanelAction::Toggle(capability) => {
                let Some(controller) = controllers.get(&capability).cloned() else {
                    continue;
                };
                tokio::spawn(async move {
                    match controller.toggle().await {
                        Ok(outcome) => {
                            tracing::debug!("{} toggle finished: {:?}", capability, outcome)
                        }
                        Err(e) => tracing::warn!("{} toggle refused: {}", capability, e),
                    }
                });
            }
            PanelAction::Dismiss => {
                tracing::debug!("{} dismissed from the overlay", token);
                if let Some(manager) = manager.upgrade() {
                    tokio::spawn(async move {
                        manager.deactivate_owned(token).await;
                    });
                }
                return;
            }
        }
    }
}
