use flipqs_tasks::TaskGroup;
use tokio_util::sync::CancellationToken;

use crate::types::PanelToken;
use crate::ui::UiHandle;

/// Everything that belongs to one activation of the panel. Closing the
/// session cancels its scheduled work; late results check [`is_live`] and
/// drop themselves.
///
/// [`is_live`]: PanelSession::is_live
pub struct PanelSession {
    token: PanelToken,
    ui: UiHandle,
    cancel: CancellationToken,
    tasks: TaskGroup,
}

impl PanelSession {
    pub fn new(token: PanelToken, ui: UiHandle) -> Self {
        Self {
            token,
            ui,
            cancel: CancellationToken::new(),
            tasks: TaskGroup::new(token.to_string()),
        }
    }

    pub fn token(&self) -> PanelToken {
        self.token
    }

    pub fn ui(&self) -> &UiHandle {
        &self.ui
    }

    pub fn tasks(&self) -> &TaskGroup {
        &self.tasks
    }

    pub fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && self.ui.is_open()
    }

    /// Resolves once the session has been closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await
    }

    /// Returns how many scheduled tasks were cancelled.
    pub async fn close(&self) -> usize {
        self.cancel.cancel();
        self.tasks.cancel_all().await
    }
}
