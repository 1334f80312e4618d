use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::session::PanelSession;
use crate::state::StateReader;
use crate::types::PanelSnapshot;

/// Re-reads every capability and republishes the result, overriding any
/// optimistic state the UI is showing.
pub struct StateReconciler {
    reader: Arc<StateReader>,
    session: Arc<PanelSession>,
    settle_delay: Duration,
    seq: AtomicU64,
}

impl StateReconciler {
    pub fn new(
        reader: Arc<StateReader>,
        session: Arc<PanelSession>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            reader,
            session,
            settle_delay,
            seq: AtomicU64::new(0),
        }
    }

    pub fn session(&self) -> &Arc<PanelSession> {
        &self.session
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// `None` when there is no live surface to update.
    pub async fn refresh_now(&self) -> Option<PanelSnapshot> {
        if !self.session.is_live() {
            tracing::debug!("{} closed, skipping refresh", self.session.token());
            return None;
        }

        let snapshot = self.reader.snapshot().await;

        if !self.session.is_live() || !self.session.ui().render_snapshot(snapshot.clone()) {
            tracing::debug!("{} closed during refresh, result dropped", self.session.token());
            return None;
        }

        tracing::debug!("{} refreshed: {:?}", self.session.token(), snapshot.states);
        Some(snapshot)
    }

    /// Schedules a refresh in the session's task group. Returns `false` if the
    /// session no longer accepts work.
    pub async fn schedule_refresh(self: &Arc<Self>, after: Duration) -> bool {
        if !self.session.is_live() {
            return false;
        }

        let tasks = self.session.tasks();
        tasks.cleanup_completed().await;

        let id = format!("reconcile-{}", self.seq.fetch_add(1, Ordering::Relaxed));
        let this = Arc::clone(self);
        match tasks
            .spawn_after(id, "Delayed state reconciliation", after, async move {
                this.refresh_now().await;
            })
            .await
        {
            Ok(id) => {
                tracing::debug!("{} scheduled {} in {:?}", self.session.token(), id, after);
                true
            }
            Err(e) => {
                tracing::debug!("Refresh not scheduled: {}", e);
                false
            }
        }
    }

    pub async fn schedule_settled_refresh(self: &Arc<Self>) -> bool {
        self.schedule_refresh(self.settle_delay).await
    }
}
