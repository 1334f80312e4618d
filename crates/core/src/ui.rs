//! The UI task. It is the only owner of the overlay surface; everything else
//! posts render requests through a [`UiHandle`].

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::platform::OverlaySurface;
use crate::types::{PanelSnapshot, PanelToken, ToggleState};

enum UiCommand {
    Render(ToggleState),
    RenderSnapshot(PanelSnapshot),
    Close(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiCommand>,
}

impl UiHandle {
    /// Returns `false` when the surface is already gone.
    pub fn render(&self, state: ToggleState) -> bool {
        self.tx.send(UiCommand::Render(state)).is_ok()
    }

    pub fn render_snapshot(&self, snapshot: PanelSnapshot) -> bool {
        self.tx.send(UiCommand::RenderSnapshot(snapshot)).is_ok()
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

pub struct UiThread {
    handle: UiHandle,
    join: JoinHandle<()>,
}

impl UiThread {
    pub fn spawn(mut surface: Box<dyn OverlaySurface>, token: PanelToken) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let join = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    UiCommand::Render(state) => surface.render(&state),
                    UiCommand::RenderSnapshot(snapshot) => {
                        for state in &snapshot.states {
                            surface.render(state);
                        }
                    }
                    UiCommand::Close(done) => {
                        surface.close();
                        let _ = done.send(());
                        tracing::debug!("{} surface closed", token);
                        return;
                    }
                }
            }
            // Every handle dropped without an explicit close
            surface.close();
        });

        Self {
            handle: UiHandle { tx },
            join,
        }
    }

    pub fn handle(&self) -> UiHandle {
        self.handle.clone()
    }

    /// Closes the surface on the UI task and waits for it to finish.
    pub async fn shutdown(self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.handle.tx.send(UiCommand::Close(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        if let Err(e) = self.join.await {
            tracing::error!("UI task ended abnormally: {}", e);
        }
    }
}
