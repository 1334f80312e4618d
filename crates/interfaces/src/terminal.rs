//! Terminal stand-ins for the overlay and notices. Panel state goes to stdout
//! as JSON lines; taps and trigger events come back on stdin.

use std::io::Write;
use std::sync::Arc;

use flipqs_core::{
    Capability, Notifier, OverlayHost, OverlaySurface, PanelAction, SurfaceError, ToggleState,
    TriggerEvent, UnknownCapability,
};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;
type ActionSlot = Arc<Mutex<Option<mpsc::Sender<PanelAction>>>>;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum PanelLine<'a> {
    Opened,
    State(&'a ToggleState),
    Closed,
}

fn emit(output: &SharedWriter, line: &PanelLine<'_>) {
    let json = match serde_json::to_string(line) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to encode panel line: {}", e);
            return;
        }
    };
    let mut out = output.lock();
    if let Err(e) = writeln!(out, "{}", json).and_then(|_| out.flush()) {
        tracing::warn!("Failed to write panel line: {}", e);
    }
}

pub struct TerminalOverlayHost {
    output: SharedWriter,
    actions: ActionSlot,
}

impl TerminalOverlayHost {
    pub fn new() -> Self {
        Self::with_writer(std::io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            output: Arc::new(Mutex::new(Box::new(writer))),
            actions: Arc::new(Mutex::new(None)),
        }
    }

    pub fn has_surface(&self) -> bool {
        self.actions.lock().is_some()
    }

    /// Routes a user action into the open surface. `false` if none is open.
    pub async fn dispatch(&self, action: PanelAction) -> bool {
        let tx = self.actions.lock().clone();
        match tx {
            Some(tx) => tx.send(action).await.is_ok(),
            None => {
                tracing::debug!("No panel open, ignoring {:?}", action);
                false
            }
        }
    }
}

impl Default for TerminalOverlayHost {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayHost for TerminalOverlayHost {
    fn create_surface(
        &self,
        actions: mpsc::Sender<PanelAction>,
    ) -> Result<Box<dyn OverlaySurface>, SurfaceError> {
        let mut slot = self.actions.lock();
        if slot.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(SurfaceError::Construction(
                "terminal already shows a panel".to_string(),
            ));
        }
        *slot = Some(actions);
        drop(slot);

        emit(&self.output, &PanelLine::Opened);
        Ok(Box::new(TerminalSurface {
            output: Arc::clone(&self.output),
            actions: Arc::clone(&self.actions),
            closed: false,
        }))
    }
}

struct TerminalSurface {
    output: SharedWriter,
    actions: ActionSlot,
    closed: bool,
}

impl OverlaySurface for TerminalSurface {
    fn render(&mut self, state: &ToggleState) {
        if !self.closed {
            emit(&self.output, &PanelLine::State(state));
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.actions.lock().take();
        emit(&self.output, &PanelLine::Closed);
    }
}

/// Notices go to the log and, briefly, to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "flipqs::notice", "{}", message);
        eprintln!("[notice] {}", message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    Trigger(TriggerEvent),
    Action(PanelAction),
    Quit,
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Empty input")]
    Empty,
    #[error("Invalid trigger event: {0}")]
    Event(#[from] serde_json::Error),
    #[error(transparent)]
    Capability(#[from] UnknownCapability),
    #[error("Unknown command: {0}")]
    Unknown(String),
}

/// One stdin line: a JSON trigger event, `tap <capability>`, `dismiss` or `quit`.
pub fn parse_input(line: &str) -> Result<InputLine, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(InputError::Empty);
    }
    if line.starts_with('{') {
        return Ok(InputLine::Trigger(serde_json::from_str(line)?));
    }

    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("tap"), Some(name)) => {
            let capability: Capability = name.parse()?;
            Ok(InputLine::Action(PanelAction::Toggle(capability)))
        }
        (Some("dismiss"), None) => Ok(InputLine::Action(PanelAction::Dismiss)),
        (Some("quit" | "exit"), None) => Ok(InputLine::Quit),
        _ => Err(InputError::Unknown(line.to_string())),
    }
}

/// Line reader over stdin.
pub struct TerminalInput {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// `None` on EOF or a read error.
    pub async fn next_line(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("stdin read failed: {}", e);
                None
            }
        }
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}
