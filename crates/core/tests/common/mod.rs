//! Scripted collaborators shared by the panel integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use flipqs_core::*;
use flipqs_executor::{CommandRequest, CommandResult, CommandRunner};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration, Instant};

/// What the fake device currently reports.
pub struct Device {
    pub wifi: bool,
    pub bluetooth: bool,
    pub mobile_data: String,
    pub location_mode: String,
    /// Native Wi-Fi reads keep the old value after `svc wifi`.
    pub wifi_lags: bool,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            wifi: false,
            bluetooth: false,
            mobile_data: "0".to_string(),
            location_mode: "0".to_string(),
            wifi_lags: false,
        }
    }
}

fn ok(stdout: &str) -> CommandResult {
    CommandResult {
        exit_code: 0,
        stdout: stdout.lines().map(str::to_string).collect(),
        stderr: Vec::new(),
        timed_out: false,
    }
}

fn failed() -> CommandResult {
    CommandResult {
        exit_code: 1,
        stdout: Vec::new(),
        stderr: vec!["Permission denial".to_string()],
        timed_out: false,
    }
}

#[derive(Default)]
pub struct FakeRunner {
    pub device: Arc<Mutex<Device>>,
    log: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeRunner {
    pub fn new(device: Arc<Mutex<Device>>) -> Arc<Self> {
        Arc::new(Self {
            device,
            ..Self::default()
        })
    }

    pub fn fail(&self, command: &str) {
        self.failing.lock().insert(command.to_string());
    }

    pub fn delay(&self, command: &str, delay: Duration) {
        self.delays.lock().insert(command.to_string(), delay);
    }

    pub fn commands(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.log.lock().iter().filter(|c| *c == command).count()
    }

    /// Commands that change device state, in issue order.
    pub fn mutations(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter(|c| c.starts_with("svc ") || c.starts_with("settings put"))
            .cloned()
            .collect()
    }

    fn apply(&self, command: &str) -> CommandResult {
        if self.failing.lock().contains(command) {
            return failed();
        }

        let mut device = self.device.lock();
        match command {
            "settings get global mobile_data" => ok(&device.mobile_data),
            "settings get secure location_mode" => ok(&device.location_mode),
            "svc data enable" => {
                device.mobile_data = "1".to_string();
                ok("")
            }
            "svc data disable" => {
                device.mobile_data = "0".to_string();
                ok("")
            }
            "svc wifi enable" | "svc wifi disable" => {
                if !device.wifi_lags {
                    device.wifi = command.ends_with("enable");
                }
                ok("")
            }
            "svc bluetooth enable" | "svc bluetooth disable" => {
                device.bluetooth = command.ends_with("enable");
                ok("")
            }
            other => {
                if let Some(mode) = other.strip_prefix("settings put secure location_mode ") {
                    device.location_mode = mode.to_string();
                }
                ok("")
            }
        }
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn execute(&self, request: &CommandRequest) -> CommandResult {
        let command = request.command().to_string();
        self.log.lock().push(command.clone());

        let delay = self.delays.lock().get(&command).copied();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        self.apply(&command)
    }
}

pub struct FakeNative {
    device: Arc<Mutex<Device>>,
    unavailable: Mutex<HashSet<Capability>>,
}

impl FakeNative {
    pub fn new(device: Arc<Mutex<Device>>) -> Arc<Self> {
        Arc::new(Self {
            device,
            unavailable: Mutex::new(HashSet::new()),
        })
    }

    pub fn make_unavailable(&self, capability: Capability) {
        self.unavailable.lock().insert(capability);
    }
}

#[async_trait]
impl NativeStateQuery for FakeNative {
    async fn is_enabled(&self, capability: Capability) -> Result<bool, QueryError> {
        if self.unavailable.lock().contains(&capability) {
            return Err(QueryError::Unavailable(capability));
        }
        let device = self.device.lock();
        match capability {
            Capability::NetworkRadio => Ok(device.wifi),
            Capability::ShortRangeRadio => Ok(device.bluetooth),
            other => Err(QueryError::Failed(other, "not a native capability".to_string())),
        }
    }
}

pub struct FakePermissions {
    pub overlay: AtomicBool,
    pub short_range_radio: AtomicBool,
}

impl FakePermissions {
    pub fn granted() -> Arc<Self> {
        Arc::new(Self {
            overlay: AtomicBool::new(true),
            short_range_radio: AtomicBool::new(true),
        })
    }
}

impl PermissionProbe for FakePermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        match permission {
            Permission::DrawOverlay => self.overlay.load(Ordering::SeqCst),
            Permission::ShortRangeRadio => self.short_range_radio.load(Ordering::SeqCst),
        }
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub created: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub renders: Arc<Mutex<Vec<ToggleState>>>,
    pub fail: AtomicBool,
    actions: Mutex<Option<mpsc::Sender<PanelAction>>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    /// Most recent rendered value for `capability`.
    pub fn shown(&self, capability: Capability) -> Option<bool> {
        self.renders
            .lock()
            .iter()
            .rev()
            .find(|state| state.capability() == capability)
            .map(|state| state.enabled())
    }

    pub async fn press(&self, action: PanelAction) {
        let tx = self.actions.lock().clone().expect("no surface created");
        tx.send(action).await.expect("surface closed");
    }
}

impl OverlayHost for RecordingHost {
    fn create_surface(
        &self,
        actions: mpsc::Sender<PanelAction>,
    ) -> Result<Box<dyn OverlaySurface>, SurfaceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SurfaceError::Construction("window manager refused".to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.actions.lock() = Some(actions);
        Ok(Box::new(RecordingSurface {
            renders: Arc::clone(&self.renders),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct RecordingSurface {
    renders: Arc<Mutex<Vec<ToggleState>>>,
    closed: Arc<AtomicUsize>,
}

impl OverlaySurface for RecordingSurface {
    fn render(&mut self, state: &ToggleState) {
        self.renders.lock().push(state.clone());
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.messages.lock().iter().any(|m| m == text)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

pub struct Harness {
    pub device: Arc<Mutex<Device>>,
    pub runner: Arc<FakeRunner>,
    pub native: Arc<FakeNative>,
    pub permissions: Arc<FakePermissions>,
    pub host: Arc<RecordingHost>,
    pub notifier: Arc<RecordingNotifier>,
    pub manager: Arc<PanelLifecycleManager>,
}

pub const TEST_SETTLE_DELAY: Duration = Duration::from_millis(50);

impl Harness {
    pub fn new() -> Self {
        Self::with_device(Device::default())
    }

    pub fn with_device(device: Device) -> Self {
        Self::build(device, FakePermissions::granted())
    }

    pub fn build(device: Device, permissions: Arc<FakePermissions>) -> Self {
        let device = Arc::new(Mutex::new(device));
        let runner = FakeRunner::new(Arc::clone(&device));
        let native = FakeNative::new(Arc::clone(&device));
        let host = RecordingHost::new();
        let notifier = Arc::new(RecordingNotifier::default());

        let manager = PanelLifecycleManager::new(
            PanelDeps {
                runner: runner.clone(),
                native: native.clone(),
                permissions: permissions.clone(),
                host: host.clone(),
                notifier: notifier.clone(),
            },
            PanelSettings {
                settle_delay: TEST_SETTLE_DELAY,
                ..PanelSettings::default()
            },
        );

        Self {
            device,
            runner,
            native,
            permissions,
            host,
            notifier,
            manager,
        }
    }
}

/// Polls `condition` until it holds or `limit` passes.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(5)).await;
    }
    condition()
}
