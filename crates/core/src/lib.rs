pub mod lifecycle;
pub mod metrics;
pub mod platform;
pub mod profile;
pub mod reconciler;
pub mod session;
pub mod state;
pub mod toggle;
pub mod trigger;
pub mod types;
pub mod ui;

pub use lifecycle::{
    Activation, PanelDeps, PanelError, PanelLifecycleManager, PanelSettings, PanelStatus,
    DEFAULT_SETTLE_DELAY,
};
pub use metrics::{Metrics, MetricsSnapshot};
pub use platform::{
    NativeStateQuery, Notifier, OverlayHost, OverlaySurface, Permission, PermissionProbe,
    QueryError, SurfaceError,
};
pub use profile::{profile, CapabilityProfile, StateSource, UpdatePolicy};
pub use reconciler::StateReconciler;
pub use session::PanelSession;
pub use state::{ReadError, StateReader};
pub use toggle::{ToggleController, ToggleError, ToggleOutcome};
pub use trigger::{
    PanelActivator, TriggerSender, TriggerWatcher, COLLAPSE_COMMAND, DEFAULT_EVENT_BUFFER,
    NOTIFICATION_PANEL_ID,
};
pub use types::*;
pub use ui::{UiHandle, UiThread};
