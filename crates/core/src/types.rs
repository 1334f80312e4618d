use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    NetworkRadio,
    MobileData,
    Location,
    ShortRangeRadio,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::NetworkRadio,
        Capability::MobileData,
        Capability::Location,
        Capability::ShortRangeRadio,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Capability::NetworkRadio => "Wi-Fi",
            Capability::MobileData => "Mobile Data",
            Capability::Location => "Location",
            Capability::ShortRangeRadio => "Bluetooth",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown capability: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wifi" | "wi-fi" | "network_radio" => Ok(Capability::NetworkRadio),
            "data" | "mobile_data" => Ok(Capability::MobileData),
            "location" | "gps" => Ok(Capability::Location),
            "bluetooth" | "bt" | "short_range_radio" => Ok(Capability::ShortRangeRadio),
            other => Err(UnknownCapability(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    EnabledToDisabled,
    DisabledToEnabled,
}

impl Transition {
    /// The only transition a toggle may request from `enabled`.
    pub fn from_current(enabled: bool) -> Self {
        if enabled {
            Transition::EnabledToDisabled
        } else {
            Transition::DisabledToEnabled
        }
    }

    pub fn target(self) -> bool {
        matches!(self, Transition::DisabledToEnabled)
    }
}

/// Observed state of one capability. Only produced by reading the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleState {
    capability: Capability,
    enabled: bool,
    observed_at: DateTime<Utc>,
}

impl ToggleState {
    pub(crate) fn observed(capability: Capability, enabled: bool) -> Self {
        Self {
            capability,
            enabled,
            observed_at: Utc::now(),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Every capability's state from a single reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelSnapshot {
    pub states: Vec<ToggleState>,
}

impl PanelSnapshot {
    pub fn get(&self, capability: Capability) -> Option<&ToggleState> {
        self.states.iter().find(|s| s.capability == capability)
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.get(capability).is_some_and(|s| s.enabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    WindowStateChanged,
    WindowContentChanged,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub source_identifier: String,
    pub kind: TriggerKind,
}

impl TriggerEvent {
    pub fn new(source_identifier: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            source_identifier: source_identifier.into(),
            kind,
        }
    }
}

/// User input coming back from the overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    Toggle(Capability),
    Dismiss,
}

/// Ownership token of one panel instance. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PanelToken(pub(crate) u64);

impl PanelToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PanelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}
