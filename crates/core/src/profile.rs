//! Static per-capability wiring: where state is read from, the literal
//! commands that flip it, and how the UI follows a toggle.

use crate::types::{Capability, Transition};

pub const LOCATION_MODE_OFF: i32 = 0;
pub const LOCATION_MODE_HIGH_ACCURACY: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingFormat {
    /// `"1"` on, `"0"` off.
    Flag,
    /// Integer location mode; `0` is off, anything else is on.
    LocationMode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unexpected setting value {raw:?}")]
pub struct ParseError {
    pub raw: String,
}

impl SettingFormat {
    pub fn parse(self, raw: &str) -> Result<bool, ParseError> {
        let value = raw.trim();
        match self {
            SettingFormat::Flag => match value {
                "1" => Ok(true),
                "0" => Ok(false),
                _ => Err(ParseError {
                    raw: raw.to_string(),
                }),
            },
            SettingFormat::LocationMode => value
                .parse::<i32>()
                .map(|mode| mode != LOCATION_MODE_OFF)
                .map_err(|_| ParseError {
                    raw: raw.to_string(),
                }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateSource {
    /// Platform exposes a direct boolean query.
    Native,
    /// Textual system setting read through the privileged shell.
    Setting {
        query: &'static str,
        format: SettingFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Render the expected state as soon as the command succeeds.
    Optimistic,
    /// Wait for a reconciliation pass after the settle delay.
    Deferred,
}

/// What a toggle does when the pre-toggle read itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadableState {
    AssumeDisabled,
    Refuse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityProfile {
    pub capability: Capability,
    pub source: StateSource,
    pub enable_command: &'static str,
    pub disable_command: &'static str,
    pub update_policy: UpdatePolicy,
    pub on_unreadable: UnreadableState,
    pub runtime_permission: bool,
}

impl CapabilityProfile {
    pub fn command_for(&self, transition: Transition) -> &'static str {
        match transition {
            Transition::DisabledToEnabled => self.enable_command,
            Transition::EnabledToDisabled => self.disable_command,
        }
    }
}

static NETWORK_RADIO: CapabilityProfile = CapabilityProfile {
    capability: Capability::NetworkRadio,
    source: StateSource::Native,
    enable_command: "svc wifi enable",
    disable_command: "svc wifi disable",
    // Native query lags right after a toggle
    update_policy: UpdatePolicy::Optimistic,
    on_unreadable: UnreadableState::Refuse,
    runtime_permission: false,
};

static MOBILE_DATA: CapabilityProfile = CapabilityProfile {
    capability: Capability::MobileData,
    source: StateSource::Setting {
        query: "settings get global mobile_data",
        format: SettingFormat::Flag,
    },
    enable_command: "svc data enable",
    disable_command: "svc data disable",
    update_policy: UpdatePolicy::Deferred,
    on_unreadable: UnreadableState::AssumeDisabled,
    runtime_permission: false,
};

static LOCATION: CapabilityProfile = CapabilityProfile {
    capability: Capability::Location,
    source: StateSource::Setting {
        query: "settings get secure location_mode",
        format: SettingFormat::LocationMode,
    },
    enable_command: "settings put secure location_mode 3",
    disable_command: "settings put secure location_mode 0",
    update_policy: UpdatePolicy::Deferred,
    on_unreadable: UnreadableState::Refuse,
    runtime_permission: false,
};

static SHORT_RANGE_RADIO: CapabilityProfile = CapabilityProfile {
    capability: Capability::ShortRangeRadio,
    source: StateSource::Native,
    enable_command: "svc bluetooth enable",
    disable_command: "svc bluetooth disable",
    update_policy: UpdatePolicy::Deferred,
    on_unreadable: UnreadableState::Refuse,
    runtime_permission: true,
};

pub fn profile(capability: Capability) -> &'static CapabilityProfile {
    match capability {
        Capability::NetworkRadio => &NETWORK_RADIO,
        Capability::MobileData => &MOBILE_DATA,
        Capability::Location => &LOCATION,
        Capability::ShortRangeRadio => &SHORT_RANGE_RADIO,
    }
}
