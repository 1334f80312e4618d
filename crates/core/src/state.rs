use std::sync::Arc;

use flipqs_executor::{CommandRequest, CommandRunner};
use thiserror::Error;

use crate::platform::{NativeStateQuery, Permission, PermissionProbe, QueryError};
use crate::profile::{profile, StateSource};
use crate::types::{Capability, PanelSnapshot, ToggleState};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("{0} permission missing")]
    PermissionMissing(Capability),
    #[error("Could not read {0} setting")]
    CommandFailed(Capability),
}

/// Reads the authoritative state of a capability, using whichever strategy
/// its profile names.
pub struct StateReader {
    runner: Arc<dyn CommandRunner>,
    native: Arc<dyn NativeStateQuery>,
    permissions: Arc<dyn PermissionProbe>,
}

impl StateReader {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        native: Arc<dyn NativeStateQuery>,
        permissions: Arc<dyn PermissionProbe>,
    ) -> Self {
        Self {
            runner,
            native,
            permissions,
        }
    }

    /// Unparseable setting text reads as disabled rather than an error.
    pub async fn read(&self, capability: Capability) -> Result<bool, ReadError> {
        let profile = profile(capability);
        if profile.runtime_permission && !self.permissions.is_granted(Permission::ShortRangeRadio)
        {
            return Err(ReadError::PermissionMissing(capability));
        }

        match profile.source {
            StateSource::Native => Ok(self.native.is_enabled(capability).await?),
            StateSource::Setting { query, format } => {
                let Some(raw) = self
                    .runner
                    .execute_for_output(&CommandRequest::new(query))
                    .await
                else {
                    return Err(ReadError::CommandFailed(capability));
                };

                Ok(format.parse(&raw).unwrap_or_else(|e| {
                    tracing::warn!(
                        "Parsing {} state failed ({}), assuming disabled",
                        capability,
                        e
                    );
                    false
                }))
            }
        }
    }

    pub async fn observe(&self, capability: Capability) -> ToggleState {
        let enabled = match self.read(capability).await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!("Reading {} failed: {}", capability, e);
                false
            }
        };
        ToggleState::observed(capability, enabled)
    }

    /// Fresh reads of every capability; nothing is carried over from earlier passes.
    pub async fn snapshot(&self) -> PanelSnapshot {
        let (radio, data, location, short_range) = tokio::join!(
            self.observe(Capability::NetworkRadio),
            self.observe(Capability::MobileData),
            self.observe(Capability::Location),
            self.observe(Capability::ShortRangeRadio),
        );
        PanelSnapshot {
            states: vec![radio, data, location, short_range],
        }
    }
}
