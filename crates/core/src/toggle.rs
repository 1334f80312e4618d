use std::sync::Arc;

use flipqs_executor::{CommandRequest, CommandRunner, ExecutionOutcome};
use thiserror::Error;

use crate::metrics::Metrics;
use crate::platform::{Notifier, QueryError};
use crate::profile::{profile, UnreadableState, UpdatePolicy};
use crate::reconciler::StateReconciler;
use crate::state::{ReadError, StateReader};
use crate::types::{Capability, ToggleState, Transition};

#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("{0} service unavailable")]
    ServiceUnavailable(Capability),
    #[error("{0} permission missing")]
    PermissionMissing(Capability),
    #[error("Could not read {0} state")]
    StateUnavailable(Capability),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub capability: Capability,
    pub requested_transition: Transition,
    pub accepted: bool,
    pub execution: ExecutionOutcome,
    /// The panel closed while the command ran; nothing was published.
    pub discarded: bool,
}

/// Flips one capability and decides how the UI follows.
pub struct ToggleController {
    capability: Capability,
    runner: Arc<dyn CommandRunner>,
    reader: Arc<StateReader>,
    reconciler: Arc<StateReconciler>,
    notifier: Arc<dyn Notifier>,
    metrics: Arc<Metrics>,
}

impl ToggleController {
    pub fn new(
        capability: Capability,
        runner: Arc<dyn CommandRunner>,
        reader: Arc<StateReader>,
        reconciler: Arc<StateReconciler>,
        notifier: Arc<dyn Notifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            capability,
            runner,
            reader,
            reconciler,
            notifier,
            metrics,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub async fn toggle(&self) -> Result<ToggleOutcome, ToggleError> {
        let capability = self.capability;
        let profile = profile(capability);
        tracing::info!("{} toggle requested", capability);

        let was_enabled = self.current_state().await?;
        let transition = Transition::from_current(was_enabled);
        let command = profile.command_for(transition);
        tracing::debug!(
            "{} state before toggle: {}, issuing '{}'",
            capability,
            was_enabled,
            command
        );

        self.metrics.inc_toggles();
        let result = self.runner.execute(&CommandRequest::new(command)).await;
        let accepted = result.is_success();
        if !accepted {
            self.metrics.inc_toggle_failures();
        }
        if result.timed_out {
            self.metrics.inc_command_timeouts();
        }
        let mut outcome = ToggleOutcome {
            capability,
            requested_transition: transition,
            accepted,
            execution: result.outcome(),
            discarded: false,
        };

        let session = self.reconciler.session();
        if !session.is_live() {
            tracing::debug!(
                "{} closed while '{}' ran, discarding result",
                session.token(),
                command
            );
            self.metrics.inc_discarded_results();
            outcome.discarded = true;
            return Ok(outcome);
        }

        if accepted {
            let verb = if transition.target() {
                "Enabling..."
            } else {
                "Disabling..."
            };
            self.notifier.notify(&format!("{} {}", capability, verb));
        } else {
            tracing::warn!("Toggling {} failed: {:?}", capability, outcome.execution);
            self.notifier.notify(&format!("Failed to toggle {}", capability));
        }

        match (profile.update_policy, accepted) {
            (UpdatePolicy::Optimistic, true) => {
                session
                    .ui()
                    .render(ToggleState::observed(capability, transition.target()));
            }
            (UpdatePolicy::Optimistic, false) | (UpdatePolicy::Deferred, true) => {
                self.reconciler.schedule_settled_refresh().await;
            }
            (UpdatePolicy::Deferred, false) => {}
        }

        Ok(outcome)
    }

    async fn current_state(&self) -> Result<bool, ToggleError> {
        let capability = self.capability;
        match self.reader.read(capability).await {
            Ok(enabled) => Ok(enabled),
            Err(ReadError::PermissionMissing(_))
            | Err(ReadError::Query(QueryError::PermissionDenied(_))) => {
                tracing::warn!("{} permission missing, toggle refused", capability);
                self.metrics.inc_permission_denials();
                self.notifier
                    .notify(&format!("{} permission missing", capability));
                Err(ToggleError::PermissionMissing(capability))
            }
            Err(ReadError::Query(e)) => {
                tracing::error!("{} state query failed: {}", capability, e);
                self.notifier
                    .notify(&format!("Cannot access {} service", capability));
                Err(ToggleError::ServiceUnavailable(capability))
            }
            Err(ReadError::CommandFailed(_)) => match profile(capability).on_unreadable {
                UnreadableState::AssumeDisabled => {
                    tracing::warn!("Failed to get {} state, assuming disabled", capability);
                    Ok(false)
                }
                UnreadableState::Refuse => {
                    self.notifier
                        .notify(&format!("Failed to get {} status", capability));
                    Err(ToggleError::StateUnavailable(capability))
                }
            },
        }
    }
}
