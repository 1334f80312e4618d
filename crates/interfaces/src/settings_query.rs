use std::sync::Arc;

use async_trait::async_trait;
use flipqs_core::{Capability, NativeStateQuery, QueryError};
use flipqs_executor::{CommandRequest, CommandRunner};

const WIFI_QUERY: &str = "settings get global wifi_on";
const BLUETOOTH_QUERY: &str = "settings get global bluetooth_on";

/// Answers the native radio queries from the global settings table, for
/// hosts without a platform binding.
pub struct SettingsStateQuery {
    runner: Arc<dyn CommandRunner>,
}

impl SettingsStateQuery {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn query_for(capability: Capability) -> Option<&'static str> {
        match capability {
            Capability::NetworkRadio => Some(WIFI_QUERY),
            Capability::ShortRangeRadio => Some(BLUETOOTH_QUERY),
            Capability::MobileData | Capability::Location => None,
        }
    }
}

#[async_trait]
impl NativeStateQuery for SettingsStateQuery {
    async fn is_enabled(&self, capability: Capability) -> Result<bool, QueryError> {
        let Some(query) = Self::query_for(capability) else {
            return Err(QueryError::Failed(
                capability,
                "no native query for this capability".to_string(),
            ));
        };

        let result = self.runner.execute(&CommandRequest::new(query)).await;
        if !result.is_success() {
            let denied = result.stderr.iter().any(|line| {
                line.contains("SecurityException") || line.contains("Permission denial")
            });
            tracing::debug!("'{}' failed: {:?}", query, result.stderr);
            return Err(if denied {
                QueryError::PermissionDenied(capability)
            } else {
                QueryError::Unavailable(capability)
            });
        }

        let raw = result.stdout_text();
        // wifi_on reports 2 while scanning in airplane mode
        match raw.parse::<i32>() {
            Ok(value) => Ok(value != 0),
            Err(_) => {
                // An unset key reads back as "null"
                tracing::warn!(
                    "Unexpected {} state '{}', assuming disabled",
                    capability,
                    raw
                );
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfiguredPermissions, LogNotifier, TerminalOverlayHost};
    use flipqs_core::{PanelDeps, PanelLifecycleManager, PanelSettings, Transition};
    use flipqs_executor::CommandResult;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Scripted(CommandResult);

    #[async_trait]
    impl CommandRunner for Scripted {
        async fn execute(&self, _request: &CommandRequest) -> CommandResult {
            self.0.clone()
        }
    }

    fn query(result: CommandResult) -> SettingsStateQuery {
        SettingsStateQuery::new(Arc::new(Scripted(result)))
    }

    fn output(stdout: &str, stderr: &[&str], exit_code: i32) -> CommandResult {
        CommandResult {
            exit_code,
            stdout: vec![stdout.to_string()],
            stderr: stderr.iter().map(|s| s.to_string()).collect(),
            timed_out: false,
        }
    }

    #[tokio::test]
    async fn test_reads_flag_values() {
        assert!(query(output("1", &[], 0))
            .is_enabled(Capability::NetworkRadio)
            .await
            .unwrap());
        assert!(query(output("2", &[], 0))
            .is_enabled(Capability::NetworkRadio)
            .await
            .unwrap());
        assert!(!query(output("0", &[], 0))
            .is_enabled(Capability::ShortRangeRadio)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_maps_failures() {
        let denied = query(output("", &["java.lang.SecurityException"], 0))
            .is_enabled(Capability::ShortRangeRadio)
            .await;
        assert!(matches!(denied, Err(QueryError::PermissionDenied(_))));

        let unavailable = query(output("", &[], 1))
            .is_enabled(Capability::NetworkRadio)
            .await;
        assert!(matches!(unavailable, Err(QueryError::Unavailable(_))));

    }

    #[tokio::test]
    async fn test_unparseable_value_reads_disabled() {
        for raw in ["null", "", "on"] {
            let state = query(output(raw, &[], 0))
                .is_enabled(Capability::NetworkRadio)
                .await;
            assert!(matches!(state, Ok(false)), "{:?} gave {:?}", raw, state);
        }
    }

    /// Answers "null" for `wifi_on` and records every command.
    #[derive(Default)]
    struct UnsetWifi {
        commands: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CommandRunner for UnsetWifi {
        async fn execute(&self, request: &CommandRequest) -> CommandResult {
            let command = request.command().to_string();
            let stdout = if command == WIFI_QUERY { "null" } else { "0" };
            self.commands.lock().push(command);
            output(stdout, &[], 0)
        }
    }

    #[tokio::test]
    async fn test_unset_wifi_flag_still_toggles_on() {
        let runner = Arc::new(UnsetWifi::default());
        let manager = PanelLifecycleManager::new(
            PanelDeps {
                runner: runner.clone(),
                native: Arc::new(SettingsStateQuery::new(runner.clone())),
                permissions: Arc::new(ConfiguredPermissions::default()),
                host: Arc::new(TerminalOverlayHost::with_writer(std::io::sink())),
                notifier: Arc::new(LogNotifier),
            },
            PanelSettings {
                settle_delay: Duration::from_millis(10),
                ..PanelSettings::default()
            },
        );
        manager.activate().await.unwrap();

        let snapshot = manager.refresh().await.unwrap();
        assert!(!snapshot.is_enabled(Capability::NetworkRadio));

        let outcome = manager
            .toggle(Capability::NetworkRadio)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.requested_transition, Transition::DisabledToEnabled);
        assert!(outcome.accepted);
        assert!(runner
            .commands
            .lock()
            .iter()
            .any(|command| command == "svc wifi enable"));

        manager.deactivate().await;
    }

    #[tokio::test]
    async fn test_settings_backed_capabilities_are_not_native() {
        let result = query(output("1", &[], 0))
            .is_enabled(Capability::MobileData)
            .await;
        assert!(result.is_err());
    }
}
