use std::sync::Arc;

use flipqs_core::{PanelDeps, PanelLifecycleManager, TriggerWatcher};
use flipqs_executor::CommandExecutor;
use flipqs_interfaces::{
    ConfiguredPermissions, LogNotifier, SettingsStateQuery, TerminalOverlayHost,
};

use crate::config::Config;

/// Everything a command needs, wired from one configuration.
pub struct Runtime {
    pub config: Config,
    pub executor: Arc<CommandExecutor>,
    pub permissions: ConfiguredPermissions,
    pub host: Arc<TerminalOverlayHost>,
    pub notifier: Arc<LogNotifier>,
    pub manager: Arc<PanelLifecycleManager>,
}

impl Runtime {
    pub fn new(config: Config) -> Self {
        Self::with_host(config, TerminalOverlayHost::new())
    }

    pub fn with_host(config: Config, host: TerminalOverlayHost) -> Self {
        let executor = Arc::new(CommandExecutor::new(config.shell.clone()));
        let permissions = config.permissions();
        let host = Arc::new(host);
        let notifier = Arc::new(LogNotifier);

        let manager = PanelLifecycleManager::new(
            PanelDeps {
                runner: executor.clone(),
                native: Arc::new(SettingsStateQuery::new(executor.clone())),
                permissions: Arc::new(permissions),
                host: host.clone(),
                notifier: notifier.clone(),
            },
            config.panel_settings(),
        );

        Self {
            config,
            executor,
            permissions,
            host,
            notifier,
            manager,
        }
    }

    pub fn trigger_watcher(&self) -> TriggerWatcher {
        TriggerWatcher::new(
            self.config.trigger_source.clone(),
            self.executor.clone(),
            self.manager.clone(),
            self.notifier.clone(),
        )
        .with_metrics(self.manager.metrics())
    }
}
