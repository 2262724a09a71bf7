//! Application state shared with Tauri command handlers
//! Built once in setup and managed as `Arc<AppContext>`

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::config::LauncherConfig;
use crate::notifier::Notifier;
use crate::process::{SupervisedProcess, Supervisor};
use crate::shutdown::Shutdown;
use crate::window::WindowController;

/// How this process was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Owns the service and the launcher window
    Primary,
    /// An extra window attached to a service started by a primary launcher
    Terminal,
}

pub struct AppContext {
    pub config: LauncherConfig,
    pub port: u16,
    pub mode: LaunchMode,
    pub shutdown: Arc<Shutdown>,
    pub notifier: Arc<dyn Notifier>,
    pub supervisor: Supervisor,
    pub windows: WindowController,
    service: Mutex<Option<SupervisedProcess>>,
}

impl AppContext {
    pub fn new(
        config: LauncherConfig,
        port: u16,
        mode: LaunchMode,
        shutdown: Arc<Shutdown>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let supervisor = Supervisor::new(&config, shutdown.clone(), notifier.clone());
        let windows = WindowController::new(config.devtools);
        Self {
            config,
            port,
            mode,
            shutdown,
            notifier,
            supervisor,
            windows,
            service: Mutex::new(None),
        }
    }

    pub fn set_service(&self, service: SupervisedProcess) {
        info!(
            "Tracking {} PID {} started at {}",
            service.role(),
            service.pid(),
            service.started_at().to_rfc3339()
        );
        *self.service.lock() = Some(service);
    }

    pub fn service_pid(&self) -> Option<u32> {
        self.service.lock().as_ref().map(|service| service.pid())
    }

    pub fn service_uptime(&self) -> Option<Duration> {
        self.service.lock().as_ref().map(|service| service.uptime())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::notifier::testing::RecordingNotifier;
    use crate::process::ProcessGroup;
    use crate::shutdown::testing::recording_shutdown;

    /// Primary-mode context with a recording notifier and a non-exiting shutdown
    pub(crate) fn context_for(
        config: LauncherConfig,
    ) -> (Arc<AppContext>, Arc<RecordingNotifier>, Arc<Mutex<Vec<i32>>>) {
        let group = Arc::new(ProcessGroup::create().unwrap());
        let (shutdown, codes) = recording_shutdown(group);
        let notifier = Arc::new(RecordingNotifier::default());
        let ctx = AppContext::new(config, 3300, LaunchMode::Primary, shutdown, notifier.clone());
        (Arc::new(ctx), notifier, codes)
    }
}
