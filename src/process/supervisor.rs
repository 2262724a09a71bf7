use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::LauncherConfig;
use crate::error::{LauncherError, Result};
use crate::notifier::{Alert, Notifier};
use crate::process::{LaunchOutcome, ProcessGroup, ProcessRole};
use crate::shutdown::{ExitReason, Shutdown};

/// A process started by the supervisor and already joined to the group
#[derive(Debug)]
pub struct SupervisedProcess {
    pid: u32,
    role: ProcessRole,
    launched_at: Instant,
    started_at: DateTime<Utc>,
    watcher: Option<JoinHandle<()>>,
}

impl SupervisedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn role(&self) -> ProcessRole {
        self.role
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn uptime(&self) -> Duration {
        self.launched_at.elapsed()
    }

    /// Block until the watcher thread has observed the exit and reacted to it
    pub fn join_watcher(&mut self) {
        if let Some(handle) = self.watcher.take() {
            if handle.join().is_err() {
                error!("Watcher thread for PID {} panicked", self.pid);
            }
        }
    }
}

/// Starts the service and extra windows, and watches the service for exit
pub struct Supervisor {
    service_executable: PathBuf,
    service_args: Vec<String>,
    terminal_executable: Option<PathBuf>,
    grace: Duration,
    group: Arc<ProcessGroup>,
    shutdown: Arc<Shutdown>,
    notifier: Arc<dyn Notifier>,
}

impl Supervisor {
    pub fn new(config: &LauncherConfig, shutdown: Arc<Shutdown>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            service_executable: config.service_executable(),
            service_args: config.service.args.clone(),
            terminal_executable: config.terminal_executable().ok(),
            grace: config.grace_period(),
            group: shutdown.group().clone(),
            shutdown,
            notifier,
        }
    }

    /// Spawn the service on `port`, join it to the group and start watching it.
    /// A service that cannot be joined is killed: it would outlive the launcher
    pub fn start_service(&self, port: u16) -> Result<SupervisedProcess> {
        let program = self.service_executable.clone();
        let mut command = Command::new(&program);
        command
            .args(&self.service_args)
            .arg(format!("--port={}", port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // No console window for the service on Windows
        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x08000000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let child = self.spawn(ProcessRole::Service, command, &program)?;
        let launched_at = Instant::now();
        let started_at = Utc::now();
        let child = self.join(ProcessRole::Service, child)?;
        let pid = child.id();
        info!("Service started with PID {} on port {}", pid, port);

        let watcher = self.watch_service(child, launched_at).map_err(|source| {
            LauncherError::SpawnFailed {
                role: ProcessRole::Service,
                program: "service watcher thread".to_string(),
                source,
            }
        })?;

        Ok(SupervisedProcess {
            pid,
            role: ProcessRole::Service,
            launched_at,
            started_at,
            watcher: Some(watcher),
        })
    }

    /// Spawn another launcher in terminal mode pointed at the same service.
    /// It dies with the group, but its own exit is never treated as a failure
    pub fn start_window(&self, port: u16) -> Result<SupervisedProcess> {
        let program = match &self.terminal_executable {
            Some(path) => path.clone(),
            None => std::env::current_exe().map_err(|source| LauncherError::SpawnFailed {
                role: ProcessRole::Window,
                program: "<current executable>".to_string(),
                source,
            })?,
        };

        let mut command = Command::new(&program);
        command
            .arg("--terminal")
            .arg(format!("--port={}", port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = self.spawn(ProcessRole::Window, command, &program)?;
        let launched_at = Instant::now();
        let started_at = Utc::now();
        let child = self.join(ProcessRole::Window, child)?;
        let pid = child.id();
        info!("Terminal window started with PID {}", pid);

        let group = self.group.clone();
        let reaper = thread::Builder::new()
            .name(format!("window-reaper-{}", pid))
            .spawn(move || reap_window(child, group, launched_at))
            .map_err(|source| LauncherError::SpawnFailed {
                role: ProcessRole::Window,
                program: "window reaper thread".to_string(),
                source,
            })?;

        Ok(SupervisedProcess {
            pid,
            role: ProcessRole::Window,
            launched_at,
            started_at,
            watcher: Some(reaper),
        })
    }

    fn spawn(&self, role: ProcessRole, mut command: Command, program: &Path) -> Result<Child> {
        self.group.prepare(&mut command);
        command.spawn().map_err(|source| {
            error!("Failed to spawn {} process {:?}: {}", role, program, source);
            LauncherError::SpawnFailed {
                role,
                program: program.display().to_string(),
                source,
            }
        })
    }

    fn join(&self, role: ProcessRole, mut child: Child) -> Result<Child> {
        match self.group.add(&child) {
            Ok(()) => Ok(child),
            Err(e) => {
                error!("[{}] {}, killing {} process", e.code(), e, role);
                if let Err(kill_error) = child.kill() {
                    warn!("Failed to kill unjoined {} process: {}", role, kill_error);
                }
                let _ = child.wait();
                Err(e)
            }
        }
    }

    fn watch_service(&self, mut child: Child, launched_at: Instant) -> std::io::Result<JoinHandle<()>> {
        let pid = child.id();
        let grace = self.grace;
        let group = self.group.clone();
        let shutdown = self.shutdown.clone();
        let notifier = self.notifier.clone();

        thread::Builder::new()
            .name("service-watcher".to_string())
            .spawn(move || {
                let status = child.wait();
                let elapsed = launched_at.elapsed();
                group.mark_exited(pid);

                match status {
                    Ok(status) => info!(
                        "Service (PID {}) exited with {} after {:.1}s",
                        pid,
                        status,
                        elapsed.as_secs_f64()
                    ),
                    Err(e) => error!("Failed waiting on service (PID {}): {}", pid, e),
                }

                let outcome = LaunchOutcome::classify(elapsed, grace, shutdown.is_shutting_down());
                report_service_exit(outcome, notifier.as_ref(), &shutdown);
            })
    }
}

/// React to an observed service exit: alert the user, then shut everything down
pub fn report_service_exit(outcome: LaunchOutcome, notifier: &dyn Notifier, shutdown: &Arc<Shutdown>) {
    let Some(alert) = Alert::for_outcome(outcome) else {
        debug!("Service exit observed during shutdown");
        return;
    };

    warn!("Service exit classified as {:?}", outcome);
    let shutdown = shutdown.clone();
    notifier.alert(
        alert,
        Box::new(move || shutdown.request(ExitReason::ServiceFailed(outcome))),
    );
}

fn reap_window(mut child: Child, group: Arc<ProcessGroup>, launched_at: Instant) {
    let pid = child.id();
    match child.wait() {
        Ok(status) => debug!(
            "Terminal window (PID {}) closed with {} after {:.1}s",
            pid,
            status,
            launched_at.elapsed().as_secs_f64()
        ),
        Err(e) => warn!("Failed waiting on terminal window (PID {}): {}", pid, e),
    }
    group.mark_exited(pid);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::notifier::testing::RecordingNotifier;
    use crate::notifier::AlertKind;
    use crate::shutdown::testing::recording_shutdown;

    fn shell_service(script: &str, grace_secs: u64) -> LauncherConfig {
        let mut config = LauncherConfig::default();
        config.service.executable = PathBuf::from("/bin/sh");
        config.service.args = vec!["-c".to_string(), script.to_string()];
        config.service.grace_period_secs = grace_secs;
        config
    }

    fn supervisor_for(
        config: &LauncherConfig,
    ) -> (Supervisor, Arc<RecordingNotifier>, Arc<Shutdown>, Arc<parking_lot::Mutex<Vec<i32>>>) {
        let group = Arc::new(ProcessGroup::create().unwrap());
        let (shutdown, codes) = recording_shutdown(group);
        let notifier = Arc::new(RecordingNotifier::default());
        let supervisor = Supervisor::new(config, shutdown.clone(), notifier.clone());
        (supervisor, notifier, shutdown, codes)
    }

    #[test]
    fn test_missing_service_executable_fails_to_spawn() {
        let mut config = LauncherConfig::default();
        config.service.executable = PathBuf::from("/nonexistent/icarus-service");
        let (supervisor, notifier, shutdown, codes) = supervisor_for(&config);

        let result = supervisor.start_service(3300);

        assert!(matches!(
            result,
            Err(LauncherError::SpawnFailed { role: ProcessRole::Service, .. })
        ));
        assert_eq!(shutdown.group().member_count(), 0);
        assert!(notifier.alerts.lock().is_empty());
        assert!(codes.lock().is_empty());
    }

    #[test]
    fn test_early_exit_reports_blocked_startup() {
        let config = shell_service("exit 3", 10);
        let (supervisor, notifier, shutdown, codes) = supervisor_for(&config);

        let mut service = supervisor.start_service(3300).unwrap();
        assert_eq!(service.role(), ProcessRole::Service);
        service.join_watcher();

        let alerts = notifier.alerts.lock();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert!(alerts[0].message.contains("AntiVirus or Firewall"));
        assert_eq!(*codes.lock(), vec![1]);
        assert_eq!(
            shutdown.reason(),
            Some(ExitReason::ServiceFailed(LaunchOutcome::EarlyFailure))
        );
    }

    #[test]
    fn test_exit_after_grace_reports_unexpected_stop() {
        // Zero grace: any exit lands at or past the threshold
        let config = shell_service("exit 0", 0);
        let (supervisor, notifier, shutdown, codes) = supervisor_for(&config);

        let mut service = supervisor.start_service(3300).unwrap();
        service.join_watcher();

        let alerts = notifier.alerts.lock();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.contains("stopped unexpectedly"));
        assert_eq!(*codes.lock(), vec![1]);
        assert_eq!(
            shutdown.reason(),
            Some(ExitReason::ServiceFailed(LaunchOutcome::LateFailure))
        );
    }

    #[test]
    fn test_quit_kills_service_without_failure_alert() {
        let config = shell_service("sleep 30", 10);
        let (supervisor, notifier, shutdown, codes) = supervisor_for(&config);

        let mut service = supervisor.start_service(3300).unwrap();
        assert_eq!(shutdown.group().member_count(), 1);

        shutdown.request(ExitReason::UserQuit);
        service.join_watcher();

        assert!(shutdown.group().is_disposed());
        assert!(notifier.alerts.lock().is_empty());
        assert_eq!(*codes.lock(), vec![0]);
    }

    #[test]
    fn test_window_exit_is_not_a_failure() {
        let mut config = LauncherConfig::default();
        // `sh --terminal` rejects the flag and exits straight away
        config.terminal_executable = Some(PathBuf::from("/bin/sh"));
        let (supervisor, notifier, shutdown, codes) = supervisor_for(&config);

        let mut window = supervisor.start_window(3300).unwrap();
        assert_eq!(window.role(), ProcessRole::Window);
        assert_eq!(shutdown.group().member_count(), 1);
        window.join_watcher();

        assert!(notifier.alerts.lock().is_empty());
        assert!(codes.lock().is_empty());
        assert!(!shutdown.is_shutting_down());
    }

    #[test]
    fn test_missing_terminal_executable_is_reported() {
        let mut config = LauncherConfig::default();
        config.terminal_executable = Some(PathBuf::from("/nonexistent/icarus-terminal"));
        let (supervisor, _notifier, shutdown, _codes) = supervisor_for(&config);

        let result = supervisor.start_window(3300);
        assert!(matches!(
            result,
            Err(LauncherError::SpawnFailed { role: ProcessRole::Window, .. })
        ));
        assert!(!shutdown.is_shutting_down());
    }
}
