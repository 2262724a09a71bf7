//! User-facing alerts raised by the launcher.
//! Presentation is delegated to the dialog plugin; the core only decides
//! which alert to raise and what happens once the user dismisses it.

use tauri::{AppHandle, Runtime};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tracing::{error, info};

use crate::app::SERVICE_NAME;
use crate::process::LaunchOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn already_running() -> Self {
        Self {
            kind: AlertKind::Info,
            title: "Information".to_string(),
            message: format!(
                "{} is already running.\n\nYou can only run one instance at a time.",
                SERVICE_NAME
            ),
        }
    }

    pub fn service_spawn_failed() -> Self {
        Self {
            kind: AlertKind::Error,
            title: "Error".to_string(),
            message: format!("Failed to start {}.", SERVICE_NAME),
        }
    }

    /// Alert for an observed service exit; `None` when the exit was expected
    pub fn for_outcome(outcome: LaunchOutcome) -> Option<Self> {
        let message = match outcome {
            LaunchOutcome::CleanShutdown => return None,
            LaunchOutcome::EarlyFailure => format!(
                "{} failed to start.\n\nAntiVirus or Firewall software may have prevented it from starting.",
                SERVICE_NAME
            ),
            LaunchOutcome::LateFailure => format!("{} stopped unexpectedly.", SERVICE_NAME),
        };
        Some(Self {
            kind: AlertKind::Error,
            title: "Error".to_string(),
            message,
        })
    }
}

/// Runs once the alert has been dismissed
pub type OnDismiss = Box<dyn FnOnce() + Send + 'static>;

/// Presents alerts without blocking the caller
pub trait Notifier: Send + Sync {
    fn alert(&self, alert: Alert, on_dismiss: OnDismiss);
}

/// Native message box through tauri-plugin-dialog
pub struct DialogNotifier<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> DialogNotifier<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> Notifier for DialogNotifier<R> {
    fn alert(&self, alert: Alert, on_dismiss: OnDismiss) {
        match alert.kind {
            AlertKind::Info => info!("{}: {}", alert.title, alert.message),
            AlertKind::Error => error!("{}: {}", alert.title, alert.message),
        }

        let kind = match alert.kind {
            AlertKind::Info => MessageDialogKind::Info,
            AlertKind::Error => MessageDialogKind::Error,
        };

        // Non-blocking show: safe from the main thread during setup as well
        // as from watcher threads
        self.app
            .dialog()
            .message(alert.message)
            .title(alert.title)
            .kind(kind)
            .buttons(MessageDialogButtons::Ok)
            .show(move |_| on_dismiss());
    }
}
