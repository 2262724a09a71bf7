//! Startup ordering for the two launch modes.
//!
//! A primary launcher checks for a running instance, starts the service and
//! only then opens its window. A terminal-mode launcher just opens a window
//! on a port some primary launcher already serves.

use tauri::{Manager, Runtime};
use tracing::{error, info, warn};

use crate::app::{LAUNCHER_PAGE, LAUNCHER_WINDOW_TITLE, TERMINAL_WINDOW_TITLE};
use crate::config::WindowSize;
use crate::error::{LauncherError, Result};
use crate::instance_guard::{InstanceGuard, WindowQuery};
use crate::notifier::Alert;
use crate::shutdown::ExitReason;
use crate::state::{AppContext, LaunchMode};
use crate::window::WindowTarget;

/// Run the primary startup sequence. Returns `false` when startup was aborted;
/// shutdown then follows once the user dismisses the alert
pub fn boot_primary<Q: WindowQuery>(ctx: &AppContext, guard: &InstanceGuard<Q>) -> bool {
    if guard.is_already_running(LAUNCHER_WINDOW_TITLE) {
        warn!("Another launcher is already running");
        abort(ctx, Alert::already_running(), ExitReason::AlreadyRunning);
        return false;
    }

    match ctx.supervisor.start_service(ctx.port) {
        Ok(service) => {
            ctx.set_service(service);
            true
        }
        Err(e) => {
            error!("[{}] Error starting service: {}", e.code(), e);
            let reason = match e {
                LauncherError::JoinFailed { .. } => ExitReason::ServiceJoinFailed,
                _ => ExitReason::ServiceSpawnFailed,
            };
            abort(ctx, Alert::service_spawn_failed(), reason);
            false
        }
    }
}

fn abort(ctx: &AppContext, alert: Alert, reason: ExitReason) {
    let shutdown = ctx.shutdown.clone();
    ctx.notifier.alert(alert, Box::new(move || shutdown.request(reason)));
}

/// Where the window of this process points, and how big it is
pub fn window_target(mode: LaunchMode, port: u16, launcher: WindowSize, terminal: WindowSize) -> WindowTarget {
    match mode {
        LaunchMode::Primary => WindowTarget {
            title: LAUNCHER_WINDOW_TITLE.to_string(),
            url: format!("http://localhost:{}/{}", port, LAUNCHER_PAGE),
            width: launcher.width,
            height: launcher.height,
        },
        LaunchMode::Terminal => WindowTarget {
            title: TERMINAL_WINDOW_TITLE.to_string(),
            url: format!("http://localhost:{}", port),
            width: terminal.width,
            height: terminal.height,
        },
    }
}

/// Start whatever the launch mode requires and open the window
pub fn start<R: Runtime, M: Manager<R>, Q: WindowQuery>(
    manager: &M,
    ctx: &AppContext,
    guard: &InstanceGuard<Q>,
    terminal_window: WindowSize,
) -> Result<()> {
    if ctx.mode == LaunchMode::Primary && !boot_primary(ctx, guard) {
        return Ok(());
    }

    let target = window_target(ctx.mode, ctx.port, ctx.config.launcher_window, terminal_window);
    info!("Opening {:?} window on port {}", ctx.mode, ctx.port);
    ctx.windows.open(manager, &target)?;
    Ok(())
}
