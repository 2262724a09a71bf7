//! Functions page script can call on the launcher.
//!
//! `BRIDGE_SCRIPT` runs before any page script and exposes them as
//! `window.app_toggleFullScreen()`, `window.app_quit()` and
//! `window.app_newWindow()`, each returning a promise. The commands are
//! synchronous, so Tauri runs them on the main thread.

use std::sync::Arc;

use tauri::{State, WebviewWindow};
use tracing::{error, info};

use crate::shutdown::ExitReason;
use crate::state::AppContext;

pub const BRIDGE_SCRIPT: &str = r#"
(function () {
  var invoke = function (cmd) {
    return window.__TAURI_INTERNALS__.invoke(cmd, {});
  };
  window.app_toggleFullScreen = function () { return invoke('app_toggle_full_screen'); };
  window.app_quit = function () { return invoke('app_quit'); };
  window.app_newWindow = function () { return invoke('app_new_window'); };
})();
"#;

/// Returns whether the window is fullscreen after the toggle
#[tauri::command]
pub fn app_toggle_full_screen(
    window: WebviewWindow,
    ctx: State<'_, Arc<AppContext>>,
) -> Result<bool, String> {
    ctx.windows
        .toggle_fullscreen(window.label(), &window)
        .map_err(|e| {
            error!("[{}] {}", e.code(), e);
            e.to_string()
        })
}

#[tauri::command]
pub fn app_quit(ctx: State<'_, Arc<AppContext>>) {
    match ctx.service_uptime() {
        Some(uptime) => info!("Quit requested after {:.0}s of service uptime", uptime.as_secs_f64()),
        None => info!("Quit requested"),
    }
    ctx.shutdown.request(ExitReason::UserQuit);
}

/// Opens another terminal window process. Failures are only logged
#[tauri::command]
pub fn app_new_window(ctx: State<'_, Arc<AppContext>>) {
    open_new_window(&ctx);
}

pub(crate) fn open_new_window(ctx: &AppContext) {
    match ctx.supervisor.start_window(ctx.port) {
        Ok(window) => info!("New terminal window PID {}", window.pid()),
        Err(e) => error!("[{}] Opening new terminal failed: {}", e.code(), e),
    }
}
