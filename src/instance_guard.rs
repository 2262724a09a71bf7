//! Best-effort detection of an already running launcher.
//!
//! Looks the launcher window title up in the OS window listing. This is a
//! heuristic, not a lock: two launchers started at the same instant can both
//! pass. Any failure to query means "not running" so a flaky query never
//! blocks a legitimate start.

use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::error::{LauncherError, Result};

/// Source of the textual window listing filtered by title
pub trait WindowQuery {
    fn list_windows_titled(&self, title: &str) -> Result<String>;

    /// Substring that marks an empty result in the listing, if the tool prints one
    fn empty_sentinel(&self) -> Option<&str> {
        None
    }
}

pub struct InstanceGuard<Q: WindowQuery> {
    query: Q,
}

impl<Q: WindowQuery> InstanceGuard<Q> {
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    pub fn is_already_running(&self, window_title: &str) -> bool {
        let listing = match self.query.list_windows_titled(window_title) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("[{}] {}; assuming no other instance", e.code(), e);
                return false;
            }
        };

        let running = listing_has_match(&listing, self.query.empty_sentinel());
        debug!("Instance check for {:?}: running={}", window_title, running);
        running
    }
}

fn listing_has_match(listing: &str, sentinel: Option<&str>) -> bool {
    if listing.trim().is_empty() {
        return false;
    }
    match sentinel {
        Some(sentinel) => !listing.contains(sentinel),
        None => true,
    }
}

/// Queries the live OS window table
pub struct SystemWindowQuery;

#[cfg(target_os = "windows")]
impl WindowQuery for SystemWindowQuery {
    fn list_windows_titled(&self, title: &str) -> Result<String> {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;

        let output = Command::new("TASKLIST")
            .args(["/FI", &format!("WINDOWTITLE eq {}", title)])
            .stdin(Stdio::null())
            .creation_flags(CREATE_NO_WINDOW)
            .output()
            .map_err(|e| LauncherError::QueryFailed(format!("TASKLIST: {}", e)))?;

        if !output.status.success() {
            return Err(LauncherError::QueryFailed(format!(
                "TASKLIST exited with {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn empty_sentinel(&self) -> Option<&str> {
        Some("No tasks are running")
    }
}

#[cfg(not(target_os = "windows"))]
impl WindowQuery for SystemWindowQuery {
    fn list_windows_titled(&self, title: &str) -> Result<String> {
        // xdotool prints one window id per match and exits 1 when nothing
        // matches, so only a failure to run it counts as a query error
        let output = Command::new("xdotool")
            .args(["search", "--name", &format!("^{}$", title)])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| LauncherError::QueryFailed(format!("xdotool: {}", e)))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
