use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Why a supervised process was started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessRole {
    Service,
    Window,
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessRole::Service => f.write_str("service"),
            ProcessRole::Window => f.write_str("window"),
        }
    }
}

/// Classification of an observed service exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchOutcome {
    /// The launcher was already shutting down and took the service with it
    CleanShutdown,
    /// Exited inside the startup grace window
    EarlyFailure,
    /// Exited after the grace window
    LateFailure,
}

impl LaunchOutcome {
    /// Derive the outcome once, at the moment the exit is observed.
    /// An exit exactly at the threshold counts as late
    pub fn classify(elapsed: Duration, grace: Duration, shutting_down: bool) -> Self {
        if shutting_down {
            LaunchOutcome::CleanShutdown
        } else if elapsed < grace {
            LaunchOutcome::EarlyFailure
        } else {
            LaunchOutcome::LateFailure
        }
    }
}
