use std::io;

use thiserror::Error;

use crate::process::ProcessRole;

/// Errors raised by the launcher core
#[derive(Debug, Error)]
pub enum LauncherError {
    /// No group means no termination safety net - startup cannot continue
    #[error("failed to create process group: {0}")]
    GroupCreationFailed(#[source] io::Error),

    #[error("failed to add process {pid} to process group: {source}")]
    JoinFailed {
        pid: u32,
        #[source]
        source: io::Error,
    },

    #[error("failed to close process group: {0}")]
    CloseFailed(#[source] io::Error),

    #[error("failed to spawn {role} process `{program}`: {source}")]
    SpawnFailed {
        role: ProcessRole,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("instance query failed: {0}")]
    QueryFailed(String),

    #[error("window operation failed: {0}")]
    Window(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl LauncherError {
    /// Short, stable identifier used in log lines
    pub fn code(&self) -> &'static str {
        match self {
            LauncherError::GroupCreationFailed(_) => "GROUP_CREATE",
            LauncherError::JoinFailed { .. } => "GROUP_JOIN",
            LauncherError::CloseFailed(_) => "GROUP_CLOSE",
            LauncherError::SpawnFailed { .. } => "SPAWN",
            LauncherError::QueryFailed(_) => "QUERY",
            LauncherError::Window(_) => "WINDOW",
            LauncherError::Config(_) => "CONFIG",
        }
    }
}

impl From<tauri::Error> for LauncherError {
    fn from(e: tauri::Error) -> Self {
        LauncherError::Window(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LauncherError>;
