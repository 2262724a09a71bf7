use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::app::{
    APP_ID, DEFAULT_GRACE_PERIOD_SECS, DEFAULT_LAUNCHER_WINDOW_HEIGHT,
    DEFAULT_LAUNCHER_WINDOW_WIDTH, DEFAULT_SERVICE_PORT, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH, SERVICE_EXECUTABLE,
};
use crate::error::{LauncherError, Result};

const CONFIG_FILE_NAME: &str = "launcher.json";
const SERVICE_EXECUTABLE_ENV: &str = "ICARUS_SERVICE_EXECUTABLE";
const GRACE_PERIOD_ENV: &str = "ICARUS_GRACE_PERIOD_SECS";

/// Launcher configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// How the background service is launched
    pub service: ServiceConfig,

    /// Executable started for extra terminal windows; the launcher itself when unset
    pub terminal_executable: Option<PathBuf>,

    pub launcher_window: WindowSize,

    pub terminal_window: WindowSize,

    /// Open devtools on every window (debug builds only)
    pub devtools: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub executable: PathBuf,

    /// Arguments placed before `--port=<N>`
    pub args: Vec<String>,

    /// Exits inside this window are reported as blocked startups
    pub grace_period_secs: u64,

    /// Used when no free port can be negotiated
    pub fallback_port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(SERVICE_EXECUTABLE),
            args: Vec::new(),
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            fallback_port: DEFAULT_SERVICE_PORT,
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            terminal_executable: None,
            launcher_window: WindowSize {
                width: DEFAULT_LAUNCHER_WINDOW_WIDTH,
                height: DEFAULT_LAUNCHER_WINDOW_HEIGHT,
            },
            terminal_window: WindowSize {
                width: DEFAULT_WINDOW_WIDTH,
                height: DEFAULT_WINDOW_HEIGHT,
            },
            devtools: false,
        }
    }
}

impl LauncherConfig {
    /// Load configuration from the user config file, then apply environment
    /// overrides. A missing or unreadable file means defaults
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => match Self::load_from(&path) {
                Ok(config) => match config.validate() {
                    Ok(()) => {
                        info!("Loaded launcher config from {:?}", path);
                        config
                    }
                    Err(e) => {
                        warn!("[{}] Ignoring launcher config: {}", e.code(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Ignoring launcher config: {:#}", e);
                    Self::default()
                }
            },
            _ => Self::default(),
        };

        config.apply_overrides(|key| env::var(key).ok());
        config
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// `<config dir>/icarus-terminal/launcher.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_ID).join(CONFIG_FILE_NAME))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(executable) = lookup(SERVICE_EXECUTABLE_ENV).filter(|v| !v.trim().is_empty()) {
            self.service.executable = PathBuf::from(executable.trim());
        }

        if let Some(raw) = lookup(GRACE_PERIOD_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.service.grace_period_secs = secs,
                Err(_) => warn!("Ignoring invalid {}={:?}", GRACE_PERIOD_ENV, raw),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.executable.as_os_str().is_empty() {
            return Err(LauncherError::Config("service executable is empty".to_string()));
        }
        for (name, size) in [
            ("launcher_window", self.launcher_window),
            ("terminal_window", self.terminal_window),
        ] {
            if size.width == 0 || size.height == 0 {
                return Err(LauncherError::Config(format!(
                    "{} must be larger than 0x0, got {}x{}",
                    name, size.width, size.height
                )));
            }
        }
        Ok(())
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.service.grace_period_secs)
    }

    pub fn service_executable(&self) -> PathBuf {
        resolve_executable(&self.service.executable)
    }

    pub fn terminal_executable(&self) -> std::io::Result<PathBuf> {
        match &self.terminal_executable {
            Some(path) => Ok(resolve_executable(path)),
            None => env::current_exe(),
        }
    }
}

/// Relative executables are looked up next to the launcher first, then on PATH.
/// Unresolvable names are returned unchanged and fail at spawn time
pub fn resolve_executable(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let beside_launcher = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(path)))
        .filter(|candidate| candidate.is_file());
    if let Some(candidate) = beside_launcher {
        return candidate;
    }

    which::which(path).unwrap_or_else(|_| path.to_path_buf())
}
