pub const APP_NAME: &str = "ICARUS Terminal";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_ID: &str = "icarus-terminal";

/// Title of the primary window; also what the single-instance guard looks for
pub const LAUNCHER_WINDOW_TITLE: &str = "ICARUS Terminal Launcher";
pub const TERMINAL_WINDOW_TITLE: &str = "ICARUS Terminal";
pub const SERVICE_NAME: &str = "ICARUS Terminal Service";

#[cfg(target_os = "windows")]
pub const SERVICE_EXECUTABLE: &str = "ICARUS Service.exe";
#[cfg(not(target_os = "windows"))]
pub const SERVICE_EXECUTABLE: &str = "icarus-service";

/// Label every launcher window is created with
pub const MAIN_WINDOW_LABEL: &str = "main";
pub const LAUNCHER_PAGE: &str = "launcher.html";

pub const DEFAULT_LAUNCHER_WINDOW_WIDTH: u32 = 640;
pub const DEFAULT_LAUNCHER_WINDOW_HEIGHT: u32 = 480;
pub const DEFAULT_WINDOW_WIDTH: u32 = 1024;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 768;

pub const DEFAULT_SERVICE_PORT: u16 = 3300;
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 10;

pub const LOG_FILTER_ENV: &str = "ICARUS_LOG";
