use clap::Parser;

use crate::app::{APP_NAME, APP_VERSION};
use crate::config::{LauncherConfig, WindowSize};

#[derive(Debug, Parser)]
#[command(name = "icarus-launcher")]
#[command(about = "Starts the ICARUS Terminal service and opens its window")]
#[command(version = APP_VERSION)]
pub struct Cli {
    /// Terminal window width [default: 1024]
    #[arg(long)]
    pub width: Option<u32>,

    /// Terminal window height [default: 768]
    #[arg(long)]
    pub height: Option<u32>,

    /// Port the service listens on; negotiated when omitted
    #[arg(long)]
    pub port: Option<u16>,

    /// Open a terminal window on a running service instead of starting one
    #[arg(long)]
    pub terminal: bool,
}

impl Cli {
    /// Terminal window size: command line first, then the config file
    pub fn terminal_window(&self, config: &LauncherConfig) -> WindowSize {
        WindowSize {
            width: self.width.unwrap_or(config.terminal_window.width),
            height: self.height.unwrap_or(config.terminal_window.height),
        }
    }
}

pub fn banner() -> String {
    format!("{} v{}", APP_NAME, APP_VERSION)
}
