//! Native window creation and per-window state
//! Every launcher process owns exactly one webview window, labelled `main`

pub mod fullscreen;

use dashmap::DashMap;
use tauri::{Manager, Runtime, WebviewUrl, WebviewWindow, WebviewWindowBuilder, WindowEvent};
use tracing::{debug, info};

use crate::app::MAIN_WINDOW_LABEL;
use crate::commands::BRIDGE_SCRIPT;
use crate::error::{LauncherError, Result};
use crate::shutdown::{ExitReason, Shutdown};

pub use fullscreen::{FullscreenState, NativeWindow};

/// What a window is opened with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTarget {
    pub title: String,
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Window events the launcher reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSignal {
    Resized,
    Destroyed,
    Other,
}

impl WindowSignal {
    pub fn from_event(event: &WindowEvent) -> Self {
        match event {
            WindowEvent::Resized(_) => WindowSignal::Resized,
            WindowEvent::Destroyed => WindowSignal::Destroyed,
            _ => WindowSignal::Other,
        }
    }
}

/// Opens windows and keeps their fullscreen state, keyed by window label
pub struct WindowController {
    fullscreen: DashMap<String, FullscreenState>,
    devtools: bool,
}

impl WindowController {
    pub fn new(devtools: bool) -> Self {
        Self {
            fullscreen: DashMap::new(),
            devtools,
        }
    }

    /// Create the centered main window pointed at `target.url` with the
    /// bridge installed, and capture its original style
    pub fn open<R: Runtime, M: Manager<R>>(&self, manager: &M, target: &WindowTarget) -> Result<WebviewWindow<R>> {
        let url = target
            .url
            .parse()
            .map_err(|e| LauncherError::Window(format!("invalid url {:?}: {}", target.url, e)))?;

        let window = WebviewWindowBuilder::new(manager, MAIN_WINDOW_LABEL, WebviewUrl::External(url))
            .title(&target.title)
            .inner_size(target.width as f64, target.height as f64)
            .center()
            .initialization_script(BRIDGE_SCRIPT)
            .devtools(self.devtools)
            .build()?;

        #[cfg(debug_assertions)]
        {
            if self.devtools {
                window.open_devtools();
            }
        }

        self.register(window.label(), &window)?;
        info!(
            "Opened window {:?} ({}x{}) at {}",
            target.title, target.width, target.height, target.url
        );
        Ok(window)
    }

    pub fn register<W: NativeWindow + ?Sized>(&self, label: &str, window: &W) -> Result<()> {
        let state = FullscreenState::capture(window)?;
        self.fullscreen.insert(label.to_string(), state);
        Ok(())
    }

    /// Flip fullscreen on the labelled window, capturing its style first if it
    /// was never registered
    pub fn toggle_fullscreen<W: NativeWindow + ?Sized>(&self, label: &str, window: &W) -> Result<bool> {
        if !self.fullscreen.contains_key(label) {
            self.register(label, window)?;
        }
        let mut state = self
            .fullscreen
            .get_mut(label)
            .ok_or_else(|| LauncherError::Window(format!("window {:?} is not tracked", label)))?;
        let fullscreen = state.toggle(window)?;
        debug!("Window {:?} fullscreen={}", label, fullscreen);
        Ok(fullscreen)
    }

    pub fn is_fullscreen(&self, label: &str) -> bool {
        self.fullscreen
            .get(label)
            .map(|state| state.is_fullscreen())
            .unwrap_or(false)
    }

    /// React to a window signal. A destroyed window takes the whole process down
    pub fn handle_signal(&self, label: &str, signal: WindowSignal, shutdown: &Shutdown) {
        match signal {
            WindowSignal::Destroyed => {
                self.fullscreen.remove(label);
                info!("Window {:?} destroyed", label);
                shutdown.request(ExitReason::WindowClosed);
            }
            WindowSignal::Resized => debug!("Window {:?} resized", label),
            WindowSignal::Other => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fullscreen::testing::FakeWindow;
    use super::*;
    use crate::process::ProcessGroup;
    use crate::shutdown::testing::recording_shutdown;
    use std::sync::Arc;
    use tauri::PhysicalSize;

    #[test]
    fn test_events_map_to_signals() {
        assert_eq!(
            WindowSignal::from_event(&WindowEvent::Resized(PhysicalSize::new(800, 600))),
            WindowSignal::Resized
        );
        assert_eq!(
            WindowSignal::from_event(&WindowEvent::Destroyed),
            WindowSignal::Destroyed
        );
        assert_eq!(
            WindowSignal::from_event(&WindowEvent::Focused(true)),
            WindowSignal::Other
        );
    }

    #[test]
    fn test_toggle_tracks_state_per_label() {
        let controller = WindowController::new(false);
        let window = FakeWindow::new();
        controller.register("main", &window).unwrap();

        assert!(controller.toggle_fullscreen("main", &window).unwrap());
        assert!(controller.is_fullscreen("main"));
        assert!(!controller.is_fullscreen("other"));

        assert!(!controller.toggle_fullscreen("main", &window).unwrap());
        assert!(!controller.is_fullscreen("main"));
    }

    #[test]
    fn test_toggle_unregistered_window_captures_first() {
        let controller = WindowController::new(false);
        let window = FakeWindow::new();
        let original = window.bounds.get();

        controller.toggle_fullscreen("main", &window).unwrap();
        controller.toggle_fullscreen("main", &window).unwrap();

        assert_eq!(window.bounds.get(), original);
    }

    #[test]
    fn test_destroyed_requests_clean_exit() {
        let controller = WindowController::new(false);
        let window = FakeWindow::new();
        controller.register("main", &window).unwrap();
        let (shutdown, codes) = recording_shutdown(Arc::new(ProcessGroup::create().unwrap()));

        controller.handle_signal("main", WindowSignal::Resized, &shutdown);
        assert!(codes.lock().is_empty());

        controller.handle_signal("main", WindowSignal::Destroyed, &shutdown);
        assert_eq!(*codes.lock(), vec![0]);
        assert_eq!(shutdown.reason(), Some(ExitReason::WindowClosed));
        assert!(!controller.is_fullscreen("main"));
    }
}
