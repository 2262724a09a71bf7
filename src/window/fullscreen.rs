use tauri::{PhysicalPosition, PhysicalSize, Runtime, WebviewWindow};

use crate::error::{LauncherError, Result};

/// The parts of a window's style that fullscreen changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStyle {
    pub decorated: bool,
    pub resizable: bool,
}

impl WindowStyle {
    pub fn borderless(self) -> Self {
        Self {
            decorated: false,
            resizable: false,
        }
    }
}

/// Outer position and inner size, in physical pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Window operations fullscreen toggling needs
pub trait NativeWindow {
    fn style(&self) -> Result<WindowStyle>;
    fn set_style(&self, style: WindowStyle) -> Result<()>;
    fn bounds(&self) -> Result<Bounds>;
    fn set_bounds(&self, bounds: Bounds) -> Result<()>;
    /// Bounds of the monitor the window is currently on
    fn screen_bounds(&self) -> Result<Bounds>;
}

/// Per-window fullscreen state.
/// The style is captured once at creation and restored verbatim; the bounds
/// are captured each time fullscreen is entered
#[derive(Debug, Clone)]
pub struct FullscreenState {
    original_style: WindowStyle,
    restore_bounds: Option<Bounds>,
    fullscreen: bool,
}

impl FullscreenState {
    pub fn capture<W: NativeWindow + ?Sized>(window: &W) -> Result<Self> {
        Ok(Self {
            original_style: window.style()?,
            restore_bounds: None,
            fullscreen: false,
        })
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Flip fullscreen and return the new state
    pub fn toggle<W: NativeWindow + ?Sized>(&mut self, window: &W) -> Result<bool> {
        if self.fullscreen {
            window.set_style(self.original_style)?;
            if let Some(bounds) = self.restore_bounds.take() {
                window.set_bounds(bounds)?;
            }
            self.fullscreen = false;
        } else {
            let current = window.bounds()?;
            let screen = window.screen_bounds()?;
            window.set_style(self.original_style.borderless())?;
            window.set_bounds(screen)?;
            self.restore_bounds = Some(current);
            self.fullscreen = true;
        }
        Ok(self.fullscreen)
    }
}

impl<R: Runtime> NativeWindow for WebviewWindow<R> {
    fn style(&self) -> Result<WindowStyle> {
        Ok(WindowStyle {
            decorated: self.is_decorated()?,
            resizable: self.is_resizable()?,
        })
    }

    fn set_style(&self, style: WindowStyle) -> Result<()> {
        self.set_decorations(style.decorated)?;
        self.set_resizable(style.resizable)?;
        Ok(())
    }

    fn bounds(&self) -> Result<Bounds> {
        let position = self.outer_position()?;
        let size = self.inner_size()?;
        Ok(Bounds {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        })
    }

    fn set_bounds(&self, bounds: Bounds) -> Result<()> {
        self.set_position(PhysicalPosition::new(bounds.x, bounds.y))?;
        self.set_size(PhysicalSize::new(bounds.width, bounds.height))?;
        Ok(())
    }

    fn screen_bounds(&self) -> Result<Bounds> {
        let monitor = self
            .current_monitor()?
            .or(self.primary_monitor()?)
            .ok_or_else(|| LauncherError::Window("no monitor available".to_string()))?;
        let position = monitor.position();
        let size = monitor.size();
        Ok(Bounds {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    pub(crate) struct FakeWindow {
        pub(crate) style: Cell<WindowStyle>,
        pub(crate) bounds: Cell<Bounds>,
        pub(crate) screen: Bounds,
    }

    impl FakeWindow {
        pub(crate) fn new() -> Self {
            Self {
                style: Cell::new(WindowStyle {
                    decorated: true,
                    resizable: true,
                }),
                bounds: Cell::new(Bounds {
                    x: 448,
                    y: 156,
                    width: 1024,
                    height: 768,
                }),
                screen: Bounds {
                    x: 0,
                    y: 0,
                    width: 1920,
                    height: 1080,
                },
            }
        }
    }

    impl NativeWindow for FakeWindow {
        fn style(&self) -> Result<WindowStyle> {
            Ok(self.style.get())
        }
        fn set_style(&self, style: WindowStyle) -> Result<()> {
            self.style.set(style);
            Ok(())
        }
        fn bounds(&self) -> Result<Bounds> {
            Ok(self.bounds.get())
        }
        fn set_bounds(&self, bounds: Bounds) -> Result<()> {
            self.bounds.set(bounds);
            Ok(())
        }
        fn screen_bounds(&self) -> Result<Bounds> {
            Ok(self.screen)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeWindow;
    use super::*;

    #[test]
    fn test_enter_fullscreen_goes_borderless_and_covers_screen() {
        let window = FakeWindow::new();
        let mut state = FullscreenState::capture(&window).unwrap();

        assert!(state.toggle(&window).unwrap());
        assert!(state.is_fullscreen());
        assert!(!window.style.get().decorated);
        assert_eq!(window.bounds.get(), window.screen);
    }

    #[test]
    fn test_toggle_twice_restores_original_style_and_bounds() {
        let window = FakeWindow::new();
        let original_style = window.style.get();
        let original_bounds = window.bounds.get();
        let mut state = FullscreenState::capture(&window).unwrap();

        state.toggle(&window).unwrap();
        assert!(!state.toggle(&window).unwrap());

        assert_eq!(window.style.get(), original_style);
        assert_eq!(window.bounds.get(), original_bounds);
    }

    #[test]
    fn test_restore_uses_style_captured_at_creation() {
        let window = FakeWindow::new();
        let mut state = FullscreenState::capture(&window).unwrap();

        // Something else changes the style while fullscreen
        state.toggle(&window).unwrap();
        window.style.set(WindowStyle {
            decorated: true,
            resizable: false,
        });
        state.toggle(&window).unwrap();

        assert_eq!(
            window.style.get(),
            WindowStyle {
                decorated: true,
                resizable: true
            }
        );
    }

    #[test]
    fn test_restore_returns_to_position_before_fullscreen() {
        let window = FakeWindow::new();
        let mut state = FullscreenState::capture(&window).unwrap();
        let moved = Bounds {
            x: 10,
            y: 20,
            width: 800,
            height: 600,
        };
        window.bounds.set(moved);

        state.toggle(&window).unwrap();
        state.toggle(&window).unwrap();

        assert_eq!(window.bounds.get(), moved);
    }
}
