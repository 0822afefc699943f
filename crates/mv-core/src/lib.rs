//! Shared primitives used across Multi Vibe Chat crates.

use core::fmt;
use std::path::Path;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Top-level error type carrying a stable dotted code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    pub code: &'static str,
    pub message: String,
}

impl AppError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

/// Identity of one live pane. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaneId(pub u64);

/// Identity of one auxiliary popup window. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PopupId(pub u64);

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pane-{}", self.0)
    }
}

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "popup-{}", self.0)
    }
}

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl SurfaceRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Splits off a strip of `height` from the top, returning `(strip, rest)`.
    pub fn split_top(&self, height: u32) -> (SurfaceRect, SurfaceRect) {
        let strip_height = height.min(self.height);
        let strip = SurfaceRect::new(self.x, self.y, self.width, strip_height);
        let rest = SurfaceRect::new(
            self.x,
            self.y.saturating_add(strip_height as i32),
            self.width,
            self.height - strip_height,
        );
        (strip, rest)
    }
}

/// What a surface is being created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRole {
    Pane(PaneId),
    Popup(PopupId),
}

/// Parameters for constructing one embedded browser surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceRequest<'a> {
    pub role: SurfaceRole,
    pub label: &'a str,
    pub url: &'a str,
    pub profile_name: &'a str,
    pub storage_path: &'a Path,
}

/// Command surface of one embedded browser instance.
///
/// Every call is fire-and-forget: the engine executes asynchronously and
/// reports back only through [`ShellEvent`]s.
pub trait WebSurface {
    fn navigate(&mut self, url: &str) -> AppResult<()>;

    fn reload(&mut self) -> AppResult<()>;

    fn evaluate_script(&mut self, source: &str) -> AppResult<()>;

    fn set_bounds(&mut self, rect: SurfaceRect) -> AppResult<()>;

    fn set_visible(&mut self, visible: bool) -> AppResult<()>;

    fn set_zoom(&mut self, factor: f64) -> AppResult<()>;

    /// Asks the page for its selected text; the answer arrives as
    /// [`ShellEvent::SelectionCaptured`].
    fn capture_selection(&mut self) -> AppResult<()>;

    fn open_devtools(&mut self) {}
}

/// Builds surfaces bound to the active profile.
pub trait SurfaceFactory {
    type Surface: WebSurface;

    fn create(&mut self, request: &SurfaceRequest<'_>) -> AppResult<Self::Surface>;
}

/// Callbacks from embedded engines, delivered onto the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellEvent {
    NavigationChanged { pane: PaneId, url: String },
    NewWindowRequested { url: String },
    PopupNavigated { popup: PopupId, url: String },
    AutoCloseTimerFired { popup: PopupId },
    SelectionCaptured { pane: PaneId, text: String },
}

#[cfg(test)]
mod tests {
    use super::AppError;
    use super::SurfaceRect;

    #[test]
    fn error_display_includes_code() {
        let error = AppError::new("profile.copy_failed", "disk full");
        assert_eq!(error.to_string(), "profile.copy_failed: disk full");
    }

    #[test]
    fn split_top_clamps_to_available_height() {
        let rect = SurfaceRect::new(10, 20, 300, 24);
        let (strip, rest) = rect.split_top(30);
        assert_eq!(strip, SurfaceRect::new(10, 20, 300, 24));
        assert!(rest.is_empty());

        let (strip, rest) = SurfaceRect::new(0, 0, 300, 200).split_top(28);
        assert_eq!(strip.height, 28);
        assert_eq!(rest, SurfaceRect::new(0, 28, 300, 172));
    }
}
