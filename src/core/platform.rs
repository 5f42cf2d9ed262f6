//! Platform window service.
//!
//! The tab manager never creates native windows itself; it asks the platform
//! through this trait. A window under the pointer is reported as a bare
//! handle; whether it hosts tabs is answered by the registry.

use bitflags::bitflags;

use super::bitmap::Bitmap;
use super::geometry::{Point, Rect, Size};
use super::ids::WindowHandle;

bitflags! {
    /// Window style bits
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct WindowStyle: u8 {
        /// Stays above every non-topmost window
        const TOPMOST           = 0b0001;
        /// Never reported by hit testing; pointer input falls through
        const INPUT_TRANSPARENT = 0b0010;
        /// Never takes activation or appears in task switchers
        const TOOL              = 0b0100;
    }
}

bitflags! {
    /// Flags for `set_window_position`
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct PositionFlags: u8 {
        /// Keep the current size
        const NO_SIZE       = 0b0001;
        /// Keep the current position
        const NO_MOVE       = 0b0010;
        /// Do not give the window activation
        const NO_ACTIVATE   = 0b0100;
        /// Raise the window to the top of its band
        const BRING_FORWARD = 0b1000;
    }
}

/// Show modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowMode {
    /// Show and activate
    Show,
    /// Show without taking activation
    ShowNoActivate,
    Hide,
}

/// Window creation parameters
#[derive(Debug, Clone)]
pub struct WindowParams {
    pub title: String,
    pub rect: Rect,
    pub style: WindowStyle,
}

impl WindowParams {
    /// Parameters for an ordinary top-level host window
    pub fn host(title: impl Into<String>, rect: Rect) -> Self {
        Self {
            title: title.into(),
            rect,
            style: WindowStyle::empty(),
        }
    }

    /// Parameters for the floating drag preview
    pub fn preview(rect: Rect) -> Self {
        Self {
            title: String::new(),
            rect,
            style: WindowStyle::TOPMOST | WindowStyle::INPUT_TRANSPARENT | WindowStyle::TOOL,
        }
    }
}

/// Native window operations the tab manager relies on
pub trait PlatformWindowService {
    /// Create a hidden window; `None` when the platform refuses
    fn create_window(&mut self, params: &WindowParams) -> Option<WindowHandle>;

    fn destroy_window(&mut self, handle: WindowHandle);

    fn show_window(&mut self, handle: WindowHandle, mode: ShowMode);

    fn set_window_position(&mut self, handle: WindowHandle, rect: Rect, flags: PositionFlags);

    fn window_rect(&self, handle: WindowHandle) -> Option<Rect>;

    fn set_title(&mut self, handle: WindowHandle, title: &str);

    /// Replace the image a preview window paints
    fn set_preview_image(&mut self, handle: WindowHandle, image: Option<Bitmap>);

    fn cursor_position(&self) -> Point;

    /// Topmost visible, hit-testable window containing `point`, skipping
    /// everything in `excluding`
    fn window_under_point(&self, point: Point, excluding: &[WindowHandle]) -> Option<WindowHandle>;

    fn screen_size(&self) -> Size;

    /// Ask the run loop to exit
    fn request_quit(&mut self);
}
