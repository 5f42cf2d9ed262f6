//! In-process window service.
//!
//! Windows are rectangles in a z-ordered stack. Topmost windows always stack
//! above the rest; input-transparent windows are skipped by hit testing. The
//! desktop is a cheap clone over shared state so the front-end can read what
//! the manager did.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::core::platform::{PlatformWindowService, PositionFlags, ShowMode, WindowParams, WindowStyle};
use crate::core::{Bitmap, Point, Rect, Size, WindowHandle};

/// A window as the desktop sees it
#[derive(Debug, Clone)]
pub struct DesktopWindow {
    pub handle: WindowHandle,
    pub title: String,
    pub rect: Rect,
    pub style: WindowStyle,
    pub visible: bool,
    pub preview: Option<Bitmap>,
}

impl DesktopWindow {
    pub fn is_topmost(&self) -> bool {
        self.style.contains(WindowStyle::TOPMOST)
    }

    pub fn is_hit_testable(&self) -> bool {
        self.visible && !self.style.contains(WindowStyle::INPUT_TRANSPARENT)
    }
}

#[derive(Debug)]
struct DesktopState {
    windows: HashMap<WindowHandle, DesktopWindow>,
    /// Bottom to top, ignoring the topmost band
    z_order: Vec<WindowHandle>,
    active: Option<WindowHandle>,
    next_handle: u64,
    cursor: Point,
    screen: Size,
    quit: bool,
    /// Refuse this many upcoming window creations
    refuse_creations: usize,
}

/// Shared handle to the desktop
#[derive(Debug, Clone)]
pub struct VirtualDesktop {
    state: Rc<RefCell<DesktopState>>,
}

impl VirtualDesktop {
    pub fn new(screen: Size) -> Self {
        Self {
            state: Rc::new(RefCell::new(DesktopState {
                windows: HashMap::new(),
                z_order: Vec::new(),
                active: None,
                next_handle: 0,
                cursor: Point::default(),
                screen,
                quit: false,
                refuse_creations: 0,
            })),
        }
    }

    pub fn resize(&self, screen: Size) {
        self.state.borrow_mut().screen = screen;
    }

    pub fn set_cursor(&self, point: Point) {
        self.state.borrow_mut().cursor = point;
    }

    pub fn quit_requested(&self) -> bool {
        self.state.borrow().quit
    }

    /// Make the next `count` calls to `create_window` fail
    pub fn refuse_creations(&self, count: usize) {
        self.state.borrow_mut().refuse_creations = count;
    }

    pub fn active_window(&self) -> Option<WindowHandle> {
        self.state.borrow().active
    }

    pub fn window(&self, handle: WindowHandle) -> Option<DesktopWindow> {
        self.state.borrow().windows.get(&handle).cloned()
    }

    pub fn window_count(&self) -> usize {
        self.state.borrow().windows.len()
    }

    /// Every window in paint order, bottom first
    pub fn stacking(&self) -> Vec<DesktopWindow> {
        let state = self.state.borrow();
        state
            .stacking()
            .into_iter()
            .filter_map(|handle| state.windows.get(&handle).cloned())
            .collect()
    }

    /// Visible windows in paint order
    pub fn visible_windows(&self) -> Vec<DesktopWindow> {
        self.stacking().into_iter().filter(|window| window.visible).collect()
    }
}

impl DesktopState {
    fn stacking(&self) -> Vec<WindowHandle> {
        let is_topmost = |handle: &WindowHandle| self.windows.get(handle).map_or(false, |w| w.is_topmost());
        let (top, normal): (Vec<WindowHandle>, Vec<WindowHandle>) =
            self.z_order.iter().copied().partition(|h| is_topmost(h));
        normal.into_iter().chain(top).collect()
    }

    fn raise(&mut self, handle: WindowHandle) {
        if let Some(pos) = self.z_order.iter().position(|h| *h == handle) {
            self.z_order.remove(pos);
            self.z_order.push(handle);
        }
    }

    /// Hand activation to the highest visible normal window
    fn reassign_active(&mut self) {
        self.active = self
            .stacking()
            .into_iter()
            .rev()
            .find(|handle| {
                self.windows
                    .get(handle)
                    .map_or(false, |w| w.visible && !w.style.contains(WindowStyle::TOOL))
            });
    }
}

impl PlatformWindowService for VirtualDesktop {
    fn create_window(&mut self, params: &WindowParams) -> Option<WindowHandle> {
        let mut state = self.state.borrow_mut();
        if state.refuse_creations > 0 {
            state.refuse_creations -= 1;
            warn!(title = %params.title, "Window creation refused");
            return None;
        }
        state.next_handle += 1;
        let handle = WindowHandle(state.next_handle);
        state.windows.insert(
            handle,
            DesktopWindow {
                handle,
                title: params.title.clone(),
                rect: params.rect,
                style: params.style,
                visible: false,
                preview: None,
            },
        );
        state.z_order.push(handle);
        debug!(window = %handle, rect = ?params.rect, "Created window");
        Some(handle)
    }

    fn destroy_window(&mut self, handle: WindowHandle) {
        let mut state = self.state.borrow_mut();
        if state.windows.remove(&handle).is_none() {
            return;
        }
        state.z_order.retain(|h| *h != handle);
        if state.active == Some(handle) {
            state.reassign_active();
        }
        debug!(window = %handle, "Destroyed window");
    }

    fn show_window(&mut self, handle: WindowHandle, mode: ShowMode) {
        let mut state = self.state.borrow_mut();
        let Some(window) = state.windows.get_mut(&handle) else {
            return;
        };
        match mode {
            ShowMode::Show => {
                window.visible = true;
                let tool = window.style.contains(WindowStyle::TOOL);
                state.raise(handle);
                if !tool {
                    state.active = Some(handle);
                }
            }
            ShowMode::ShowNoActivate => {
                window.visible = true;
                state.raise(handle);
            }
            ShowMode::Hide => {
                window.visible = false;
                if state.active == Some(handle) {
                    state.reassign_active();
                }
            }
        }
    }

    fn set_window_position(&mut self, handle: WindowHandle, rect: Rect, flags: PositionFlags) {
        let mut state = self.state.borrow_mut();
        let Some(window) = state.windows.get_mut(&handle) else {
            return;
        };
        if !flags.contains(PositionFlags::NO_MOVE) {
            window.rect.x = rect.x;
            window.rect.y = rect.y;
        }
        if !flags.contains(PositionFlags::NO_SIZE) {
            window.rect.width = rect.width;
            window.rect.height = rect.height;
        }
        if flags.contains(PositionFlags::BRING_FORWARD) {
            state.raise(handle);
            if !flags.contains(PositionFlags::NO_ACTIVATE) {
                state.active = Some(handle);
            }
        }
    }

    fn window_rect(&self, handle: WindowHandle) -> Option<Rect> {
        self.state.borrow().windows.get(&handle).map(|window| window.rect)
    }

    fn set_title(&mut self, handle: WindowHandle, title: &str) {
        if let Some(window) = self.state.borrow_mut().windows.get_mut(&handle) {
            window.title = title.to_string();
        }
    }

    fn set_preview_image(&mut self, handle: WindowHandle, image: Option<Bitmap>) {
        if let Some(window) = self.state.borrow_mut().windows.get_mut(&handle) {
            window.preview = image;
        }
    }

    fn cursor_position(&self) -> Point {
        self.state.borrow().cursor
    }

    fn window_under_point(&self, point: Point, excluding: &[WindowHandle]) -> Option<WindowHandle> {
        let state = self.state.borrow();
        state.stacking().into_iter().rev().find(|handle| {
            !excluding.contains(handle)
                && state
                    .windows
                    .get(handle)
                    .map_or(false, |w| w.is_hit_testable() && w.rect.contains(point))
        })
    }

    fn screen_size(&self) -> Size {
        self.state.borrow().screen
    }

    fn request_quit(&mut self) {
        self.state.borrow_mut().quit = true;
    }
}
