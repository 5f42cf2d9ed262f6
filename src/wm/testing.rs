//! Test doubles shared by the window manager tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::config::Config;
use crate::core::bitmap::{self, Bitmap};
use crate::core::platform::{PlatformWindowService, PositionFlags};
use crate::core::surface::{ContentSurface, RenderMode, SurfaceEventSink, SurfaceFactory};
use crate::core::{HostId, Point, Rect, Result, Size, TabError, TabId, WindowHandle};
use crate::desktop::VirtualDesktop;
use crate::wm::context::TabContext;
use crate::wm::services::Services;

/// What a stub surface was asked to do
#[derive(Debug, Default)]
pub struct SurfaceProbe {
    pub navigations: Vec<String>,
    pub calls: Vec<&'static str>,
    pub visible: bool,
    pub favicon_requests: usize,
    pub parent: Option<WindowHandle>,
    pub shut_down: bool,
    pub refuse_reparent: bool,
}

/// Scriptable content surface
pub struct StubSurface {
    probe: Rc<RefCell<SurfaceProbe>>,
    frame: Size,
    color: [u8; 4],
    mode: RenderMode,
    url: String,
    pub fail_capture: bool,
}

impl StubSurface {
    pub fn new() -> Self {
        Self {
            probe: Rc::default(),
            frame: Size::new(640, 480),
            color: [128, 128, 128, 255],
            mode: RenderMode::Offscreen,
            url: String::new(),
            fail_capture: false,
        }
    }

    pub fn with_frame(mut self, frame: Size, color: [u8; 4]) -> Self {
        self.frame = frame;
        self.color = color;
        self
    }

    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn probe(&self) -> Rc<RefCell<SurfaceProbe>> {
        self.probe.clone()
    }
}

impl ContentSurface for StubSurface {
    fn navigate(&mut self, url: &str) {
        self.url = url.to_string();
        self.probe.borrow_mut().navigations.push(url.to_string());
    }

    fn current_url(&self) -> String {
        self.url.clone()
    }

    fn go_back(&mut self) {
        self.probe.borrow_mut().calls.push("back");
    }

    fn go_forward(&mut self) {
        self.probe.borrow_mut().calls.push("forward");
    }

    fn refresh(&mut self) {
        self.probe.borrow_mut().calls.push("refresh");
    }

    fn stop(&mut self) {
        self.probe.borrow_mut().calls.push("stop");
    }

    fn can_go_back(&self) -> bool {
        false
    }

    fn can_go_forward(&self) -> bool {
        false
    }

    fn render_mode(&self) -> RenderMode {
        self.mode
    }

    fn frame_size(&self) -> Size {
        self.frame
    }

    fn capture_snapshot(&mut self, width: u32, height: u32) -> Option<Bitmap> {
        if self.fail_capture || width == 0 || height == 0 {
            return None;
        }
        Some(bitmap::solid(width, height, self.color))
    }

    fn request_favicon(&mut self) {
        self.probe.borrow_mut().favicon_requests += 1;
    }

    fn set_visible(&mut self, visible: bool) {
        self.probe.borrow_mut().visible = visible;
    }

    fn reparent(&mut self, window: WindowHandle) -> bool {
        let mut probe = self.probe.borrow_mut();
        if probe.refuse_reparent {
            return false;
        }
        probe.parent = Some(window);
        true
    }

    fn shutdown(&mut self) {
        let mut probe = self.probe.borrow_mut();
        probe.shut_down = true;
        probe.visible = false;
    }
}

type Probes = Rc<RefCell<HashMap<TabId, Rc<RefCell<SurfaceProbe>>>>>;

/// Factory handing out stub surfaces and keeping their probes
struct StubFactory {
    probes: Probes,
    fail: Rc<Cell<bool>>,
}

impl SurfaceFactory for StubFactory {
    fn create(&mut self, tab: &TabId, _sink: SurfaceEventSink) -> Result<Box<dyn ContentSurface>> {
        if self.fail.get() {
            return Err(TabError::SurfaceCreation {
                tab: tab.clone(),
                reason: "refused by test".to_string(),
            });
        }
        let surface = StubSurface::new();
        self.probes.borrow_mut().insert(tab.clone(), surface.probe());
        Ok(Box::new(surface))
    }
}

/// Services over `desktop` with a stub surface factory
pub fn services(desktop: &VirtualDesktop) -> Services {
    let factory = StubFactory {
        probes: Rc::default(),
        fail: Rc::new(Cell::new(false)),
    };
    Services::new(Box::new(desktop.clone()), Box::new(factory), Config::default())
}

/// A context over a virtual desktop the test can inspect
pub struct Fixture {
    pub ctx: TabContext,
    pub desktop: VirtualDesktop,
    probes: Probes,
    fail: Rc<Cell<bool>>,
}

pub fn fixture() -> Fixture {
    let desktop = VirtualDesktop::new(Size::new(160, 48));
    let probes: Probes = Rc::default();
    let fail = Rc::new(Cell::new(false));
    let factory = StubFactory {
        probes: probes.clone(),
        fail: fail.clone(),
    };
    let ctx = TabContext::new(Box::new(desktop.clone()), Box::new(factory), Config::default());
    Fixture {
        ctx,
        desktop,
        probes,
        fail,
    }
}

impl Fixture {
    pub fn probe(&self, tab: &str) -> Rc<RefCell<SurfaceProbe>> {
        self.probes.borrow()[&TabId::from(tab)].clone()
    }

    pub fn sink(&self, tab: &str) -> SurfaceEventSink {
        self.ctx.event_sink(&TabId::from(tab))
    }

    pub fn factory_fails(&self, fail: bool) {
        self.fail.set(fail);
    }

    pub fn window_of(&self, host: HostId) -> WindowHandle {
        self.ctx.registry().host(host).unwrap().handle()
    }

    /// Move a host window to `(x, y)`
    pub fn place(&self, host: HostId, x: i32, y: i32) {
        let mut desktop = self.desktop.clone();
        desktop.set_window_position(self.window_of(host), Rect::new(x, y, 0, 0), PositionFlags::NO_SIZE);
    }

    /// A point inside `tab`'s strip entry
    pub fn entry_point(&self, tab: &str) -> Point {
        let tab = TabId::from(tab);
        let host = self.ctx.registry().locate(&tab).unwrap();
        let window = self.ctx.registry().host(host).unwrap();
        let rect = self.desktop.window_rect(window.handle()).unwrap();
        let (_, entry) = window
            .strip_layout(rect)
            .into_iter()
            .find(|(id, _)| *id == tab)
            .unwrap();
        Point::new(entry.x + entry.width as i32 / 2, entry.y)
    }
}
