//! Content surface interface.
//!
//! A content surface is the external engine rendering one tab (navigation,
//! painting, network). The tab manager only drives it through this trait and
//! listens to the events it reports through its [`SurfaceEventSink`].

use super::bitmap::Bitmap;
use super::error::Result;
use super::geometry::Size;
use super::ids::{TabId, WindowHandle};

/// How a surface produces pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Renders into an offscreen buffer the host composites
    #[default]
    Offscreen,
    /// Owns a native child window inside the host
    NativeChild,
}

/// Events a surface reports asynchronously
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    TitleChanged(String),
    UrlChanged(String),
    LoadingStateChanged {
        is_loading: bool,
        can_go_back: bool,
        can_go_forward: bool,
    },
    FaviconReady {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

/// Where a surface sends its events. Delivery may happen on any thread; the
/// receiving side marshals onto the UI thread.
pub struct SurfaceEventSink {
    tab: TabId,
    deliver: Box<dyn Fn(TabId, SurfaceEvent) + Send>,
}

impl SurfaceEventSink {
    pub fn new(tab: TabId, deliver: impl Fn(TabId, SurfaceEvent) + Send + 'static) -> Self {
        Self {
            tab,
            deliver: Box::new(deliver),
        }
    }

    /// Sink that throws everything away
    pub fn discard(tab: TabId) -> Self {
        Self::new(tab, |_, _| {})
    }

    pub fn tab(&self) -> &TabId {
        &self.tab
    }

    pub fn emit(&self, event: SurfaceEvent) {
        (self.deliver)(self.tab.clone(), event);
    }
}

/// One hosted content engine instance
pub trait ContentSurface {
    fn navigate(&mut self, url: &str);

    fn current_url(&self) -> String;

    fn go_back(&mut self);
    fn go_forward(&mut self);
    fn refresh(&mut self);
    fn stop(&mut self);

    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;

    fn render_mode(&self) -> RenderMode;

    /// Size of the frame the surface currently shows
    fn frame_size(&self) -> Size;

    /// Capture the current frame rendered at `width`x`height`
    fn capture_snapshot(&mut self, width: u32, height: u32) -> Option<Bitmap>;

    /// Ask for the favicon again; it arrives as `FaviconReady`
    fn request_favicon(&mut self);

    fn set_visible(&mut self, visible: bool);

    /// Move the surface into another window. False when it cannot follow.
    fn reparent(&mut self, window: WindowHandle) -> bool;

    /// Tear the surface down; no events are delivered afterwards
    fn shutdown(&mut self);
}

/// Creates surfaces for new tabs
pub trait SurfaceFactory {
    fn create(&mut self, tab: &TabId, sink: SurfaceEventSink) -> Result<Box<dyn ContentSurface>>;
}
