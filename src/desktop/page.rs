//! Page surface - a small in-process content engine
//!
//! Each page keeps a back/forward list and "loads" a url by reporting the
//! events a real engine would: url, loading, title, favicon. Events leave
//! through the tab's sink and reach the window only after the UI thread
//! drains them, just like callbacks from an engine thread.

use tracing::debug;

use crate::core::bitmap::{self, Bitmap};
use crate::core::surface::{ContentSurface, RenderMode, SurfaceEvent, SurfaceEventSink, SurfaceFactory};
use crate::core::{Result, Size, TabId, WindowHandle};

/// Maximum number of back/forward entries per page
const HISTORY_LIMIT: usize = 50;

/// Favicon edge in pixels
const FAVICON_SIZE: u32 = 16;

/// Back/forward list
#[derive(Debug, Clone, Default)]
pub struct NavHistory {
    entries: Vec<String>,
    current: Option<usize>,
}

impl NavHistory {
    pub fn current(&self) -> Option<&str> {
        self.current.and_then(|i| self.entries.get(i)).map(String::as_str)
    }

    /// Visit `url`, dropping any forward entries
    pub fn push(&mut self, url: &str) {
        // Reloading the current entry is not a new visit
        if self.current() == Some(url) {
            return;
        }
        let keep = self.current.map_or(0, |i| i + 1);
        self.entries.truncate(keep);
        self.entries.push(url.to_string());
        while self.entries.len() > HISTORY_LIMIT {
            self.entries.remove(0);
        }
        self.current = Some(self.entries.len() - 1);
    }

    pub fn can_go_back(&self) -> bool {
        self.current.map_or(false, |i| i > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        self.current.map_or(false, |i| i + 1 < self.entries.len())
    }

    pub fn back(&mut self) -> Option<&str> {
        if !self.can_go_back() {
            return None;
        }
        self.current = self.current.map(|i| i - 1);
        self.current()
    }

    pub fn forward(&mut self) -> Option<&str> {
        if !self.can_go_forward() {
            return None;
        }
        self.current = self.current.map(|i| i + 1);
        self.current()
    }
}

/// Title a page reports for `url`: the host part, or the url itself
pub fn title_for(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    if host.is_empty() {
        url.to_string()
    } else {
        host.to_string()
    }
}

/// Stable colour for a url's host
pub fn color_for(url: &str) -> [u8; 4] {
    let hash = title_for(url)
        .bytes()
        .fold(0x811c_9dc5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
    let [r, g, b, _] = hash.to_le_bytes();
    // Keep colours away from black so text stays readable
    [r | 0x40, g | 0x40, b | 0x40, u8::MAX]
}

/// One page
pub struct PageSurface {
    sink: SurfaceEventSink,
    history: NavHistory,
    loading: bool,
    visible: bool,
    parent: Option<WindowHandle>,
    mode: RenderMode,
    frame: Size,
    shut_down: bool,
}

impl PageSurface {
    pub fn new(sink: SurfaceEventSink, mode: RenderMode, frame: Size) -> Self {
        Self {
            sink,
            history: NavHistory::default(),
            loading: false,
            visible: false,
            parent: None,
            mode,
            frame,
            shut_down: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn parent(&self) -> Option<WindowHandle> {
        self.parent
    }

    fn emit(&self, event: SurfaceEvent) {
        if !self.shut_down {
            self.sink.emit(event);
        }
    }

    fn emit_loading(&self) {
        self.emit(SurfaceEvent::LoadingStateChanged {
            is_loading: self.loading,
            can_go_back: self.history.can_go_back(),
            can_go_forward: self.history.can_go_forward(),
        });
    }

    /// Report a full load of the current entry
    fn load_current(&mut self) {
        let Some(url) = self.history.current().map(str::to_string) else {
            return;
        };
        debug!(tab = %self.sink.tab(), url = %url, "Page load");
        self.loading = true;
        self.emit(SurfaceEvent::UrlChanged(url.clone()));
        self.emit_loading();
        self.emit(SurfaceEvent::TitleChanged(title_for(&url)));
        self.loading = false;
        self.emit_loading();
        self.request_favicon();
    }
}

impl ContentSurface for PageSurface {
    fn navigate(&mut self, url: &str) {
        if self.shut_down || url.is_empty() {
            return;
        }
        self.history.push(url);
        self.load_current();
    }

    fn current_url(&self) -> String {
        self.history.current().unwrap_or_default().to_string()
    }

    fn go_back(&mut self) {
        if self.history.back().is_some() {
            self.load_current();
        }
    }

    fn go_forward(&mut self) {
        if self.history.forward().is_some() {
            self.load_current();
        }
    }

    fn refresh(&mut self) {
        self.load_current();
    }

    fn stop(&mut self) {
        if self.loading {
            self.loading = false;
            self.emit_loading();
        }
    }

    fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    fn render_mode(&self) -> RenderMode {
        self.mode
    }

    fn frame_size(&self) -> Size {
        self.frame
    }

    /// A header band over a body in the page colour
    fn capture_snapshot(&mut self, width: u32, height: u32) -> Option<Bitmap> {
        if self.shut_down || width == 0 || height == 0 {
            return None;
        }
        let body = color_for(&self.current_url());
        let header = [body[0] / 2, body[1] / 2, body[2] / 2, u8::MAX];
        let band = (height / 8).max(1);
        let mut frame = bitmap::solid(width, height, body);
        for (_, y, pixel) in frame.enumerate_pixels_mut() {
            if y < band {
                pixel.0 = header;
            }
        }
        Some(frame)
    }

    fn request_favicon(&mut self) {
        let url = self.current_url();
        if url.is_empty() {
            return;
        }
        let icon = bitmap::solid(FAVICON_SIZE, FAVICON_SIZE, color_for(&url));
        self.emit(SurfaceEvent::FaviconReady {
            width: FAVICON_SIZE,
            height: FAVICON_SIZE,
            pixels: icon.into_raw(),
        });
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn reparent(&mut self, window: WindowHandle) -> bool {
        if self.shut_down {
            return false;
        }
        self.parent = Some(window);
        true
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
        self.visible = false;
        self.parent = None;
    }
}

/// Creates [`PageSurface`]s
#[derive(Debug, Clone, Copy)]
pub struct PageFactory {
    mode: RenderMode,
    frame: Size,
}

impl PageFactory {
    pub fn new(mode: RenderMode, frame: Size) -> Self {
        Self { mode, frame }
    }
}

impl SurfaceFactory for PageFactory {
    fn create(&mut self, tab: &TabId, sink: SurfaceEventSink) -> Result<Box<dyn ContentSurface>> {
        debug!(tab = %tab, mode = ?self.mode, "Creating page surface");
        Ok(Box::new(PageSurface::new(sink, self.mode, self.frame)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn recording_page() -> (PageSurface, mpsc::Receiver<SurfaceEvent>) {
        let (tx, rx) = mpsc::channel();
        let sink = SurfaceEventSink::new(TabId::from("t"), move |_, event| {
            let _ = tx.send(event);
        });
        (PageSurface::new(sink, RenderMode::Offscreen, Size::new(640, 480)), rx)
    }

    #[test]
    fn test_history_back_forward() {
        let mut history = NavHistory::default();
        assert!(!history.can_go_back());
        history.push("a");
        history.push("b");
        history.push("b");
        history.push("c");
        assert_eq!(history.back(), Some("b"));
        assert_eq!(history.back(), Some("a"));
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), Some("b"));

        // A new visit drops the forward entries
        history.push("d");
        assert!(!history.can_go_forward());
        assert_eq!(history.back(), Some("b"));
    }

    #[test]
    fn test_history_limit() {
        let mut history = NavHistory::default();
        for i in 0..(HISTORY_LIMIT + 10) {
            history.push(&format!("page{}", i));
        }
        assert_eq!(history.entries.len(), HISTORY_LIMIT);
        assert_eq!(history.current(), Some(format!("page{}", HISTORY_LIMIT + 9).as_str()));
    }

    #[test]
    fn test_title_for() {
        assert_eq!(title_for("https://example.com/a/b?q=1"), "example.com");
        assert_eq!(title_for("about:blank"), "about:blank");
        assert_eq!(title_for("file:///tmp/x"), "file:///tmp/x");
    }

    #[test]
    fn test_navigate_reports_load() {
        let (mut page, events) = recording_page();
        page.navigate("https://example.com/");

        let events: Vec<SurfaceEvent> = events.try_iter().collect();
        assert_eq!(events[0], SurfaceEvent::UrlChanged("https://example.com/".into()));
        assert!(events.contains(&SurfaceEvent::TitleChanged("example.com".into())));
        assert!(matches!(
            events.last(),
            Some(SurfaceEvent::FaviconReady { width: 16, height: 16, .. })
        ));
        assert!(events.contains(&SurfaceEvent::LoadingStateChanged {
            is_loading: false,
            can_go_back: false,
            can_go_forward: false,
        }));
    }

    #[test]
    fn test_shutdown_silences_events() {
        let (mut page, events) = recording_page();
        assert!(page.reparent(WindowHandle(3)));
        page.shutdown();
        page.navigate("https://example.com/");

        assert_eq!(events.try_iter().count(), 0);
        assert!(!page.reparent(WindowHandle(4)));
        assert!(page.capture_snapshot(10, 10).is_none());
    }

    #[test]
    fn test_snapshot_has_header_band() {
        let (mut page, _events) = recording_page();
        page.navigate("https://example.com/");
        let frame = page.capture_snapshot(80, 80).unwrap();
        let body = color_for("https://example.com/");

        assert_eq!(frame.get_pixel(40, 40).0, body);
        assert_ne!(frame.get_pixel(40, 0).0, body);
    }
}
