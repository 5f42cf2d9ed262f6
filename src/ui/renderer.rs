//! Desktop renderer for the terminal front-end.
//!
//! Every visible window of the virtual desktop is drawn as a box, bottom to
//! top: host windows with their tab strip, address line and a text view of
//! the active page; the drag preview as a coloured box carrying the dragged
//! tab's label. The last terminal row is the status bar.
//!
//! # Rendering Architecture
//!
//! ```text
//! compose()      → desktop, windows, status bar into a Canvas
//!     ↓
//! begin_frame()  → hide cursor, disable autowrap, start sync
//!     ↓
//! Canvas::flush  → row by row
//!     ↓
//! end_frame()    → enable autowrap, end sync, flush
//! ```

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{self, Clear, ClearType},
};

use super::canvas::{Canvas, Style};
use crate::config::{Color, ColorScheme};
use crate::core::bitmap;
use crate::core::platform::WindowStyle;
use crate::core::Rect;
use crate::desktop::{DesktopWindow, VirtualDesktop};
use crate::wm::{TabContext, TabHostWindow};

/// Begin a render frame (synchronized update, hide cursor, disable autowrap)
fn begin_frame<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\x1b[?2026h")?; // Begin synchronized update
    write!(out, "\x1b[?7l")?; // Disable autowrap
    execute!(out, Hide)?;
    Ok(())
}

/// End a render frame (enable autowrap, end synchronized update, flush)
fn end_frame<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\x1b[?7h")?;
    write!(out, "\x1b[?2026l")?;
    out.flush()?;
    Ok(())
}

/// Execute a render operation with frame guards, ensuring cleanup on error
fn with_frame<W: Write, F, R>(out: &mut W, f: F) -> io::Result<R>
where
    F: FnOnce(&mut W) -> io::Result<R>,
{
    begin_frame(out)?;
    let result = f(out);
    // Always end frame, even on error
    let _ = end_frame(out);
    result
}

/// Border characters
struct BorderChars {
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    horizontal: char,
    vertical: char,
}

impl BorderChars {
    fn single() -> Self {
        Self {
            top_left: '┌',
            top_right: '┐',
            bottom_left: '└',
            bottom_right: '┘',
            horizontal: '─',
            vertical: '│',
        }
    }

    fn heavy() -> Self {
        Self {
            top_left: '┏',
            top_right: '┓',
            bottom_left: '┗',
            bottom_right: '┛',
            horizontal: '━',
            vertical: '┃',
        }
    }
}

const SHORTCUTS: &str = "t:new w:close W:window m:merge g:go [/]:nav r:reload y:copy q:quit";

/// Renders the virtual desktop and the tab manager state
pub struct DesktopRenderer {
    initialized: bool,
    pub color_scheme: ColorScheme,
}

impl DesktopRenderer {
    pub fn with_color_scheme(color_scheme: ColorScheme) -> Self {
        Self {
            initialized: false,
            color_scheme,
        }
    }

    /// Initialize the terminal
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            crossterm::event::EnableMouseCapture,
            crossterm::event::EnableFocusChange,
            Hide,
            Clear(ClearType::All)
        )?;
        stdout.flush()?;

        self.initialized = true;
        Ok(())
    }

    /// Cleanup
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }

        let mut stdout = io::stdout();

        // Restore terminal state (in case of abnormal exit)
        write!(stdout, "\x1b[?7h")?;
        write!(stdout, "\x1b[?2026l")?;
        stdout.flush()?;

        execute!(
            stdout,
            Show,
            crossterm::event::DisableFocusChange,
            crossterm::event::DisableMouseCapture,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()?;
        self.initialized = false;
        Ok(())
    }

    /// Get terminal size
    pub fn size() -> io::Result<(u16, u16)> {
        terminal::size()
    }

    /// Draw one frame
    pub fn render(&mut self, ctx: &TabContext, desktop: &VirtualDesktop, message: &str) -> io::Result<()> {
        let (width, height) = Self::size()?;
        let canvas = self.compose(ctx, desktop, width, height, message);

        let stdout = io::stdout();
        let mut out = io::BufWriter::with_capacity(65536, stdout.lock());
        with_frame(&mut out, |out| canvas.flush(out))
    }

    /// Build the frame without touching the terminal
    pub fn compose(
        &self,
        ctx: &TabContext,
        desktop: &VirtualDesktop,
        width: u16,
        height: u16,
        message: &str,
    ) -> Canvas {
        let cs = &self.color_scheme;
        let mut canvas = Canvas::new(width, height, Style::new(cs.content_fg, cs.desktop_bg));

        for window in desktop.visible_windows() {
            match ctx.registry().host_by_window(window.handle) {
                Some(id) => {
                    if let Some(host) = ctx.registry().host(id) {
                        self.draw_host(&mut canvas, &window, host, ctx);
                    }
                }
                None if window.style.contains(WindowStyle::TOPMOST) => {
                    self.draw_preview(&mut canvas, &window, ctx);
                }
                None => {}
            }
        }

        self.draw_status_bar(&mut canvas, ctx, message);
        canvas
    }

    fn draw_border(&self, canvas: &mut Canvas, rect: Rect, chars: &BorderChars, title: &str, style: Style) {
        if rect.width < 2 || rect.height < 2 {
            return;
        }
        let (left, top, right, bottom) = (rect.x, rect.y, rect.right() - 1, rect.bottom() - 1);

        canvas.put(left, top, chars.top_left, style);
        canvas.put(right, top, chars.top_right, style);
        canvas.put(left, bottom, chars.bottom_left, style);
        canvas.put(right, bottom, chars.bottom_right, style);
        for x in left + 1..right {
            canvas.put(x, top, chars.horizontal, style);
            canvas.put(x, bottom, chars.horizontal, style);
        }
        for y in top + 1..bottom {
            canvas.put(left, y, chars.vertical, style);
            canvas.put(right, y, chars.vertical, style);
        }

        // Title centred in the bottom border, the top row belongs to the strip
        let space = (rect.width as usize).saturating_sub(4);
        if space > 0 && !title.is_empty() {
            let shown = unicode_width::UnicodeWidthStr::width(title).min(space);
            let x = left + 2 + ((space - shown) / 2) as i32;
            canvas.text(x, bottom, title, space, style);
        }
    }

    fn draw_host(&self, canvas: &mut Canvas, window: &DesktopWindow, host: &TabHostWindow, ctx: &TabContext) {
        let cs = &self.color_scheme;
        let rect = window.rect;
        let body = Style::new(cs.content_fg, cs.window_bg);
        canvas.fill(rect.x, rect.y, rect.width, rect.height, body);

        let (chars, border) = if host.is_merge_target() {
            (BorderChars::heavy(), Style::new(cs.window_border_target, cs.window_bg))
        } else {
            (BorderChars::single(), Style::new(cs.window_border, cs.window_bg))
        };
        self.draw_border(canvas, rect, &chars, &window.title, border);

        let inner_right = rect.right() - 1;
        let strip = &ctx.config().strip;

        // Tab strip
        for (tab, entry_rect) in host.strip_layout(rect) {
            let Some(entry) = host.entries().iter().find(|e| e.tab == tab) else {
                continue;
            };
            let visible_width = (inner_right - entry_rect.x).clamp(0, entry_rect.width as i32) as u32;
            if visible_width == 0 {
                break;
            }
            let active = host.active_tab() == Some(&tab);
            let (bg, fg) = if active {
                (cs.tab_active_bg, cs.tab_active_fg)
            } else {
                (cs.tab_inactive_bg, cs.tab_inactive_fg)
            };
            let opacity = entry.fade.opacity();
            let mut style = Style::new(cs.window_bg.mix(fg, opacity), cs.window_bg.mix(bg, opacity));
            if active {
                style = style.bold();
            }
            canvas.fill(entry_rect.x, entry_rect.y, visible_width, entry_rect.height, style);

            let mut x = entry_rect.x + 1;
            if let Some(icon) = host.item(&tab).and_then(|item| item.icon()) {
                let [r, g, b] = bitmap::average_color(icon);
                canvas.put(x, entry_rect.y, '■', Style::new(Color::new(r, g, b), style.bg));
                x += 2;
            }
            let room = (entry_rect.x + visible_width as i32 - 1 - x).max(0) as usize;
            canvas.text(x, entry_rect.y, &entry.label, room, style);
        }

        // Address line
        let nav = host.nav();
        let address_y = rect.y + (strip.inset + strip.tab_height) as i32;
        if address_y < rect.bottom() - 1 {
            let dim = cs.window_bg.mix(cs.content_fg, 0.35);
            let button = |enabled: bool| Style::new(if enabled { cs.content_fg } else { dim }, cs.window_bg);
            canvas.put(rect.x + 1, address_y, '<', button(nav.can_go_back));
            canvas.put(rect.x + 3, address_y, '>', button(nav.can_go_forward));
            canvas.put(rect.x + 5, address_y, if nav.loading { '×' } else { '↻' }, body);
            let room = (rect.width as usize).saturating_sub(9);
            canvas.text(rect.x + 7, address_y, &nav.url, room, Style::new(cs.address_fg, cs.window_bg));
        }

        // Page view
        let Some(item) = host.active_item() else {
            return;
        };
        let room = (rect.width as usize).saturating_sub(4);
        let position = host.position_of(item.id()).map_or(0, |i| i + 1);
        let lines = [
            (item.display_title().to_string(), body.bold()),
            (item.url().to_string(), Style::new(cs.address_fg, cs.window_bg)),
            (if item.is_loading() { "Loading…".to_string() } else { String::new() }, body),
            (format!("Tab {} of {} in {}", position, host.tab_count(), host.id()), body),
        ];
        let top = address_y + 2;
        for (row, (text, style)) in lines.iter().enumerate() {
            let y = top + row as i32;
            if y >= rect.bottom() - 1 {
                break;
            }
            canvas.text(rect.x + 2, y, text, room, *style);
        }
    }

    fn draw_preview(&self, canvas: &mut Canvas, window: &DesktopWindow, ctx: &TabContext) {
        let cs = &self.color_scheme;
        let rect = window.rect;
        let fill = match &window.preview {
            Some(image) => {
                let [r, g, b] = bitmap::average_color(image);
                Color::new(r, g, b)
            }
            None => cs.window_bg,
        };
        let text = if fill.r as u32 + fill.g as u32 + fill.b as u32 > 384 {
            Color::new(0, 0, 0)
        } else {
            Color::new(255, 255, 255)
        };
        canvas.fill(rect.x, rect.y, rect.width, rect.height, Style::new(text, fill));
        self.draw_border(canvas, rect, &BorderChars::single(), "", Style::new(cs.preview_border, fill));

        let label = ctx.drag().session().and_then(|session| {
            ctx.registry()
                .host(session.origin)
                .and_then(|host| host.item(&session.tab))
                .map(|item| item.display_title().to_string())
        });
        if let Some(label) = label {
            let room = (rect.width as usize).saturating_sub(4);
            canvas.text(rect.x + 2, rect.y + rect.height as i32 / 2, &label, room, Style::new(text, fill).bold());
        }
    }

    fn draw_status_bar(&self, canvas: &mut Canvas, ctx: &TabContext, message: &str) {
        let cs = &self.color_scheme;
        let y = canvas.height() as i32 - 1;
        let width = canvas.width() as usize;
        let style = Style::new(cs.status_bar_fg, cs.status_bar_bg);
        canvas.fill(0, y, canvas.width() as u32, 1, style);

        let registry = ctx.registry();
        let mut status = format!(
            " tabhost │ merge {} │ {} windows │ {} tabs",
            if registry.merge_mode() { "on" } else { "off" },
            registry.window_count(),
            registry.len()
        );
        if ctx.drag().is_dragging() {
            status.push_str(" │ dragging");
        }
        if !message.is_empty() {
            status.push_str(" │ ");
            status.push_str(message);
        }

        let used = canvas.text(0, y, &status, width, style.bold());
        let shortcuts_width = unicode_width::UnicodeWidthStr::width(SHORTCUTS);
        if used + shortcuts_width + 2 <= width {
            canvas.text((width - shortcuts_width - 1) as i32, y, SHORTCUTS, shortcuts_width, style);
        }
    }
}

impl Drop for DesktopRenderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::fixture;

    #[test]
    fn test_compose_draws_strip_and_status() {
        let mut fx = fixture();
        let host = fx.ctx.create_box(None, "a".into(), "").unwrap();
        fx.ctx.create_box(Some(host), "b".into(), "").unwrap();
        fx.place(host, 0, 0);

        let renderer = DesktopRenderer::with_color_scheme(ColorScheme::default());
        let canvas = renderer.compose(&fx.ctx, &fx.desktop, 100, 30, "hello");

        assert!(canvas.row_text(1).contains("New Tab"));
        let status = canvas.row_text(29);
        assert!(status.contains("merge off"));
        assert!(status.contains("1 windows"));
        assert!(status.contains("2 tabs"));
        assert!(status.contains("hello"));
    }

    #[test]
    fn test_compose_marks_merge_target_and_preview() {
        let mut fx = fixture();
        let left = fx.ctx.create_box(None, "a".into(), "").unwrap();
        fx.ctx.create_box(Some(left), "b".into(), "").unwrap();
        let right = fx.ctx.create_box(None, "c".into(), "").unwrap();
        fx.place(left, 0, 0);
        fx.place(right, 50, 10);

        let press = fx.entry_point("b");
        fx.ctx.pointer_down(press);
        fx.ctx.pointer_move(press.offset(0, 3));
        fx.ctx.pointer_move(crate::core::Point::new(60, 15));

        let renderer = DesktopRenderer::with_color_scheme(ColorScheme::default());
        let canvas = renderer.compose(&fx.ctx, &fx.desktop, 120, 40, "");
        assert_eq!(canvas.char_at(50, 10), Some('┏'));
        assert!(canvas.row_text(39).contains("dragging"));
    }
}
