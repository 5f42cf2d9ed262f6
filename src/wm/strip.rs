//! Strip entries - the visible tab buttons of a host window

use std::time::Duration;

use unicode_width::UnicodeWidthStr;

use crate::config::StripConfig;
use crate::core::{Rect, TabId};

/// Opacity animation of one entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    opacity: f32,
    target: f32,
}

impl Fade {
    pub fn shown() -> Self {
        Self { opacity: 1.0, target: 1.0 }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_running(&self) -> bool {
        self.opacity != self.target
    }

    pub fn fade_out(&mut self) {
        self.target = 0.0;
    }

    pub fn fade_in(&mut self) {
        self.target = 1.0;
    }

    /// Step toward the target. Returns true while still moving.
    pub fn advance(&mut self, dt: Duration, duration: Duration) -> bool {
        if !self.is_running() {
            return false;
        }
        if duration.is_zero() {
            self.opacity = self.target;
            return false;
        }
        let step = dt.as_secs_f32() / duration.as_secs_f32();
        if self.opacity < self.target {
            self.opacity = (self.opacity + step).min(self.target);
        } else {
            self.opacity = (self.opacity - step).max(self.target);
        }
        self.is_running()
    }
}

/// One tab button in the strip
#[derive(Debug, Clone)]
pub struct StripEntry {
    pub tab: TabId,
    pub label: String,
    /// Extent along the strip
    pub width: u32,
    /// Extent across the strip
    pub height: u32,
    /// Logically removed from the strip while its tab is dragged out
    pub hidden: bool,
    pub fade: Fade,
}

impl StripEntry {
    pub fn new(tab: TabId, label: &str, config: &StripConfig) -> Self {
        let mut entry = Self {
            tab,
            label: String::new(),
            width: 0,
            height: config.tab_height.max(1),
            hidden: false,
            fade: Fade::shown(),
        };
        entry.set_label(label, config);
        entry
    }

    /// Change the label and recompute the extent from its display width
    pub fn set_label(&mut self, label: &str, config: &StripConfig) {
        self.label = label.to_string();
        self.width = entry_width(label, config);
    }
}

/// Extent of an entry showing `label`
pub fn entry_width(label: &str, config: &StripConfig) -> u32 {
    let columns = UnicodeWidthStr::width(label) as u32;
    let min = config.min_tab_width.max(1);
    let max = config.max_tab_width.max(min);
    (columns * config.column_width.max(1) + config.padding).clamp(min, max)
}

/// Screen rectangles of the visible entries, left to right from the strip origin
pub fn layout(window: Rect, entries: &[StripEntry], config: &StripConfig) -> Vec<(TabId, Rect)> {
    let inset = config.inset as i32;
    let mut x = window.x + inset;
    let y = window.y + inset;
    entries
        .iter()
        .filter(|entry| !entry.hidden)
        .map(|entry| {
            let rect = Rect::new(x, y, entry.width, entry.height);
            x += entry.width as i32;
            (entry.tab.clone(), rect)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point;

    #[test]
    fn test_width_clamped() {
        let config = StripConfig::default();
        assert_eq!(entry_width("", &config), config.min_tab_width);
        assert_eq!(entry_width("abcdef", &config), 8);
        assert_eq!(entry_width(&"x".repeat(80), &config), config.max_tab_width);
        // Wide characters count two columns
        assert_eq!(entry_width("日本語", &config), 8);
    }

    #[test]
    fn test_layout_skips_hidden() {
        let config = StripConfig::default();
        let mut entries = vec![
            StripEntry::new(TabId::from("a"), "aaaa", &config),
            StripEntry::new(TabId::from("b"), "bbbb", &config),
            StripEntry::new(TabId::from("c"), "cccc", &config),
        ];
        entries[1].hidden = true;

        let rects = layout(Rect::new(10, 5, 40, 10), &entries, &config);
        assert_eq!(rects.len(), 2);
        assert_eq!(rects[0], (TabId::from("a"), Rect::new(11, 6, 6, 1)));
        assert_eq!(rects[1], (TabId::from("c"), Rect::new(17, 6, 6, 1)));
        assert!(rects[1].1.contains(Point::new(20, 6)));
    }

    #[test]
    fn test_fade_reaches_target() {
        let mut fade = Fade::shown();
        fade.fade_out();
        let duration = Duration::from_millis(100);
        assert!(fade.advance(Duration::from_millis(50), duration));
        assert!((fade.opacity() - 0.5).abs() < 1e-4);
        assert!(!fade.advance(Duration::from_millis(80), duration));
        assert_eq!(fade.opacity(), 0.0);

        fade.fade_in();
        assert!(!fade.advance(Duration::from_millis(1), Duration::ZERO));
        assert_eq!(fade.opacity(), 1.0);
    }
}
