//! Configuration and color scheme management for tabhost.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.tabhost/config.toml`
//! - Window, tab strip and drag tuning
//! - Built-in color schemes for the terminal front-end
//!
//! # Configuration File
//!
//! ```toml
//! # Consolidate new tabs into one window
//! merge_mode = false
//! home_url = "about:home"
//! log_level = "info"
//! color_scheme = "nord"
//!
//! [window]
//! width = 48
//! height = 14
//!
//! [strip]
//! min_tab_width = 6
//! max_tab_width = 20
//!
//! [drag]
//! preview_width = 400
//! preview_height = 300
//! fade_ms = 150
//! ```
//!
//! All geometry is in screen units; the terminal front-end uses one unit per
//! cell.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::Size;

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// New tabs join the first window instead of spawning their own
    pub merge_mode: bool,
    /// URL for tabs opened without one
    pub home_url: String,
    /// Log filter (overridden by RUST_LOG)
    pub log_level: String,
    /// Color scheme name
    pub color_scheme: String,
    pub window: WindowConfig,
    pub strip: StripConfig,
    pub drag: DragConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merge_mode: false,
            home_url: "about:home".to_string(),
            log_level: "info".to_string(),
            color_scheme: "default".to_string(),
            window: WindowConfig::default(),
            strip: StripConfig::default(),
            drag: DragConfig::default(),
        }
    }
}

/// Host window placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    /// Offset from the pointer to a window spawned by a drop
    pub spawn_offset_x: i32,
    pub spawn_offset_y: i32,
    /// Diagonal step between windows created by a split
    pub cascade_x: i32,
    pub cascade_y: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 48,
            height: 14,
            spawn_offset_x: -4,
            spawn_offset_y: -1,
            cascade_x: 3,
            cascade_y: 2,
        }
    }
}

impl WindowConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Tab strip layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StripConfig {
    /// Distance from the window edge to the first entry
    pub inset: u32,
    /// Height of one entry
    pub tab_height: u32,
    pub min_tab_width: u32,
    pub max_tab_width: u32,
    /// Units per display column of a label
    pub column_width: u32,
    /// Extra units around the label
    pub padding: u32,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            inset: 1,
            tab_height: 1,
            min_tab_width: 6,
            max_tab_width: 20,
            column_width: 1,
            padding: 2,
        }
    }
}

/// Drag session tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Snapshot bitmap size for offscreen surfaces
    pub preview_width: u32,
    pub preview_height: u32,
    /// Size of the floating preview window on screen
    pub preview_window_width: u32,
    pub preview_window_height: u32,
    /// Offset from the pointer to the preview window
    pub preview_offset_x: i32,
    pub preview_offset_y: i32,
    /// Strip entry fade duration
    pub fade_ms: u64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            preview_width: 400,
            preview_height: 300,
            preview_window_width: 20,
            preview_window_height: 6,
            preview_offset_x: 2,
            preview_offset_y: 1,
            fade_ms: 150,
        }
    }
}

impl DragConfig {
    pub fn preview_size(&self) -> Size {
        Size::new(self.preview_width, self.preview_height)
    }

    pub fn preview_window_size(&self) -> Size {
        Size::new(self.preview_window_width, self.preview_window_height)
    }

    pub fn fade_duration(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring invalid config {}: {}", path.display(), e),
                }
            }
        }
        Self::default()
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), String> {
        let path = Self::get_config_path().ok_or_else(|| "Could not determine config path".to_string())?;
        self.save_to(&path)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))?;
        Ok(())
    }

    /// Directory holding the config and log files
    pub fn data_dir() -> Option<PathBuf> {
        home_dir().map(|home| home.join(".tabhost"))
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        let dir = Self::data_dir()?;
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir.join("config.toml"))
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.color_scheme)
    }
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Blend toward `other`; `t` = 0 keeps self, 1 gives other
    pub fn mix(&self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::new(lerp(self.r, other.r), lerp(self.g, other.g), lerp(self.b, other.b))
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Color scheme definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,

    pub desktop_bg: Color,

    // Window frames
    pub window_bg: Color,
    pub window_border: Color,
    pub window_border_target: Color,

    // Tab strip
    pub tab_active_bg: Color,
    pub tab_active_fg: Color,
    pub tab_inactive_bg: Color,
    pub tab_inactive_fg: Color,

    // Content area
    pub content_fg: Color,
    pub address_fg: Color,

    pub preview_border: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

impl ColorScheme {
    /// Default color scheme
    pub fn default_scheme() -> Self {
        Self {
            name: "default".to_string(),
            desktop_bg: Color::new(20, 20, 28),
            window_bg: Color::new(40, 40, 40),
            window_border: Color::new(90, 90, 90),
            window_border_target: Color::new(100, 150, 255),
            tab_active_bg: Color::new(60, 60, 180),
            tab_active_fg: Color::new(255, 255, 255),
            tab_inactive_bg: Color::new(60, 60, 60),
            tab_inactive_fg: Color::new(150, 150, 150),
            content_fg: Color::new(200, 200, 200),
            address_fg: Color::new(120, 200, 120),
            preview_border: Color::new(200, 200, 0),
            status_bar_bg: Color::new(0, 100, 0),
            status_bar_fg: Color::new(255, 255, 255),
        }
    }

    /// Nord scheme
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            desktop_bg: Color::new(36, 41, 51),
            window_bg: Color::new(46, 52, 64),
            window_border: Color::new(59, 66, 82),
            window_border_target: Color::new(136, 192, 208),
            tab_active_bg: Color::new(136, 192, 208),
            tab_active_fg: Color::new(46, 52, 64),
            tab_inactive_bg: Color::new(59, 66, 82),
            tab_inactive_fg: Color::new(147, 161, 181),
            content_fg: Color::new(216, 222, 233),
            address_fg: Color::new(163, 190, 140),
            preview_border: Color::new(235, 203, 139),
            status_bar_bg: Color::new(59, 66, 82),
            status_bar_fg: Color::new(216, 222, 233),
        }
    }

    /// Dracula scheme
    pub fn dracula() -> Self {
        Self {
            name: "dracula".to_string(),
            desktop_bg: Color::new(30, 31, 41),
            window_bg: Color::new(40, 42, 54),
            window_border: Color::new(68, 71, 90),
            window_border_target: Color::new(189, 147, 249),
            tab_active_bg: Color::new(189, 147, 249),
            tab_active_fg: Color::new(40, 42, 54),
            tab_inactive_bg: Color::new(68, 71, 90),
            tab_inactive_fg: Color::new(98, 114, 164),
            content_fg: Color::new(248, 248, 242),
            address_fg: Color::new(80, 250, 123),
            preview_border: Color::new(241, 250, 140),
            status_bar_bg: Color::new(68, 71, 90),
            status_bar_fg: Color::new(248, 248, 242),
        }
    }

    /// Tokyo Night scheme
    pub fn tokyo_night() -> Self {
        Self {
            name: "tokyo-night".to_string(),
            desktop_bg: Color::new(22, 22, 30),
            window_bg: Color::new(26, 27, 38),
            window_border: Color::new(41, 46, 66),
            window_border_target: Color::new(122, 162, 247),
            tab_active_bg: Color::new(122, 162, 247),
            tab_active_fg: Color::new(26, 27, 38),
            tab_inactive_bg: Color::new(36, 40, 59),
            tab_inactive_fg: Color::new(86, 95, 137),
            content_fg: Color::new(192, 202, 245),
            address_fg: Color::new(158, 206, 106),
            preview_border: Color::new(224, 175, 104),
            status_bar_bg: Color::new(36, 40, 59),
            status_bar_fg: Color::new(169, 177, 214),
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "nord" => Self::nord(),
            "dracula" => Self::dracula(),
            "tokyo-night" | "tokyo_night" | "tokyonight" => Self::tokyo_night(),
            _ => Self::default_scheme(),
        }
    }

    /// List available schemes
    pub fn list() -> Vec<&'static str> {
        vec!["default", "nord", "dracula", "tokyo-night"]
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "merge_mode = true\n[drag]\nfade_ms = 40\n").unwrap();

        let config = Config::load_from(&path);
        assert!(config.merge_mode);
        assert_eq!(config.drag.fade_ms, 40);
        assert_eq!(config.drag.preview_width, 400);
        assert_eq!(config.window, WindowConfig::default());
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "merge_mode = \"sometimes\"").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.color_scheme = "nord".to_string();
        config.window.cascade_x = 7;

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(loaded.get_color_scheme().name, "nord");
    }

    #[test]
    fn test_unknown_scheme_is_default() {
        assert_eq!(ColorScheme::by_name("nope").name, "default");
        assert_eq!(ColorScheme::by_name("Tokyo-Night").name, "tokyo-night");
    }
}
