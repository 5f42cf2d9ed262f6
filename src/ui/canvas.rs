//! Off-screen cell grid.
//!
//! Windows overlap, so a frame is composed bottom to top into a grid first
//! and then written out row by row, switching colours only where the style
//! changes.

use std::io::{self, Write};

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};
use unicode_width::UnicodeWidthChar;

use crate::config::Color;

/// Colours and weight of a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
}

impl Style {
    pub fn new(fg: Color, bg: Color) -> Self {
        Self { fg, bg, bold: false }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    style: Style,
    /// Right half of a wide character
    continuation: bool,
}

/// A width x height grid of styled cells
pub struct Canvas {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: u16, height: u16, style: Style) -> Self {
        let blank = Cell {
            ch: ' ',
            style,
            continuation: false,
        };
        Self {
            width,
            height,
            cells: vec![blank; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Set one cell; off-grid writes are clipped
    pub fn put(&mut self, x: i32, y: i32, ch: char, style: Style) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = Cell {
                ch,
                style,
                continuation: false,
            };
        }
    }

    /// Fill a rectangle
    pub fn fill(&mut self, x: i32, y: i32, width: u32, height: u32, style: Style) {
        for row in y..y + height as i32 {
            for col in x..x + width as i32 {
                self.put(col, row, ' ', style);
            }
        }
    }

    /// Write `text` from `(x, y)` using at most `max_width` columns. A wide
    /// character that does not fit is dropped. Returns the columns used.
    pub fn text(&mut self, x: i32, y: i32, text: &str, max_width: usize, style: Style) -> usize {
        let mut used = 0;
        for ch in text.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if w == 0 {
                continue;
            }
            if used + w > max_width {
                break;
            }
            let col = x + used as i32;
            self.put(col, y, ch, style);
            if w == 2 {
                if let Some(i) = self.index(col + 1, y) {
                    self.cells[i] = Cell {
                        ch: ' ',
                        style,
                        continuation: true,
                    };
                }
            }
            used += w;
        }
        used
    }

    /// Character at `(x, y)`, if on the grid
    pub fn char_at(&self, x: u16, y: u16) -> Option<char> {
        self.index(x as i32, y as i32).map(|i| self.cells[i].ch)
    }

    /// Characters of one row, wide characters counted once
    #[cfg(test)]
    pub(crate) fn row_text(&self, y: u16) -> String {
        let start = y as usize * self.width as usize;
        self.cells[start..start + self.width as usize]
            .iter()
            .filter(|cell| !cell.continuation)
            .map(|cell| cell.ch)
            .collect()
    }

    /// Write the grid to the terminal
    pub fn flush<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut line_buffer = String::with_capacity(self.width as usize * 4);
        for y in 0..self.height {
            queue!(out, MoveTo(0, y))?;
            let start = y as usize * self.width as usize;
            let mut last_style: Option<Style> = None;
            for cell in &self.cells[start..start + self.width as usize] {
                if cell.continuation {
                    continue;
                }
                if last_style != Some(cell.style) {
                    if !line_buffer.is_empty() {
                        write!(out, "{}", line_buffer)?;
                        line_buffer.clear();
                    }
                    queue!(
                        out,
                        SetAttribute(if cell.style.bold { Attribute::Bold } else { Attribute::NormalIntensity }),
                        SetBackgroundColor(cell.style.bg.to_crossterm()),
                        SetForegroundColor(cell.style.fg.to_crossterm())
                    )?;
                    last_style = Some(cell.style);
                }
                line_buffer.push(cell.ch);
            }
            if !line_buffer.is_empty() {
                write!(out, "{}", line_buffer)?;
                line_buffer.clear();
            }
        }
        queue!(out, ResetColor)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> Style {
        Style::new(Color::new(255, 255, 255), Color::new(0, 0, 0))
    }

    #[test]
    fn test_text_clips_to_width() {
        let mut canvas = Canvas::new(10, 2, style());
        assert_eq!(canvas.text(1, 0, "abcdefgh", 4, style()), 4);
        assert_eq!(canvas.row_text(0), " abcd     ");
    }

    #[test]
    fn test_wide_chars_take_two_columns() {
        let mut canvas = Canvas::new(6, 1, style());
        // The third character would need columns 4 and 5 of a 5-column budget
        assert_eq!(canvas.text(0, 0, "日本語", 5, style()), 4);
        assert_eq!(canvas.row_text(0), "日本  ");
    }

    #[test]
    fn test_off_grid_writes_are_clipped() {
        let mut canvas = Canvas::new(4, 2, style());
        canvas.fill(-2, -1, 10, 10, Style::new(Color::new(1, 1, 1), Color::new(9, 9, 9)));
        canvas.text(2, 1, "xyz", 10, style());
        assert_eq!(canvas.row_text(1), "  xy");
    }

    #[test]
    fn test_flush_writes_every_row() {
        let mut canvas = Canvas::new(3, 2, style());
        canvas.text(0, 1, "hi", 3, style());
        let mut out = Vec::new();
        canvas.flush(&mut out).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("hi "));
    }
}
