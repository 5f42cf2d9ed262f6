//! Drag preview snapshots
//!
//! Offscreen surfaces are scaled into a fixed-size canvas (aspect ratio kept,
//! centred horizontally, top aligned). Native child surfaces are copied
//! pixel for pixel at their own size. Either way the result is opaque, or
//! `None` when there is nothing to capture.

use image::imageops::{self, FilterType};
use image::Rgba;

use crate::core::bitmap::{self, Bitmap};
use crate::core::surface::{ContentSurface, RenderMode};
use crate::core::Size;

/// Canvas colour behind a scaled offscreen frame
const BACKGROUND: [u8; 4] = [255, 255, 255, 255];

/// Produces drag previews
#[derive(Debug, Clone, Copy)]
pub struct SnapshotGenerator {
    target: Size,
}

impl SnapshotGenerator {
    pub fn new(target: Size) -> Self {
        Self { target }
    }

    pub fn capture(&self, surface: &mut dyn ContentSurface) -> Option<Bitmap> {
        let preview = match surface.render_mode() {
            RenderMode::Offscreen => capture_offscreen(surface, self.target),
            RenderMode::NativeChild => capture_native(surface),
        };
        if preview.is_none() {
            tracing::debug!(mode = ?surface.render_mode(), "No drag preview captured");
        }
        preview
    }
}

fn capture_offscreen(surface: &mut dyn ContentSurface, target: Size) -> Option<Bitmap> {
    let source = surface.frame_size();
    if source.is_empty() || target.is_empty() {
        return None;
    }
    let frame = surface.capture_snapshot(source.width, source.height)?;
    let frame_size = Size::new(frame.width(), frame.height());
    let fitted = frame_size.fit_within(target);
    if fitted.is_empty() {
        return None;
    }

    let scaled = imageops::resize(&frame, fitted.width, fitted.height, FilterType::Triangle);
    let mut canvas = bitmap::solid(target.width, target.height, BACKGROUND);
    let x = (target.width - fitted.width) / 2;
    imageops::overlay(&mut canvas, &scaled, x as i64, 0);
    Some(canvas)
}

fn capture_native(surface: &mut dyn ContentSurface) -> Option<Bitmap> {
    let source = surface.frame_size();
    if source.is_empty() {
        return None;
    }
    let frame = surface.capture_snapshot(source.width, source.height)?;
    if frame.dimensions() != (source.width, source.height) {
        return None;
    }
    let mut copy = Bitmap::new(source.width, source.height);
    for (dst, src) in copy.pixels_mut().zip(frame.pixels()) {
        *dst = Rgba([src[0], src[1], src[2], u8::MAX]);
    }
    Some(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::StubSurface;

    /// Scaling may round a channel by one
    fn close_to(actual: [u8; 4], expected: [u8; 4]) -> bool {
        actual.iter().zip(expected.iter()).all(|(a, e)| a.abs_diff(*e) <= 2)
    }

    #[test]
    fn test_offscreen_keeps_aspect_and_centres() {
        // 800x400 red frame into 400x300: scaled to 400x200 at the top
        let mut surface = StubSurface::new().with_frame(Size::new(800, 400), [255, 0, 0, 255]);
        let preview = SnapshotGenerator::new(Size::new(400, 300))
            .capture(&mut surface)
            .unwrap();

        assert_eq!(preview.dimensions(), (400, 300));
        assert!(bitmap::is_opaque(&preview));
        assert!(close_to(preview.get_pixel(200, 100).0, [255, 0, 0, 255]));
        assert_eq!(preview.get_pixel(200, 280).0, BACKGROUND);
    }

    #[test]
    fn test_offscreen_tall_frame_is_centred_horizontally() {
        let mut surface = StubSurface::new().with_frame(Size::new(300, 600), [0, 0, 255, 255]);
        let preview = SnapshotGenerator::new(Size::new(400, 300))
            .capture(&mut surface)
            .unwrap();

        // Scaled to 150x300 with 125 units of background either side
        assert_eq!(preview.get_pixel(10, 150).0, BACKGROUND);
        assert!(close_to(preview.get_pixel(200, 150).0, [0, 0, 255, 255]));
        assert_eq!(preview.get_pixel(390, 150).0, BACKGROUND);
    }

    #[test]
    fn test_translucent_frame_blends_to_opaque() {
        let mut surface = StubSurface::new().with_frame(Size::new(400, 300), [0, 0, 0, 128]);
        let preview = SnapshotGenerator::new(Size::new(400, 300))
            .capture(&mut surface)
            .unwrap();
        assert!(bitmap::is_opaque(&preview));
    }

    #[test]
    fn test_native_copies_at_source_size() {
        let mut surface = StubSurface::new()
            .with_mode(RenderMode::NativeChild)
            .with_frame(Size::new(64, 48), [10, 20, 30, 0]);
        let preview = SnapshotGenerator::new(Size::new(400, 300))
            .capture(&mut surface)
            .unwrap();

        assert_eq!(preview.dimensions(), (64, 48));
        assert_eq!(preview.get_pixel(5, 5).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_failures_yield_none() {
        let generator = SnapshotGenerator::new(Size::new(400, 300));

        let mut empty = StubSurface::new().with_frame(Size::new(0, 300), [0, 0, 0, 255]);
        assert!(generator.capture(&mut empty).is_none());

        let mut broken = StubSurface::new().with_frame(Size::new(100, 100), [0, 0, 0, 255]);
        broken.fail_capture = true;
        assert!(generator.capture(&mut broken).is_none());

        let mut native = StubSurface::new()
            .with_mode(RenderMode::NativeChild)
            .with_frame(Size::new(100, 100), [0, 0, 0, 255]);
        native.fail_capture = true;
        assert!(generator.capture(&mut native).is_none());
    }
}
