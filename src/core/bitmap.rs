//! Bitmaps passed between surfaces, the snapshot generator and preview windows.

use image::{Rgba, RgbaImage};

/// RGBA8 bitmap
pub type Bitmap = RgbaImage;

/// Build a bitmap from raw RGBA8 pixels, `None` when the buffer is the wrong size
pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Option<Bitmap> {
    if width == 0 || height == 0 {
        return None;
    }
    RgbaImage::from_raw(width, height, pixels)
}

/// Solid-colour bitmap
pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Bitmap {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// True when every pixel is fully opaque
pub fn is_opaque(bitmap: &Bitmap) -> bool {
    bitmap.pixels().all(|p| p.0[3] == u8::MAX)
}

/// Average colour, used where a bitmap has to be shown as a single cell
pub fn average_color(bitmap: &Bitmap) -> [u8; 3] {
    let count = (bitmap.width() as u64 * bitmap.height() as u64).max(1);
    let mut sum = [0u64; 3];
    for pixel in bitmap.pixels() {
        for (acc, channel) in sum.iter_mut().zip(pixel.0.iter()) {
            *acc += *channel as u64;
        }
    }
    [
        (sum[0] / count) as u8,
        (sum[1] / count) as u8,
        (sum[2] / count) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_rejects_bad_sizes() {
        assert!(from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(from_rgba(0, 2, Vec::new()).is_none());
    }

    #[test]
    fn test_average_color() {
        let bitmap = solid(4, 4, [10, 20, 30, 255]);
        assert_eq!(average_color(&bitmap), [10, 20, 30]);
        assert!(is_opaque(&bitmap));
    }
}
