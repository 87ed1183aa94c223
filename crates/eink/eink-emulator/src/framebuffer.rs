//! CPU-based 8-bit grayscale framebuffer
//!
//! Used twice by the emulator: once for controller image memory (what has
//! been staged) and once for the visible panel (what the last refreshes
//! painted).

use std::path::Path;

use image::GrayImage;
use platform::{Rect, WHITE};

/// Row-major 8-bit grayscale pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    /// Pixel bytes, `width * height` long
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Framebuffer {
    /// Create new framebuffer filled with white
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: vec![WHITE; width as usize * height as usize],
            width,
            height,
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Set pixel at coordinates; out-of-range writes are ignored
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) {
        if let Some(idx) = self.index(x, y) {
            self.pixels[idx] = value;
        }
    }

    /// Get pixel at coordinates
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u8> {
        self.index(x, y).map(|idx| self.pixels[idx])
    }

    /// Fill entire framebuffer with `value`
    pub fn fill(&mut self, value: u8) {
        self.pixels.fill(value);
    }

    /// Clear framebuffer (fill with white)
    pub fn clear(&mut self) {
        self.fill(WHITE);
    }

    /// True when every pixel equals `value`
    pub fn is_uniform(&self, value: u8) -> bool {
        self.pixels.iter().all(|&p| p == value)
    }

    /// Write row-major `data` into `rect`. The caller has checked bounds and length.
    pub fn blit(&mut self, rect: Rect, data: &[u8]) {
        let width = rect.width as usize;
        for (row, line) in data.chunks_exact(width).enumerate() {
            let Some(start) = self.index(rect.x, rect.y + row as u32) else {
                break;
            };
            self.pixels[start..start + width].copy_from_slice(line);
        }
    }

    /// Copy `rect` from `source` into the same place in `self`
    pub fn copy_rect_from(&mut self, source: &Framebuffer, rect: Rect) {
        let width = rect.width as usize;
        for y in rect.y..rect.y + rect.height {
            let (Some(src), Some(dst)) = (source.index(rect.x, y), self.index(rect.x, y)) else {
                break;
            };
            self.pixels[dst..dst + width].copy_from_slice(&source.pixels[src..src + width]);
        }
    }

    /// Row-major bytes of `rect`
    pub fn region(&self, rect: Rect) -> Vec<u8> {
        let width = rect.width as usize;
        let mut out = Vec::with_capacity(rect.area());
        for y in rect.y..rect.y + rect.height {
            if let Some(start) = self.index(rect.x, y) {
                out.extend_from_slice(&self.pixels[start..start + width]);
            }
        }
        out
    }

    /// Copy into an [`image::GrayImage`]
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Save to PNG (for simulator output and visual regression)
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.to_gray_image().save(path)
    }
}
