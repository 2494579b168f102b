use serde::{Deserialize, Serialize};

/// One of the six pixel formats the offscreen framebuffer and its readback
/// path understand (spec §3 "Framebuffer").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgba8,
    Rgb8,
    Rgb565,
    Bgra8,
    Bgr8,
    Rgba32F,
}

impl PixelFormat {
    /// Bytes per pixel is a pure function of format (spec §4.6 invariant).
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Bgra8 => 4,
            PixelFormat::Bgr8 => 3,
            PixelFormat::Rgba32F => 16,
        }
    }

    /// `width * height * bytes_per_pixel`, rejecting overflow per spec §8
    /// boundary behavior ("size counter overflow is rejected").
    pub fn buffer_size(self, width: u32, height: u32) -> Option<usize> {
        let w = width as usize;
        let h = height as usize;
        w.checked_mul(h)
            .and_then(|px| px.checked_mul(self.bytes_per_pixel()))
    }
}
