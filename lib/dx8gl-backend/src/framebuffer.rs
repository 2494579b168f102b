//! Offscreen framebuffer helper (spec §4.6): owns the CPU-visible mirror of
//! a backend's color buffer, the format it is stored in, and the
//! producer/consumer dirty-flag protocol described in spec §3/§5.

use dx8gl_types::PixelFormat;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramebufferError {
    #[error("framebuffer dimensions must be non-zero")]
    ZeroSized,
    #[error("width * height * bytes_per_pixel overflows a size counter")]
    SizeOverflow,
}

/// CPU-visible mirror of a backend's color buffer (spec §3 "Framebuffer").
///
/// Invariants upheld by every public method: `bytes.len() ==
/// width * height * format.bytes_per_pixel()`; a freshly cleared
/// framebuffer has `cpu_dirty == false`, `gpu_dirty == true` (spec §4.6
/// "Invariants").
pub struct Framebuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    bytes: Vec<u8>,
    cpu_dirty: bool,
    gpu_dirty: bool,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self, FramebufferError> {
        if width == 0 || height == 0 {
            return Err(FramebufferError::ZeroSized);
        }
        let size = format.buffer_size(width, height).ok_or(FramebufferError::SizeOverflow)?;
        Ok(Framebuffer {
            width,
            height,
            format,
            bytes: vec![0u8; size],
            cpu_dirty: false,
            gpu_dirty: true,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn cpu_dirty(&self) -> bool {
        self.cpu_dirty
    }

    pub fn gpu_dirty(&self) -> bool {
        self.gpu_dirty
    }

    /// Writes the clear color across the whole buffer in the native format
    /// (spec §4.6 "documented conversions"). Idempotent for any fixed
    /// `(r, g, b, a)` (spec §8 round-trip law).
    pub fn clear(&mut self, r: f32, g: f32, b: f32, a: f32) {
        let bpp = self.format.bytes_per_pixel();
        let pixel = encode_pixel(self.format, r, g, b, a);
        debug_assert_eq!(pixel.len(), bpp);
        for chunk in self.bytes.chunks_exact_mut(bpp) {
            chunk.copy_from_slice(&pixel);
        }
        self.cpu_dirty = false;
        self.gpu_dirty = true;
    }

    /// Converts the CPU buffer into `out` in `target_format`, through the
    /// pairwise table of spec §4.6. Returns `false` if `out` is not sized
    /// for `target_format` at this framebuffer's dimensions.
    pub fn convert_to(&self, target_format: PixelFormat, out: &mut [u8]) -> bool {
        let Some(expected_len) = target_format.buffer_size(self.width, self.height) else {
            return false;
        };
        if out.len() != expected_len {
            return false;
        }

        // RGBA8 is the pivot for every pair not directly listed (spec §4.6).
        let rgba8: Vec<u8> = if self.format == PixelFormat::Rgba8 {
            self.bytes.clone()
        } else {
            to_rgba8(self.format, &self.bytes)
        };

        if target_format == PixelFormat::Rgba8 {
            out.copy_from_slice(&rgba8);
        } else {
            from_rgba8(target_format, &rgba8, out);
        }
        true
    }

    /// Invokes `reader` with the CPU buffer, then marks it clean relative
    /// to the GPU (producer side of the dirty-flag protocol, spec §5).
    pub fn read_from_gpu<F: FnOnce(&mut [u8])>(&mut self, reader: F) {
        reader(&mut self.bytes);
        self.cpu_dirty = true;
        self.gpu_dirty = false;
    }

    /// Invokes `writer` with the CPU buffer (consumer side), then marks the
    /// GPU mirror stale.
    pub fn write_to_gpu<F: FnOnce(&[u8])>(&mut self, writer: F) {
        writer(&self.bytes);
        self.cpu_dirty = false;
        self.gpu_dirty = true;
    }

    /// Reallocates at the new size; contents become undefined. A no-op if
    /// dimensions already match (spec §8 round-trip law).
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), FramebufferError> {
        if width == self.width && height == self.height {
            return Ok(());
        }
        if width == 0 || height == 0 {
            return Err(FramebufferError::ZeroSized);
        }
        let size = self.format.buffer_size(width, height).ok_or(FramebufferError::SizeOverflow)?;
        self.width = width;
        self.height = height;
        self.bytes = vec![0u8; size];
        self.cpu_dirty = false;
        self.gpu_dirty = true;
        Ok(())
    }
}

fn encode_pixel(format: PixelFormat, r: f32, g: f32, b: f32, a: f32) -> Vec<u8> {
    match format {
        PixelFormat::Rgba8 => vec![to_u8(r), to_u8(g), to_u8(b), to_u8(a)],
        PixelFormat::Bgra8 => vec![to_u8(b), to_u8(g), to_u8(r), to_u8(a)],
        PixelFormat::Rgb8 => vec![to_u8(r), to_u8(g), to_u8(b)],
        PixelFormat::Bgr8 => vec![to_u8(b), to_u8(g), to_u8(r)],
        PixelFormat::Rgb565 => {
            let packed = pack_565(to_u8(r), to_u8(g), to_u8(b));
            packed.to_le_bytes().to_vec()
        }
        // Float RGBA stores unclamped values (spec §4.6).
        PixelFormat::Rgba32F => [r, g, b, a].iter().flat_map(|c| c.to_le_bytes()).collect(),
    }
}

fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn pack_565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Bit-replication expansion of a 5-bit or 6-bit channel to 8 bits (spec
/// §4.6: `(v5 << 3) | (v5 >> 2)`, `(v6 << 2) | (v6 >> 4)`).
fn expand_5(v5: u16) -> u8 {
    ((v5 << 3) | (v5 >> 2)) as u8
}

fn expand_6(v6: u16) -> u8 {
    ((v6 << 2) | (v6 >> 4)) as u8
}

fn to_rgba8(format: PixelFormat, bytes: &[u8]) -> Vec<u8> {
    let pixel_count = bytes.len() / format.bytes_per_pixel();
    let mut out = Vec::with_capacity(pixel_count * 4);
    for chunk in bytes.chunks_exact(format.bytes_per_pixel()) {
        match format {
            PixelFormat::Rgba8 => out.extend_from_slice(chunk),
            PixelFormat::Bgra8 => out.extend_from_slice(&[chunk[2], chunk[1], chunk[0], chunk[3]]),
            PixelFormat::Rgb8 => out.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]),
            PixelFormat::Bgr8 => out.extend_from_slice(&[chunk[2], chunk[1], chunk[0], 255]),
            PixelFormat::Rgb565 => {
                let packed = u16::from_le_bytes([chunk[0], chunk[1]]);
                let r5 = (packed >> 11) & 0x1F;
                let g6 = (packed >> 5) & 0x3F;
                let b5 = packed & 0x1F;
                out.extend_from_slice(&[expand_5(r5), expand_6(g6), expand_5(b5), 255]);
            }
            PixelFormat::Rgba32F => {
                let to_byte = |b: [u8; 4]| -> u8 { (f32::from_le_bytes(b).clamp(0.0, 1.0) * 255.0).round() as u8 };
                let r = to_byte([chunk[0], chunk[1], chunk[2], chunk[3]]);
                let g = to_byte([chunk[4], chunk[5], chunk[6], chunk[7]]);
                let b = to_byte([chunk[8], chunk[9], chunk[10], chunk[11]]);
                let a = to_byte([chunk[12], chunk[13], chunk[14], chunk[15]]);
                out.extend_from_slice(&[r, g, b, a]);
            }
        }
    }
    out
}

fn from_rgba8(format: PixelFormat, rgba8: &[u8], out: &mut [u8]) {
    let mut cursor = 0;
    for chunk in rgba8.chunks_exact(4) {
        let (r, g, b, a) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        let bpp = format.bytes_per_pixel();
        match format {
            PixelFormat::Rgba8 => out[cursor..cursor + 4].copy_from_slice(&[r, g, b, a]),
            PixelFormat::Bgra8 => out[cursor..cursor + 4].copy_from_slice(&[b, g, r, a]),
            PixelFormat::Rgb8 => out[cursor..cursor + 3].copy_from_slice(&[r, g, b]),
            PixelFormat::Bgr8 => out[cursor..cursor + 3].copy_from_slice(&[b, g, r]),
            PixelFormat::Rgb565 => {
                let packed = pack_565(r, g, b);
                out[cursor..cursor + 2].copy_from_slice(&packed.to_le_bytes());
            }
            PixelFormat::Rgba32F => {
                let floats = [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0];
                for (i, f) in floats.iter().enumerate() {
                    out[cursor + i * 4..cursor + i * 4 + 4].copy_from_slice(&f.to_le_bytes());
                }
            }
        }
        cursor += bpp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_is_rejected() {
        assert_eq!(Framebuffer::new(0, 4, PixelFormat::Rgba8), Err(FramebufferError::ZeroSized));
    }

    #[test]
    fn overflowing_size_is_rejected() {
        assert_eq!(
            Framebuffer::new(u32::MAX, u32::MAX, PixelFormat::Rgba8),
            Err(FramebufferError::SizeOverflow)
        );
    }

    #[test]
    fn clear_is_idempotent() {
        let mut fb = Framebuffer::new(2, 2, PixelFormat::Rgba8).unwrap();
        fb.clear(1.0, 0.0, 0.0, 1.0);
        let once = fb.bytes().to_vec();
        fb.clear(1.0, 0.0, 0.0, 1.0);
        assert_eq!(fb.bytes(), once.as_slice());
    }

    #[test]
    fn fresh_clear_sets_dirty_flags() {
        let mut fb = Framebuffer::new(2, 2, PixelFormat::Rgba8).unwrap();
        fb.clear(0.0, 0.0, 0.0, 0.0);
        assert!(!fb.cpu_dirty());
        assert!(fb.gpu_dirty());
    }

    #[test]
    fn resize_to_same_dimensions_is_a_noop() {
        let mut fb = Framebuffer::new(4, 4, PixelFormat::Rgba8).unwrap();
        fb.read_from_gpu(|bytes| bytes.fill(42));
        fb.resize(4, 4).unwrap();
        assert!(fb.bytes().iter().all(|&b| b == 42));
    }

    #[test]
    fn rgb565_round_trip_preserves_channels_within_tolerance() {
        // spec §8 end-to-end scenario 3.
        let mut fb = Framebuffer::new(2, 1, PixelFormat::Rgba8).unwrap();
        fb.read_from_gpu(|bytes| {
            bytes.copy_from_slice(&[255, 0, 0, 255, 0, 255, 0, 255]);
        });

        let mut rgb565 = vec![0u8; PixelFormat::Rgb565.buffer_size(2, 1).unwrap()];
        assert!(fb.convert_to(PixelFormat::Rgb565, &mut rgb565));

        let mid = Framebuffer {
            width: 2,
            height: 1,
            format: PixelFormat::Rgb565,
            bytes: rgb565,
            cpu_dirty: true,
            gpu_dirty: false,
        };
        let mut back = vec![0u8; PixelFormat::Rgba8.buffer_size(2, 1).unwrap()];
        assert!(mid.convert_to(PixelFormat::Rgba8, &mut back));

        let expected = [(248u8, 0u8, 0u8, 255u8), (0, 252, 0, 255)];
        for (i, (er, eg, eb, ea)) in expected.iter().enumerate() {
            let px = &back[i * 4..i * 4 + 4];
            assert!((px[0] as i16 - *er as i16).abs() <= 8);
            assert!((px[1] as i16 - *eg as i16).abs() <= 8);
            assert!((px[2] as i16 - *eb as i16).abs() <= 8);
            assert_eq!(px[3], *ea);
        }
    }

    #[test]
    fn rgba8_bgra8_round_trips_exactly() {
        let mut fb = Framebuffer::new(1, 1, PixelFormat::Rgba8).unwrap();
        fb.read_from_gpu(|bytes| bytes.copy_from_slice(&[10, 20, 30, 40]));
        let mut bgra = vec![0u8; 4];
        fb.convert_to(PixelFormat::Bgra8, &mut bgra).then_some(()).unwrap();
        assert_eq!(bgra, vec![30, 20, 10, 40]);
    }
}
