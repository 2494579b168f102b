//! Software raster backend (spec §4.5): a process-wide offscreen buffer
//! whose "present" is a synchronous CPU copy. No extension model.

use dx8gl_types::PixelFormat;

use crate::backend::{BackendKind, RenderBackend};
use crate::framebuffer::Framebuffer;

pub struct SoftwareBackend {
    framebuffer: Option<Framebuffer>,
    last_error: Option<String>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        SoftwareBackend {
            framebuffer: None,
            last_error: None,
        }
    }
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for SoftwareBackend {
    fn initialize(&mut self, width: u32, height: u32) -> bool {
        if self.framebuffer.is_some() {
            return true;
        }
        match Framebuffer::new(width, height, PixelFormat::Rgba8) {
            Ok(fb) => {
                self.framebuffer = Some(fb);
                true
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                false
            }
        }
    }

    fn make_current(&mut self) -> bool {
        self.framebuffer.is_some()
    }

    fn get_framebuffer(&mut self) -> Option<(&[u8], u32, u32, PixelFormat)> {
        let fb = self.framebuffer.as_ref()?;
        Some((fb.bytes(), fb.width(), fb.height(), fb.format()))
    }

    fn resize(&mut self, width: u32, height: u32) -> bool {
        match &mut self.framebuffer {
            Some(fb) => match fb.resize(width, height) {
                Ok(()) => true,
                Err(err) => {
                    self.last_error = Some(err.to_string());
                    false
                }
            },
            None => self.initialize(width, height),
        }
    }

    fn shutdown(&mut self) {
        self.framebuffer = None;
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::SoftwareRaster
    }

    fn has_extension(&self, _name: &str) -> bool {
        false
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_twice_is_a_noop_success() {
        let mut backend = SoftwareBackend::new();
        assert!(backend.initialize(64, 64));
        assert!(backend.initialize(64, 64));
    }

    #[test]
    fn get_framebuffer_before_initialize_is_none() {
        let mut backend = SoftwareBackend::new();
        assert!(backend.get_framebuffer().is_none());
    }

    #[test]
    fn get_framebuffer_reports_requested_dimensions() {
        let mut backend = SoftwareBackend::new();
        backend.initialize(32, 16);
        let (_, w, h, _) = backend.get_framebuffer().unwrap();
        assert_eq!((w, h), (32, 16));
    }

    #[test]
    fn resize_to_same_dimensions_is_a_noop() {
        let mut backend = SoftwareBackend::new();
        backend.initialize(32, 16);
        assert!(backend.resize(32, 16));
    }

    #[test]
    fn has_no_extensions() {
        let backend = SoftwareBackend::new();
        assert!(!backend.has_extension("anything"));
    }
}
