//! Render backend interface (spec §4.5): a trait implemented once per
//! platform strategy (software raster, hardware GL, web GPU), plus the
//! kind tag and shared error type applications see when an operation
//! fails.

use dx8gl_types::PixelFormat;

/// Identifies which concrete backend is live (spec §4.5 `backend_kind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    SoftwareRaster,
    HardwareGl,
    WebGpu,
}

impl BackendKind {
    /// The `DX8GL_BACKEND` / `--backend=` spelling for this kind (spec §6).
    pub fn env_name(self) -> &'static str {
        match self {
            BackendKind::SoftwareRaster => "osmesa",
            BackendKind::HardwareGl => "egl",
            BackendKind::WebGpu => "webgpu",
        }
    }
}

/// A render backend never panics; failures populate a last-error string
/// and return a failure indicator (spec §7 "Propagation policy").
pub trait RenderBackend {
    /// Allocates all resources. Safe to call once; a second call on an
    /// already-initialized backend is a no-op returning success (spec §8
    /// round-trip law).
    fn initialize(&mut self, width: u32, height: u32) -> bool;

    /// Binds this backend's context to the calling thread. A no-op after
    /// successful initialization for software raster and web GPU;
    /// hardware GL actually binds a display/context/surface triple.
    fn make_current(&mut self) -> bool;

    /// Returns the most recent color-buffer contents, ensuring any
    /// outstanding GPU work affecting them has completed first. `None` if
    /// no frame has been presented yet.
    fn get_framebuffer(&mut self) -> Option<(&[u8], u32, u32, PixelFormat)>;

    /// Destroys and recreates color/depth/readback resources at the new
    /// size. A no-op if dimensions already match.
    fn resize(&mut self, width: u32, height: u32) -> bool;

    /// Releases all resources. Idempotent.
    fn shutdown(&mut self);

    fn backend_kind(&self) -> BackendKind;

    /// Feature query; always `false` on backends with no extension model.
    fn has_extension(&self, name: &str) -> bool;

    /// The diagnostic left by the most recent failing operation, if any.
    fn last_error(&self) -> Option<&str>;
}
