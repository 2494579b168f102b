//! Render backend abstraction (spec §4.5), offscreen framebuffer helper
//! (spec §4.6), and backend selection (spec §6).

pub mod backend;
pub mod backend_config;
pub mod backends;
pub mod config;
pub mod framebuffer;
pub mod pipeline;

pub use backend::{BackendKind, RenderBackend};
pub use backend_config::BackendConfig;
pub use backends::{HardwareGlBackend, SoftwareBackend, WebGpuBackend};
pub use config::{create_backend, resolve_selection, BackendSelection};
pub use framebuffer::{Framebuffer, FramebufferError};
pub use pipeline::{Pipeline, PipelineManager, ShaderTarget};
