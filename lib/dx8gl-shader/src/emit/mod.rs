pub mod common;
pub mod glsl;
pub mod wgsl;

pub use glsl::emit as emit_glsl;
pub use wgsl::emit as emit_wgsl;
