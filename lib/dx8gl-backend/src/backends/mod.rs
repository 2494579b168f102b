pub mod hardware_gl;
pub mod software;
pub mod webgpu;

pub use hardware_gl::HardwareGlBackend;
pub use software::SoftwareBackend;
pub use webgpu::WebGpuBackend;
