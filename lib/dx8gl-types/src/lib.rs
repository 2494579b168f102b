#![allow(clippy::too_many_arguments)]

pub mod limits;
pub mod opcode;
pub mod pixel_format;
pub mod register;
pub mod state;

pub use limits::{check_constant_index, check_texture_stage, OutOfRange};
pub use opcode::Opcode;
pub use pixel_format::PixelFormat;
pub use register::{Component, Modifier, Register, RegisterType, RelativeAddress, Swizzle, WriteMask};
pub use state::{PipelineStateDescriptor, PrimitiveTopology};

/// Shader kind, vertex or pixel (spec §3 "Parsed shader").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ShaderKind {
    Vertex,
    Pixel,
}

/// `(version-major, version-minor)` as recorded from the header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ShaderVersion {
    pub major: u8,
    pub minor: u8,
}

impl ShaderVersion {
    pub fn is_supported(self, kind: ShaderKind) -> bool {
        match kind {
            ShaderKind::Vertex => self == ShaderVersion { major: 1, minor: 1 },
            ShaderKind::Pixel => matches!(self.minor, 1..=4) && self.major == 1,
        }
    }
}
