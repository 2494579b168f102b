use thiserror::Error;

/// Highest legal vertex-shader constant register index (spec §8 boundary
/// behavior: "Vertex-shader constant index 95 accepted; 96 rejected").
pub const MAX_VERTEX_CONSTANT_INDEX: u32 = 95;

/// Highest legal pixel-shader (ps.1.4) constant register index (spec §8:
/// "Pixel-shader constant index 31 accepted; 32 rejected for ps_1_4").
pub const MAX_PIXEL_CONSTANT_INDEX: u32 = 31;

/// Highest legal texture stage index (spec §8: "Texture stage 7 accepted;
/// 8 rejected").
pub const MAX_TEXTURE_STAGE: u32 = 7;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("parameter out of range: {name} = {value} (max {max})")]
pub struct OutOfRange {
    pub name: &'static str,
    pub value: u32,
    pub max: u32,
}

pub fn check_constant_index(is_pixel_shader: bool, index: u32) -> Result<(), OutOfRange> {
    let max = if is_pixel_shader {
        MAX_PIXEL_CONSTANT_INDEX
    } else {
        MAX_VERTEX_CONSTANT_INDEX
    };
    if index > max {
        Err(OutOfRange {
            name: "constant_index",
            value: index,
            max,
        })
    } else {
        Ok(())
    }
}

pub fn check_texture_stage(stage: u32) -> Result<(), OutOfRange> {
    if stage > MAX_TEXTURE_STAGE {
        Err(OutOfRange {
            name: "texture_stage",
            value: stage,
            max: MAX_TEXTURE_STAGE,
        })
    } else {
        Ok(())
    }
}
