//! Target-B emitter: web-GPU style shading language (spec §4.4).

use dx8gl_types::{RegisterType, ShaderKind, MAX_PIXEL_CONSTANT_INDEX, MAX_VERTEX_CONSTANT_INDEX};

use crate::emit::common::{input_semantic_name, lower_instruction, used_input_indices, used_temp_indices, Syntax};
use crate::ir::ParsedShader;
use crate::lexer::AttributeOutputSlot;

struct WgslSyntax;

impl Syntax for WgslSyntax {
    fn vec4(&self, c: [&str; 4]) -> String {
        format!("vec4<f32>({}, {}, {}, {})", c[0], c[1], c[2], c[3])
    }
    fn vec4_splat(&self, scalar: &str) -> String {
        format!("vec4<f32>({})", scalar)
    }
    fn inv_sqrt(&self, e: &str) -> String {
        format!("inverseSqrt({})", e)
    }
    fn any_neg3(&self, e: &str) -> String {
        format!("any(({}).xyz < vec3<f32>(0.0))", e)
    }
    fn sample(&self, stage: u32, coord_xy: &str) -> String {
        format!("textureSample(tex{0}, samp{0}, {1})", stage, coord_xy)
    }
    fn bem(&self, stage: u32, src_xy: &str, coord_xy: &str) -> String {
        format!("({} + bem_mat{} * {})", coord_xy, stage, src_xy)
    }
    fn constant_ref(&self, idx_expr: String) -> String {
        format!("uniforms.c[{}]", idx_expr)
    }
    fn temp_name(&self, idx: u32) -> String {
        format!("r{}", idx)
    }
    fn input_name(&self, shader: &ParsedShader, idx: u32) -> String {
        format!("input.{}", input_semantic_name(shader, idx))
    }
    fn address_name(&self) -> String {
        "a0".to_string()
    }
    fn texture_name(&self, idx: u32) -> String {
        format!("t{}", idx)
    }
    fn position_name(&self) -> String {
        "output.position".to_string()
    }
    fn color_output_name(&self) -> String {
        "oC0".to_string()
    }
    fn attribute_output_name(&self, slot: AttributeOutputSlot) -> String {
        format!("output.{}", varying_field_name(slot))
    }
}

fn varying_field_name(slot: AttributeOutputSlot) -> String {
    match slot {
        AttributeOutputSlot::Diffuse => "v_color0".to_string(),
        AttributeOutputSlot::Specular => "v_color1".to_string(),
        AttributeOutputSlot::Texcoord(n) => format!("v_texcoord{}", n),
        AttributeOutputSlot::Fog => "v_fog".to_string(),
        AttributeOutputSlot::PointSize => "point_size".to_string(),
    }
}

/// Emits a single web-GPU style (WGSL) shader string for the parsed IR
/// (spec §4.4).
pub fn emit(shader: &ParsedShader) -> String {
    let syn = WgslSyntax;
    let mut out = String::new();
    out.push_str(&format!(
        "// {} shader, source version {}.{}\n",
        match shader.kind {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Pixel => "pixel",
        },
        shader.version.major,
        shader.version.minor,
    ));

    let constants = shader.referenced_constants();
    let needs_uniforms = !constants.is_empty() || shader.uses_address_register();
    if needs_uniforms {
        let max_index = if shader.kind == ShaderKind::Vertex {
            MAX_VERTEX_CONSTANT_INDEX
        } else {
            MAX_PIXEL_CONSTANT_INDEX
        };
        let size = if shader.uses_address_register() {
            max_index + 1
        } else {
            constants.iter().copied().max().unwrap_or(0) + 1
        };
        out.push_str("struct Uniforms {\n");
        out.push_str(&format!("    c: array<vec4<f32>, {}>,\n", size));
        out.push_str("};\n");
        out.push_str("@group(0) @binding(0) var<uniform> uniforms: Uniforms;\n");
    }

    let stages = shader.referenced_texture_stages();
    for (slot, stage) in stages.iter().enumerate() {
        out.push_str(&format!(
            "@group(1) @binding({}) var samp{}: sampler;\n",
            slot * 2,
            stage
        ));
        out.push_str(&format!(
            "@group(1) @binding({}) var tex{}: texture_2d<f32>;\n",
            slot * 2 + 1,
            stage
        ));
    }
    for stage in crate::emit::common::bem_stages(shader) {
        out.push_str(&format!(
            "@group(1) @binding({}) var<uniform> bem_mat{}: mat2x2<f32>;\n",
            200 + stage,
            stage
        ));
    }

    let mut varying_fields: Vec<(u32, String)> = Vec::new();
    for (reg_type, indices) in shader.referenced_varyings() {
        if reg_type == RegisterType::RasterizerOutput {
            continue;
        }
        for idx in indices {
            let name = match reg_type {
                RegisterType::AttributeOutput => varying_field_name(crate::lexer::attribute_output_slot(idx)),
                RegisterType::Texture => format!("v_texcoord{}", idx),
                _ => continue,
            };
            varying_fields.push((varying_fields.len() as u32, name));
        }
    }

    if shader.kind == ShaderKind::Vertex {
        out.push_str("struct VertexInput {\n");
        for (loc, idx) in used_input_indices(shader).into_iter().enumerate() {
            out.push_str(&format!(
                "    @location({}) {}: vec4<f32>,\n",
                loc,
                input_semantic_name(shader, idx)
            ));
        }
        out.push_str("};\n");

        out.push_str("struct VertexOutput {\n");
        out.push_str("    @builtin(position) position: vec4<f32>,\n");
        for (loc, (_, name)) in varying_fields.iter().enumerate() {
            out.push_str(&format!("    @location({}) {}: vec4<f32>,\n", loc, name));
        }
        out.push_str("};\n");

        out.push_str("@vertex\n");
        out.push_str("fn vs_main(input: VertexInput) -> VertexOutput {\n");
        out.push_str("    var output: VertexOutput;\n");
        for idx in used_temp_indices(shader) {
            out.push_str(&format!("    var r{0}: vec4<f32> = vec4<f32>(0.0);\n", idx));
        }
        if shader.uses_address_register() {
            out.push_str("    var a0: i32 = 0;\n");
        }
        for instr in &shader.instructions {
            out.push_str("    ");
            out.push_str(&lower_instruction(instr, shader, &syn));
            out.push('\n');
        }
        if !shader.uses_position {
            let position_idx = shader
                .declared_inputs
                .iter()
                .find(|(_, s)| matches!(s, crate::ir::Semantic::Position))
                .map(|(idx, _)| *idx)
                .unwrap_or(0);
            out.push_str(&format!(
                "    output.position = input.{};\n",
                input_semantic_name(shader, position_idx)
            ));
        }
        out.push_str("    return output;\n");
        out.push_str("}\n");
    } else {
        out.push_str("struct FragmentInput {\n");
        for (loc, (_, name)) in varying_fields.iter().enumerate() {
            out.push_str(&format!("    @location({}) {}: vec4<f32>,\n", loc, name));
        }
        out.push_str("};\n");

        out.push_str("@fragment\n");
        out.push_str("fn fs_main(input: FragmentInput) -> @location(0) vec4<f32> {\n");
        out.push_str("    var oC0: vec4<f32> = vec4<f32>(0.0);\n");
        for idx in used_temp_indices(shader) {
            out.push_str(&format!("    var r{0}: vec4<f32> = vec4<f32>(0.0);\n", idx));
        }
        for stage in crate::emit::common::texture_local_stages(shader) {
            out.push_str(&format!("    var t{0}: vec4<f32> = input.v_texcoord{0};\n", stage));
        }
        for instr in &shader.instructions {
            out.push_str("    ");
            out.push_str(&lower_instruction(instr, shader, &syn));
            out.push('\n');
        }
        out.push_str("    return oC0;\n");
        out.push_str("}\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn texture_register_read_only_as_a_source_still_gets_a_local() {
        let shader = parse("ps.1.1\nmul r0, t0, c0\nmov oC0, r0\n").unwrap();
        let out = emit(&shader);
        assert!(out.contains("var t0: vec4<f32> = input.v_texcoord0;"));
        assert!(out.contains("v_texcoord0"));
    }
}
