//! Target-A emitter: OpenGL-style shading language (spec §4.3).

use dx8gl_types::{RegisterType, ShaderKind, MAX_PIXEL_CONSTANT_INDEX, MAX_VERTEX_CONSTANT_INDEX};

use crate::emit::common::{
    input_semantic_name, lower_instruction, used_input_indices, used_temp_indices, Syntax,
};
use crate::ir::ParsedShader;
use crate::lexer::AttributeOutputSlot;

struct GlslSyntax;

impl Syntax for GlslSyntax {
    fn vec4(&self, c: [&str; 4]) -> String {
        format!("vec4({}, {}, {}, {})", c[0], c[1], c[2], c[3])
    }
    fn vec4_splat(&self, scalar: &str) -> String {
        format!("vec4({})", scalar)
    }
    fn inv_sqrt(&self, e: &str) -> String {
        format!("inversesqrt({})", e)
    }
    fn any_neg3(&self, e: &str) -> String {
        format!("any(lessThan(({}).xyz, vec3(0.0)))", e)
    }
    fn sample(&self, stage: u32, coord_xy: &str) -> String {
        format!("texture2D(s{}, {})", stage, coord_xy)
    }
    fn bem(&self, stage: u32, src_xy: &str, coord_xy: &str) -> String {
        format!("({} + bem_mat{} * {})", coord_xy, stage, src_xy)
    }
    fn constant_ref(&self, idx_expr: String) -> String {
        format!("c[{}]", idx_expr)
    }
    fn temp_name(&self, idx: u32) -> String {
        format!("r{}", idx)
    }
    fn input_name(&self, shader: &ParsedShader, idx: u32) -> String {
        input_semantic_name(shader, idx)
    }
    fn address_name(&self) -> String {
        "a0".to_string()
    }
    fn texture_name(&self, idx: u32) -> String {
        format!("t{}", idx)
    }
    fn position_name(&self) -> String {
        "gl_Position".to_string()
    }
    fn color_output_name(&self) -> String {
        "gl_FragColor".to_string()
    }
    fn attribute_output_name(&self, slot: AttributeOutputSlot) -> String {
        match slot {
            AttributeOutputSlot::Diffuse => "v_color0".to_string(),
            AttributeOutputSlot::Specular => "v_color1".to_string(),
            AttributeOutputSlot::Texcoord(n) => format!("v_texcoord{}", n),
            AttributeOutputSlot::Fog => "v_fog".to_string(),
            AttributeOutputSlot::PointSize => "gl_PointSize".to_string(),
        }
    }
}

/// Emits a single OpenGL-style (GLSL ES 1.00 flavored) shader string for the
/// parsed IR (spec §4.3).
pub fn emit(shader: &ParsedShader) -> String {
    let syn = GlslSyntax;
    let mut out = String::new();

    out.push_str("#version 100\n");
    out.push_str(&format!(
        "// {} shader, source version {}.{}\n",
        match shader.kind {
            ShaderKind::Vertex => "vertex",
            ShaderKind::Pixel => "pixel",
        },
        shader.version.major,
        shader.version.minor,
    ));

    if shader.kind == ShaderKind::Vertex {
        for idx in used_input_indices(shader) {
            out.push_str(&format!("attribute vec4 {};\n", input_semantic_name(shader, idx)));
        }
    }

    // Varying declarations are limited to referenced slots (spec §4.3
    // "this is a hard testable property").
    let mut varying_names: Vec<String> = Vec::new();
    for (reg_type, indices) in shader.referenced_varyings() {
        if reg_type == RegisterType::RasterizerOutput {
            continue;
        }
        for idx in indices {
            let name = match reg_type {
                RegisterType::AttributeOutput => syn.attribute_output_name(crate::lexer::attribute_output_slot(idx)),
                RegisterType::Texture => format!("v_texcoord{}", idx),
                _ => continue,
            };
            if name != "gl_PointSize" {
                varying_names.push(name);
            }
        }
    }
    varying_names.sort();
    varying_names.dedup();
    for name in &varying_names {
        out.push_str(&format!("varying vec4 {};\n", name));
    }

    let constants = shader.referenced_constants();
    if !constants.is_empty() || shader.uses_address_register() {
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
        out.push_str(&format!("uniform vec4 c[{}];\n", size));
    }

    let stages = shader.referenced_texture_stages();
    for stage in &stages {
        out.push_str(&format!("uniform sampler2D s{};\n", stage));
    }
    for stage in crate::emit::common::bem_stages(shader) {
        out.push_str(&format!("uniform mat2 bem_mat{};\n", stage));
    }

    for idx in used_temp_indices(shader) {
        out.push_str(&format!("vec4 r{} = vec4(0.0);\n", idx));
    }
    if shader.uses_address_register() {
        out.push_str("int a0 = 0;\n");
    }
    if shader.kind == ShaderKind::Pixel {
        for stage in crate::emit::common::texture_local_stages(shader) {
            out.push_str(&format!("vec4 t{0} = v_texcoord{0};\n", stage));
        }
    }

    out.push_str("void main() {\n");
    for instr in &shader.instructions {
        out.push_str("    ");
        out.push_str(&lower_instruction(instr, shader, &syn));
        out.push('\n');
    }
    if shader.kind == ShaderKind::Vertex && !shader.uses_position {
        // Spec §4.1 edge case: a shader that never writes oPos still gets a
        // synthesized identity write, never a silent omission.
        let position_idx = shader
            .declared_inputs
            .iter()
            .find(|(_, s)| matches!(s, crate::ir::Semantic::Position))
            .map(|(idx, _)| *idx)
            .unwrap_or(0);
        out.push_str(&format!(
            "    gl_Position = {};\n",
            input_semantic_name(shader, position_idx)
        ));
    }
    out.push_str("}\n");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn texture_register_read_only_as_a_source_still_gets_a_local() {
        // `t0` is never a `tex`/`bem` destination here, only a source.
        let shader = parse("ps.1.1\nmul r0, t0, c0\nmov oC0, r0\n").unwrap();
        let out = emit(&shader);
        assert!(out.contains("vec4 t0 = v_texcoord0;"));
        assert!(out.contains("varying vec4 v_texcoord0;"));
    }
}
