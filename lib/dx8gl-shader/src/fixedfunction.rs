//! Fixed-function pipeline synthesis (spec §4.8). Unlike the IR-based
//! emitters, there is no `vs.1.1`/`ps.1.1` source to lex: the synthesizer
//! builds vertex/fragment shader text directly from a small configuration
//! covering lighting, fog, and the enabled texture stages.

/// Fully determines one synthesized shader pair. `Hash`able so it can key
/// the fixed-function cache directly (spec §4.8: "cached on the
/// configuration itself so repeated configurations reuse the shader pair").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedFunctionConfig {
    pub lighting_enabled: bool,
    pub fog_enabled: bool,
    pub texture_stage_bitmask: u8,
    pub vertex_has_color: bool,
    pub transform_texcoords: bool,
}

impl FixedFunctionConfig {
    pub fn texture_stages(&self) -> impl Iterator<Item = u32> + '_ {
        (0..8u32).filter(move |i| self.texture_stage_bitmask & (1 << i) != 0)
    }
}

/// A synthesized vertex/fragment shader pair, in one target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
}

pub fn synthesize_glsl(config: &FixedFunctionConfig) -> ShaderPair {
    ShaderPair {
        vertex: glsl_vertex(config),
        fragment: glsl_fragment(config),
    }
}

pub fn synthesize_wgsl(config: &FixedFunctionConfig) -> ShaderPair {
    ShaderPair {
        vertex: wgsl_vertex(config),
        fragment: wgsl_fragment(config),
    }
}

fn glsl_vertex(cfg: &FixedFunctionConfig) -> String {
    let mut out = String::new();
    out.push_str("#version 100\n");
    out.push_str("// synthesized fixed-function vertex shader\n");
    out.push_str("attribute vec4 a_position;\n");
    if cfg.lighting_enabled {
        out.push_str("attribute vec3 a_normal;\n");
    }
    if cfg.vertex_has_color {
        out.push_str("attribute vec4 a_color;\n");
    }
    for stage in cfg.texture_stages() {
        out.push_str(&format!("attribute vec2 a_texcoord{};\n", stage));
    }

    out.push_str("varying vec4 v_color;\n");
    if cfg.fog_enabled {
        out.push_str("varying float v_fog;\n");
    }
    for stage in cfg.texture_stages() {
        out.push_str(&format!("varying vec2 v_texcoord{};\n", stage));
    }

    out.push_str("uniform mat4 u_model_view_proj;\n");
    if cfg.lighting_enabled {
        out.push_str("uniform mat3 u_normal_matrix;\n");
        out.push_str("uniform vec3 u_light_direction;\n");
        out.push_str("uniform vec3 u_light_color;\n");
        out.push_str("uniform vec3 u_ambient_color;\n");
    }
    if cfg.fog_enabled {
        out.push_str("uniform float u_fog_start;\n");
        out.push_str("uniform float u_fog_end;\n");
    }
    if cfg.transform_texcoords {
        for stage in cfg.texture_stages() {
            out.push_str(&format!("uniform mat3 u_texture_matrix{};\n", stage));
        }
    }

    out.push_str("void main() {\n");
    out.push_str("    gl_Position = u_model_view_proj * a_position;\n");
    if cfg.lighting_enabled {
        out.push_str("    vec3 n = normalize(u_normal_matrix * a_normal);\n");
        out.push_str("    float ndotl = max(dot(n, normalize(-u_light_direction)), 0.0);\n");
        out.push_str("    vec3 lit = u_ambient_color + u_light_color * ndotl;\n");
        if cfg.vertex_has_color {
            out.push_str("    v_color = vec4(lit, 1.0) * a_color;\n");
        } else {
            out.push_str("    v_color = vec4(lit, 1.0);\n");
        }
    } else if cfg.vertex_has_color {
        out.push_str("    v_color = a_color;\n");
    } else {
        out.push_str("    v_color = vec4(1.0);\n");
    }
    if cfg.fog_enabled {
        out.push_str("    float dist = length((u_model_view_proj * a_position).xyz);\n");
        out.push_str("    v_fog = clamp((u_fog_end - dist) / (u_fog_end - u_fog_start), 0.0, 1.0);\n");
    }
    for stage in cfg.texture_stages() {
        if cfg.transform_texcoords {
            out.push_str(&format!(
                "    v_texcoord{0} = (u_texture_matrix{0} * vec3(a_texcoord{0}, 1.0)).xy;\n",
                stage
            ));
        } else {
            out.push_str(&format!("    v_texcoord{0} = a_texcoord{0};\n", stage));
        }
    }
    out.push_str("}\n");
    out
}

fn glsl_fragment(cfg: &FixedFunctionConfig) -> String {
    let mut out = String::new();
    out.push_str("#version 100\n");
    out.push_str("// synthesized fixed-function fragment shader\n");
    out.push_str("varying vec4 v_color;\n");
    if cfg.fog_enabled {
        out.push_str("varying float v_fog;\n");
    }
    for stage in cfg.texture_stages() {
        out.push_str(&format!("varying vec2 v_texcoord{};\n", stage));
    }
    for stage in cfg.texture_stages() {
        out.push_str(&format!("uniform sampler2D u_sampler{};\n", stage));
    }
    out.push_str("uniform bool u_alpha_test_enabled;\n");
    out.push_str("uniform float u_alpha_test_threshold;\n");
    if cfg.fog_enabled {
        out.push_str("uniform vec3 u_fog_color;\n");
    }

    out.push_str("void main() {\n");
    out.push_str("    vec4 color = v_color;\n");
    for stage in cfg.texture_stages() {
        out.push_str(&format!("    color *= texture2D(u_sampler{0}, v_texcoord{0});\n", stage));
    }
    out.push_str("    if (u_alpha_test_enabled && color.a < u_alpha_test_threshold) { discard; }\n");
    if cfg.fog_enabled {
        out.push_str("    color.rgb = mix(u_fog_color, color.rgb, v_fog);\n");
    }
    out.push_str("    gl_FragColor = color;\n");
    out.push_str("}\n");
    out
}

/// Builds a struct definition from an already-formatted field list, joined
/// with commas rather than built by concatenation-then-seek-backwards
/// (spec §9 REDESIGN FLAGS: the original's `FixedFunctionWGSLGenerator`
/// trims a trailing comma by walking the output buffer backwards; this
/// depends on exact byte layout and is not worth reproducing).
fn write_struct(out: &mut String, name: &str, fields: &[String]) {
    out.push_str(&format!("struct {} {{\n", name));
    let body: Vec<String> = fields.iter().map(|f| format!("    {}", f)).collect();
    out.push_str(&body.join(",\n"));
    out.push_str(",\n};\n");
}

fn wgsl_vertex(cfg: &FixedFunctionConfig) -> String {
    let mut input_fields = vec!["@location(0) position: vec4<f32>".to_string()];
    let mut loc = 1u32;
    if cfg.lighting_enabled {
        input_fields.push(format!("@location({}) normal: vec3<f32>", loc));
        loc += 1;
    }
    if cfg.vertex_has_color {
        input_fields.push(format!("@location({}) color: vec4<f32>", loc));
        loc += 1;
    }
    for stage in cfg.texture_stages() {
        input_fields.push(format!("@location({}) texcoord{}: vec2<f32>", loc, stage));
        loc += 1;
    }

    let mut output_fields = vec![
        "@builtin(position) position: vec4<f32>".to_string(),
        "@location(0) color: vec4<f32>".to_string(),
    ];
    let mut out_loc = 1u32;
    if cfg.fog_enabled {
        output_fields.push(format!("@location({}) fog: f32", out_loc));
        out_loc += 1;
    }
    for stage in cfg.texture_stages() {
        output_fields.push(format!("@location({}) texcoord{}: vec2<f32>", out_loc, stage));
        out_loc += 1;
    }

    let mut uniform_fields = vec!["model_view_proj: mat4x4<f32>".to_string()];
    if cfg.lighting_enabled {
        uniform_fields.push("normal_matrix: mat3x3<f32>".to_string());
        uniform_fields.push("light_direction: vec3<f32>".to_string());
        uniform_fields.push("light_color: vec3<f32>".to_string());
        uniform_fields.push("ambient_color: vec3<f32>".to_string());
    }
    if cfg.fog_enabled {
        uniform_fields.push("fog_start: f32".to_string());
        uniform_fields.push("fog_end: f32".to_string());
    }
    if cfg.transform_texcoords {
        for stage in cfg.texture_stages() {
            uniform_fields.push(format!("texture_matrix{}: mat3x3<f32>", stage));
        }
    }

    let mut out = String::new();
    out.push_str("// synthesized fixed-function vertex shader\n");
    write_struct(&mut out, "VertexInput", &input_fields);
    write_struct(&mut out, "VertexOutput", &output_fields);
    write_struct(&mut out, "Uniforms", &uniform_fields);
    out.push_str("@group(0) @binding(0) var<uniform> uniforms: Uniforms;\n");

    out.push_str("@vertex\n");
    out.push_str("fn vs_main(input: VertexInput) -> VertexOutput {\n");
    out.push_str("    var output: VertexOutput;\n");
    out.push_str("    output.position = uniforms.model_view_proj * input.position;\n");
    if cfg.lighting_enabled {
        out.push_str("    let n = normalize(uniforms.normal_matrix * input.normal);\n");
        out.push_str("    let ndotl = max(dot(n, normalize(-uniforms.light_direction)), 0.0);\n");
        out.push_str("    let lit = uniforms.ambient_color + uniforms.light_color * ndotl;\n");
        if cfg.vertex_has_color {
            out.push_str("    output.color = vec4<f32>(lit, 1.0) * input.color;\n");
        } else {
            out.push_str("    output.color = vec4<f32>(lit, 1.0);\n");
        }
    } else if cfg.vertex_has_color {
        out.push_str("    output.color = input.color;\n");
    } else {
        out.push_str("    output.color = vec4<f32>(1.0, 1.0, 1.0, 1.0);\n");
    }
    if cfg.fog_enabled {
        out.push_str("    let dist = length((uniforms.model_view_proj * input.position).xyz);\n");
        out.push_str(
            "    output.fog = clamp((uniforms.fog_end - dist) / (uniforms.fog_end - uniforms.fog_start), 0.0, 1.0);\n",
        );
    }
    for stage in cfg.texture_stages() {
        if cfg.transform_texcoords {
            out.push_str(&format!(
                "    output.texcoord{0} = (uniforms.texture_matrix{0} * vec3<f32>(input.texcoord{0}, 1.0)).xy;\n",
                stage
            ));
        } else {
            out.push_str(&format!("    output.texcoord{0} = input.texcoord{0};\n", stage));
        }
    }
    out.push_str("    return output;\n");
    out.push_str("}\n");
    out
}

fn wgsl_fragment(cfg: &FixedFunctionConfig) -> String {
    let mut input_fields = vec!["@location(0) color: vec4<f32>".to_string()];
    let mut loc = 1u32;
    if cfg.fog_enabled {
        input_fields.push(format!("@location({}) fog: f32", loc));
        loc += 1;
    }
    for stage in cfg.texture_stages() {
        input_fields.push(format!("@location({}) texcoord{}: vec2<f32>", loc, stage));
        loc += 1;
    }

    let mut out = String::new();
    out.push_str("// synthesized fixed-function fragment shader\n");
    write_struct(&mut out, "FragmentInput", &input_fields);
    for (slot, stage) in cfg.texture_stages().enumerate() {
        out.push_str(&format!("@group(1) @binding({}) var samp{}: sampler;\n", slot * 2, stage));
        out.push_str(&format!(
            "@group(1) @binding({}) var tex{}: texture_2d<f32>;\n",
            slot * 2 + 1,
            stage
        ));
    }
    if cfg.fog_enabled {
        out.push_str("@group(0) @binding(1) var<uniform> fog_color: vec3<f32>;\n");
    }
    out.push_str("@group(0) @binding(2) var<uniform> alpha_test_threshold: f32;\n");
    out.push_str("@group(0) @binding(3) var<uniform> alpha_test_enabled: u32;\n");

    out.push_str("@fragment\n");
    out.push_str("fn fs_main(input: FragmentInput) -> @location(0) vec4<f32> {\n");
    out.push_str("    var color = input.color;\n");
    for stage in cfg.texture_stages() {
        out.push_str(&format!(
            "    color = color * textureSample(tex{0}, samp{0}, input.texcoord{0});\n",
            stage
        ));
    }
    out.push_str("    if (alpha_test_enabled != 0u && color.a < alpha_test_threshold) { discard; }\n");
    if cfg.fog_enabled {
        out.push_str("    color = vec4<f32>(mix(fog_color, color.rgb, input.fog), color.a);\n");
    }
    out.push_str("    return color;\n");
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_config() -> FixedFunctionConfig {
        FixedFunctionConfig {
            lighting_enabled: false,
            fog_enabled: false,
            texture_stage_bitmask: 0,
            vertex_has_color: true,
            transform_texcoords: false,
        }
    }

    #[test]
    fn same_config_produces_identical_pair() {
        let cfg = basic_config();
        assert_eq!(synthesize_glsl(&cfg), synthesize_glsl(&cfg));
        assert_eq!(synthesize_wgsl(&cfg), synthesize_wgsl(&cfg));
    }

    #[test]
    fn lighting_adds_normal_input_and_light_uniforms() {
        let mut cfg = basic_config();
        cfg.lighting_enabled = true;
        let pair = synthesize_glsl(&cfg);
        assert!(pair.vertex.contains("a_normal"));
        assert!(pair.vertex.contains("u_light_direction"));
    }

    #[test]
    fn disabled_texture_stages_are_not_declared() {
        let mut cfg = basic_config();
        cfg.texture_stage_bitmask = 0b0000_0001;
        let pair = synthesize_wgsl(&cfg);
        assert!(pair.vertex.contains("texcoord0"));
        assert!(!pair.vertex.contains("texcoord1"));
    }

    #[test]
    fn wgsl_struct_fields_have_no_dangling_comma_artifacts() {
        let cfg = basic_config();
        let pair = synthesize_wgsl(&cfg);
        assert!(!pair.vertex.contains(",,"));
        assert!(!pair.vertex.contains(", }"));
    }
}
