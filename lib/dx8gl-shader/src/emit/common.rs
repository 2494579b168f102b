//! Instruction-lowering logic shared by the target-A (GLSL) and target-B
//! (WGSL) emitters (spec §4.3/§4.4, REDESIGN FLAGS "manual string building
//! for shader emission"). Each target supplies a [`Syntax`] implementation
//! covering the handful of places the two host languages actually diverge
//! (constructors, builtin names, binding access); everything else — operand
//! expansion, modifier wrapping, per-opcode lowering — is written once here.

use dx8gl_types::{Component, Modifier, Opcode, Register, RegisterType};

use crate::ir::{Instruction, ParsedShader, Semantic};
use crate::lexer::{attribute_output_slot, AttributeOutputSlot};

/// The lexical differences between the two emission targets.
pub trait Syntax {
    fn vec4(&self, c: [&str; 4]) -> String;
    fn vec4_splat(&self, scalar: &str) -> String;
    fn inv_sqrt(&self, e: &str) -> String;
    /// `true` if any of the first three components of `e` is negative
    /// (spec §4.3 `texkill`: "discard when any of `src.xyz < 0`").
    fn any_neg3(&self, e: &str) -> String;
    fn sample(&self, stage: u32, coord_xy: &str) -> String;
    fn bem(&self, stage: u32, src_xy: &str, coord_xy: &str) -> String;
    fn constant_ref(&self, idx_expr: String) -> String;
    fn temp_name(&self, idx: u32) -> String;
    fn input_name(&self, shader: &ParsedShader, idx: u32) -> String;
    fn address_name(&self) -> String;
    fn texture_name(&self, idx: u32) -> String;
    fn position_name(&self) -> String;
    fn color_output_name(&self) -> String;
    fn attribute_output_name(&self, slot: AttributeOutputSlot) -> String;
}

/// Semantic-based attribute name for a vertex-input register (spec §4.1
/// edge case: "an undeclared input is treated as position at index 0 with
/// a warning").
pub fn input_semantic_name(shader: &ParsedShader, idx: u32) -> String {
    let semantic = shader.declared_inputs.get(&idx).copied().unwrap_or_else(|| {
        log::warn!("vertex input v{} referenced without a dcl_ directive; treating as position", idx);
        Semantic::Position
    });
    match semantic {
        Semantic::Position => "a_position".to_string(),
        Semantic::Normal => "a_normal".to_string(),
        Semantic::Color => "a_color".to_string(),
        Semantic::BlendWeight => "a_blendweight".to_string(),
        Semantic::BlendIndices => "a_blendindices".to_string(),
        Semantic::Texcoord(0) => "a_texcoord".to_string(),
        Semantic::Texcoord(n) => format!("a_texcoord{}", n),
    }
}

fn base_ref(reg: &Register, shader: &ParsedShader, syn: &dyn Syntax) -> String {
    match reg.reg_type {
        RegisterType::Temp => syn.temp_name(reg.index),
        RegisterType::VertexInput => syn.input_name(shader, reg.index),
        RegisterType::Constant => match reg.relative {
            Some(rel) => syn.constant_ref(format!("{} + {}", syn.address_name(), rel.offset)),
            None => syn.constant_ref(reg.index.to_string()),
        },
        RegisterType::Address => syn.address_name(),
        RegisterType::Texture => syn.texture_name(reg.index),
        RegisterType::Sampler => syn.texture_name(reg.index),
        RegisterType::RasterizerOutput => syn.position_name(),
        RegisterType::ColorOutput => syn.color_output_name(),
        RegisterType::AttributeOutput => syn.attribute_output_name(attribute_output_slot(reg.index)),
    }
}

fn apply_modifier(expr: &str, m: Modifier, syn: &dyn Syntax) -> String {
    match m {
        Modifier::None => expr.to_string(),
        Modifier::Saturate => format!("clamp({}, {}, {})", expr, syn.vec4_splat("0.0"), syn.vec4_splat("1.0")),
        Modifier::X2 => format!("({} * {})", expr, syn.vec4_splat("2.0")),
        Modifier::X4 => format!("({} * {})", expr, syn.vec4_splat("4.0")),
        Modifier::Half => format!("({} * {})", expr, syn.vec4_splat("0.5")),
        Modifier::Bias => format!("({} - {})", expr, syn.vec4_splat("0.5")),
        Modifier::BiasAndDouble => format!("(({} * {}) - {})", expr, syn.vec4_splat("2.0"), syn.vec4_splat("1.0")),
        Modifier::Complement => format!("({} - {})", syn.vec4_splat("1.0"), expr),
    }
}

/// Reads a source register: base name, swizzle (always 4 components wide,
/// replication already baked in by the parser), modifier, then negation
/// last (spec §4.3: "Negation applies after modifier expansion").
fn source_expr(reg: &Register, shader: &ParsedShader, syn: &dyn Syntax) -> String {
    let base = base_ref(reg, shader, syn);
    let swizzled = if reg.swizzle.is_identity() {
        base
    } else {
        format!("({}).{}", base, reg.swizzle.as_str())
    };
    let modified = apply_modifier(&swizzled, reg.modifier, syn);
    if reg.negate {
        format!("(-{})", modified)
    } else {
        modified
    }
}

fn matrix_expr(instr: &Instruction, dot_width: usize, rows: usize, shader: &ParsedShader, syn: &dyn Syntax) -> String {
    let src0 = source_expr(&instr.srcs[0], shader, syn);
    let base_index = instr.srcs[1].index;
    let width_swizzle = if dot_width == 3 { ".xyz" } else { "" };
    let mut comps: Vec<String> = Vec::with_capacity(4);
    for i in 0..4u32 {
        if (i as usize) < rows {
            let row_ref = syn.constant_ref((base_index + i).to_string());
            comps.push(format!("dot(({}){}, ({}){})", src0, width_swizzle, row_ref, width_swizzle));
        } else {
            comps.push("0.0".to_string());
        }
    }
    syn.vec4([&comps[0], &comps[1], &comps[2], &comps[3]])
}

fn lit_expr(src0: &str, syn: &dyn Syntax) -> String {
    // Standard D3D `lit` formula: {1, max(n.x, 0), (n.x > 0 && n.y > 0) ? n.y^n.w : 0, 1}.
    let nx = format!("({}).x", src0);
    let ny = format!("({}).y", src0);
    let nw = format!("({}).w", src0);
    let specular = format!(
        "(({nx} > 0.0 && {ny} > 0.0) ? pow({ny}, {nw}) : 0.0)",
        nx = nx,
        ny = ny,
        nw = nw
    );
    syn.vec4(["1.0", &format!("max({}, 0.0)", nx), &specular, "1.0"])
}

fn dst_expr(src0: &str, src1: &str, syn: &dyn Syntax) -> String {
    // Standard D3D `dst` formula: {1, src0.y*src1.y, src0.z, src1.w}.
    syn.vec4([
        "1.0",
        &format!("(({0}).y * ({1}).y)", src0, src1),
        &format!("({}).z", src0),
        &format!("({}).w", src1),
    ])
}

fn op_result(instr: &Instruction, shader: &ParsedShader, syn: &dyn Syntax) -> String {
    let srcs: Vec<String> = instr.srcs.iter().map(|s| source_expr(s, shader, syn)).collect();
    use Opcode::*;
    match instr.opcode {
        Mov => srcs[0].clone(),
        Add => format!("({} + {})", srcs[0], srcs[1]),
        Sub => format!("({} - {})", srcs[0], srcs[1]),
        Mul => format!("({} * {})", srcs[0], srcs[1]),
        Mad => format!("(({} * {}) + {})", srcs[0], srcs[1], srcs[2]),
        Rcp => syn.vec4_splat(&format!("(1.0 / ({}).x)", srcs[0])),
        Rsq => syn.vec4_splat(&syn.inv_sqrt(&format!("({}).x", srcs[0]))),
        Frc => format!("fract({})", srcs[0]),
        Dp3 => syn.vec4_splat(&format!("dot(({}).xyz, ({}).xyz)", srcs[0], srcs[1])),
        Dp4 => syn.vec4_splat(&format!("dot({}, {})", srcs[0], srcs[1])),
        Min => format!("min({}, {})", srcs[0], srcs[1]),
        Max => format!("max({}, {})", srcs[0], srcs[1]),
        // slt/sge expand through `step`, which both host languages provide
        // with identical semantics; avoids needing a boolean-vector cast.
        Slt => format!("({} - step({}, {}))", syn.vec4_splat("1.0"), srcs[1], srcs[0]),
        Sge => format!("step({}, {})", srcs[1], srcs[0]),
        Exp | Expp => format!("exp2({})", srcs[0]),
        Log | Logp => format!("log2({})", srcs[0]),
        Lit => lit_expr(&srcs[0], syn),
        Dst => dst_expr(&srcs[0], &srcs[1], syn),
        Lrp => format!("mix({}, {}, {})", srcs[2], srcs[1], srcs[0]),
        M4x4 => matrix_expr(instr, 4, 4, shader, syn),
        M4x3 => matrix_expr(instr, 4, 3, shader, syn),
        M3x4 => matrix_expr(instr, 3, 4, shader, syn),
        M3x3 => matrix_expr(instr, 3, 3, shader, syn),
        M3x2 => matrix_expr(instr, 3, 2, shader, syn),
        Tex => {
            let dest = instr.dest.as_ref().expect("tex always has a destination");
            let coord = srcs.first().cloned().unwrap_or_else(|| syn.texture_name(dest.index));
            syn.sample(dest.index, &format!("({}).xy", coord))
        }
        Texcoord => {
            let dest = instr.dest.as_ref().expect("texcoord always has a destination");
            syn.texture_name(dest.index)
        }
        Cnd => format!("mix({}, {}, step(0.5, ({}).a))", srcs[2], srcs[1], srcs[0]),
        Cmp => format!("mix({}, {}, step({}, {}))", srcs[2], srcs[1], syn.vec4_splat("0.0"), srcs[0]),
        Bem => {
            let dest = instr.dest.as_ref().expect("bem always has a destination");
            let coord = syn.texture_name(dest.index);
            syn.bem(dest.index, &format!("({}).xy", srcs[0]), &format!("({}).xy", coord))
        }
        Sincos => syn.vec4([
            &format!("cos(({}).x)", srcs[0]),
            &format!("sin(({}).x)", srcs[0]),
            "0.0",
            "0.0",
        ]),
        Texkill | Phase | Dcl | Def | End => {
            unreachable!("directive/marker opcodes are handled by lower_instruction, not op_result")
        }
    }
}

/// Lowers one instruction to a single output statement (spec §4.3: "Each
/// instruction lowers to one statement").
pub fn lower_instruction(instr: &Instruction, shader: &ParsedShader, syn: &dyn Syntax) -> String {
    match instr.opcode {
        Opcode::Phase => "// --- phase boundary ---".to_string(),
        Opcode::Texkill => {
            let src = source_expr(&instr.srcs[0], shader, syn);
            format!("if ({}) {{ discard; }}", syn.any_neg3(&src))
        }
        _ => {
            let dest = instr.dest.as_ref().expect("non-directive instruction has a destination");
            let lvalue = base_ref(dest, shader, syn);
            let mask = dest.write_mask.as_str();
            let result = op_result(instr, shader, syn);
            let final_expr = apply_modifier(&result, instr.dest_modifier, syn);
            if mask.is_empty() {
                format!("{} = {};", lvalue, final_expr)
            } else {
                format!("{}.{} = ({}).{};", lvalue, mask, final_expr, mask)
            }
        }
    }
}

/// Every distinct temp register index read or written, in ascending order
/// (spec §4.3: "tracks the set of temporary register indices used and
/// declares them at block entry").
pub fn used_temp_indices(shader: &ParsedShader) -> Vec<u32> {
    let mut out = Vec::new();
    for instr in &shader.instructions {
        if let Some(d) = &instr.dest {
            if d.reg_type == RegisterType::Temp {
                out.push(d.index);
            }
        }
        for s in &instr.srcs {
            if s.reg_type == RegisterType::Temp {
                out.push(s.index);
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Every distinct vertex-input register index read, in ascending order.
pub fn used_input_indices(shader: &ParsedShader) -> Vec<u32> {
    let mut out = Vec::new();
    for instr in &shader.instructions {
        for s in &instr.srcs {
            if s.reg_type == RegisterType::VertexInput {
                out.push(s.index);
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Whether any instruction samples through `bem`, and which stages — the
/// per-stage environment-matrix uniform is only needed for those.
pub fn bem_stages(shader: &ParsedShader) -> Vec<u32> {
    let mut out: Vec<u32> = shader
        .instructions
        .iter()
        .filter(|i| i.opcode == Opcode::Bem)
        .filter_map(|i| i.dest.as_ref())
        .map(|d| d.index)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

/// Every texture-register stage that needs a local `t{idx}` copy declared:
/// the union of stages written by `tex`/`bem` and every stage merely read
/// as a source elsewhere (e.g. `mul r0, t0, c0`). Declaring locals only
/// for `tex`/`bem` destinations misses the latter and emits a reference to
/// an undeclared identifier (spec §4.3/§4.4).
pub fn texture_local_stages(shader: &ParsedShader) -> Vec<u32> {
    let mut out = shader.referenced_texture_stages();
    if let Some(read_stages) = shader.referenced_varyings().get(&RegisterType::Texture) {
        out.extend(read_stages.iter().copied());
    }
    out.sort_unstable();
    out.dedup();
    out
}

pub fn component_letters(comps: &[Component]) -> String {
    comps.iter().map(|c| c.as_char()).collect()
}
