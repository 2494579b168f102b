use dx8gl_types::{check_constant_index, check_texture_stage, Opcode, Register, RegisterType, ShaderKind, ShaderVersion};

use crate::error::{ParseError, ParseResult};
use crate::ir::{Instruction, ParsedShader, Semantic};
use crate::lexer::{parse_register, split_instruction, split_opcode_modifier, strip_comment};

/// Parses a textual vs.1.1 / ps.1.1-1.4 shader blob into IR (spec §4.1).
pub fn parse(source: &str) -> ParseResult<ParsedShader> {
    let mut lines = source.lines().enumerate().map(|(i, l)| (i + 1, l));

    let (header_line_no, header_line) = loop {
        match lines.next() {
            Some((n, l)) if strip_comment(l).trim().is_empty() => continue,
            Some((n, l)) => break (n, l),
            None => return Err(ParseError::new(1, "missing version header")),
        }
    };

    let (kind, version) = parse_header(strip_comment(header_line).trim(), header_line_no)?;
    let mut shader = ParsedShader::new(version, kind);

    for (line_no, raw_line) in lines {
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("def") {
            if rest.starts_with(|c: char| c.is_whitespace()) || rest.is_empty() {
                parse_def(rest.trim(), line_no, &mut shader)?;
                continue;
            }
        }
        if let Some(rest) = line.strip_prefix("dcl_") {
            parse_dcl(rest, line_no, kind, &mut shader)?;
            continue;
        }
        parse_instruction(line, line_no, kind, &mut shader)?;
    }

    Ok(shader)
}

fn parse_header(line: &str, line_no: usize) -> ParseResult<(ShaderKind, ShaderVersion)> {
    if let Some(rest) = line.strip_prefix("vs.") {
        finish_header(ShaderKind::Vertex, rest, line_no)
    } else if let Some(rest) = line.strip_prefix("ps.") {
        finish_header(ShaderKind::Pixel, rest, line_no)
    } else {
        Err(ParseError::new(
            line_no,
            format!("expected 'vs.M.N' or 'ps.M.N' header, got '{}'", line),
        ))
    }
}

fn finish_header(kind: ShaderKind, rest: &str, line_no: usize) -> ParseResult<(ShaderKind, ShaderVersion)> {
    let mut parts = rest.splitn(2, '.');
    let major: u8 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::new(line_no, "malformed version header"))?;
    let minor: u8 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ParseError::new(line_no, "malformed version header"))?;
    let version = ShaderVersion { major, minor };
    if !version.is_supported(kind) {
        return Err(ParseError::new(
            line_no,
            format!("unsupported shader version {}.{}", major, minor),
        ));
    }
    Ok((kind, version))
}

fn parse_def(rest: &str, line_no: usize, shader: &mut ParsedShader) -> ParseResult<()> {
    let mut parts = rest.splitn(2, ',');
    let reg_token = parts
        .next()
        .ok_or_else(|| ParseError::new(line_no, "malformed def directive"))?
        .trim();
    let index = reg_token
        .strip_prefix('c')
        .and_then(|d| d.parse::<u32>().ok())
        .ok_or_else(|| ParseError::new(line_no, format!("def target must be a constant register, got '{}'", reg_token)))?;

    let values_str = parts.next().unwrap_or("");
    let values: Vec<f32> = values_str
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|_| ParseError::new(line_no, format!("'{}' is not a float", v.trim())))
        })
        .collect::<ParseResult<Vec<f32>>>()?;

    if values.len() != 4 {
        return Err(ParseError::new(
            line_no,
            format!("def c{} must be followed by exactly four floats, got {}", index, values.len()),
        ));
    }

    shader
        .constants
        .insert(index, [values[0], values[1], values[2], values[3]]);
    Ok(())
}

fn parse_dcl(rest: &str, line_no: usize, kind: ShaderKind, shader: &mut ParsedShader) -> ParseResult<()> {
    if kind != ShaderKind::Vertex {
        return Err(ParseError::new(line_no, "dcl_ directives are only valid in vertex shaders"));
    }
    let mut parts = rest.splitn(2, char::is_whitespace);
    let semantic_name = parts.next().unwrap_or("");
    let reg_token = parts.next().unwrap_or("").trim();

    let semantic = parse_semantic(semantic_name, line_no)?;
    let reg = parse_register(reg_token, line_no, true)?;
    if reg.reg_type != RegisterType::VertexInput {
        return Err(ParseError::new(
            line_no,
            format!("dcl_{} must target a vertex-input register", semantic_name),
        ));
    }
    shader.declared_inputs.insert(reg.index, semantic);
    Ok(())
}

fn parse_semantic(name: &str, line_no: usize) -> ParseResult<Semantic> {
    if name == "position" {
        Ok(Semantic::Position)
    } else if name == "normal" {
        Ok(Semantic::Normal)
    } else if name == "color" {
        Ok(Semantic::Color)
    } else if name == "blendweight" {
        Ok(Semantic::BlendWeight)
    } else if name == "blendindices" {
        Ok(Semantic::BlendIndices)
    } else if let Some(n) = name.strip_prefix("texcoord") {
        let idx = if n.is_empty() { 0 } else { n.parse().unwrap_or(0) };
        Ok(Semantic::Texcoord(idx))
    } else {
        Err(ParseError::new(line_no, format!("unknown dcl semantic '{}'", name)))
    }
}

fn parse_instruction(
    line: &str,
    line_no: usize,
    kind: ShaderKind,
    shader: &mut ParsedShader,
) -> ParseResult<()> {
    let (head, reg_tokens) = split_instruction(line)?;
    let (op_str, dest_modifier_suffix) = split_opcode_modifier(&head);

    if op_str == "end" {
        return Ok(());
    }

    let opcode = opcode_from_str(&op_str)
        .ok_or_else(|| ParseError::new(line_no, format!("unrecognized opcode '{}'", op_str)))?;

    if opcode == Opcode::Phase && kind != ShaderKind::Pixel {
        return Err(ParseError::new(line_no, "'phase' is only valid in pixel shaders"));
    }
    if opcode.vertex_only() && kind != ShaderKind::Vertex {
        return Err(ParseError::new(line_no, format!("'{}' is only valid in vertex shaders", op_str)));
    }
    if opcode.pixel_only() && kind != ShaderKind::Pixel {
        return Err(ParseError::new(line_no, format!("'{}' is only valid in pixel shaders", op_str)));
    }

    let mut tokens = reg_tokens.into_iter();
    let dest = if opcode.has_destination() {
        let tok = tokens
            .next()
            .ok_or_else(|| ParseError::new(line_no, format!("'{}' requires a destination register", op_str)))?;
        let reg = parse_register(&tok, line_no, true)?;
        check_dest_legal(kind, shader.version, opcode, reg.reg_type, line_no, &op_str)?;
        check_register_bounds(&reg, kind, line_no)?;
        Some(reg)
    } else {
        None
    };

    let mut srcs = smallvec::SmallVec::new();
    for tok in tokens {
        let reg = parse_register(&tok, line_no, false)?;
        if reg.reg_type == RegisterType::Address {
            if !shader.address_written {
                return Err(ParseError::new(line_no, "address register read before write"));
            }
        }
        if reg.reg_type == RegisterType::Constant && reg.relative.is_some() && !shader.address_written {
            return Err(ParseError::new(line_no, "address register read before write"));
        }
        check_register_bounds(&reg, kind, line_no)?;
        srcs.push(reg);
    }

    if opcode == Opcode::Sincos && srcs.len() == 1 {
        if !srcs[0].swizzle.is_identity() && srcs[0].swizzle.get(0) != srcs[0].swizzle.get(1) {
            // allow `.x`-style replicated swizzle (scalar read); anything
            // else is not a single scalar source.
            return Err(ParseError::new(line_no, "'sincos' source must be a single scalar"));
        }
    }

    if dest
        .as_ref()
        .map(|d| d.reg_type == RegisterType::RasterizerOutput)
        .unwrap_or(false)
    {
        shader.uses_position = true;
    }
    if dest
        .as_ref()
        .map(|d| d.reg_type == RegisterType::Address)
        .unwrap_or(false)
    {
        shader.address_written = true;
    }

    shader.instructions.push(Instruction {
        opcode,
        dest_modifier: dest_modifier_suffix,
        dest,
        srcs,
        line: line_no,
    });

    Ok(())
}

/// Rejects out-of-range constant and texture-stage indices at parse time
/// (spec §7 "Out-of-range parameter"; spec §8 boundary behaviors: constant
/// index 95/96 for vertex, 31/32 for pixel, texture stage 7/8). Relative
/// addressing (`c[a0.x + k]`) is not range-checked here since its resolved
/// index is only known at draw time, not at parse time.
fn check_register_bounds(reg: &Register, kind: ShaderKind, line_no: usize) -> ParseResult<()> {
    match reg.reg_type {
        RegisterType::Constant if reg.relative.is_none() => {
            check_constant_index(kind == ShaderKind::Pixel, reg.index)
                .map_err(|err| ParseError::new(line_no, err.to_string()))
        }
        RegisterType::Texture | RegisterType::Sampler => {
            check_texture_stage(reg.index).map_err(|err| ParseError::new(line_no, err.to_string()))
        }
        _ => Ok(()),
    }
}

fn check_dest_legal(
    kind: ShaderKind,
    version: ShaderVersion,
    opcode: Opcode,
    ty: RegisterType,
    line_no: usize,
    op: &str,
) -> ParseResult<()> {
    use RegisterType::*;
    // `tex`/`texld` and `bem` are the instructions that address the
    // texture-register space itself (spec §4.1 "texture registers become
    // read-only sources after `texld`" describes what happens to them
    // afterwards, not the addressing instruction itself); every other
    // opcode is ordinary computation and follows the plain legality table.
    let is_texture_addressing = matches!(opcode, Opcode::Tex | Opcode::Bem);
    let legal = match kind {
        ShaderKind::Vertex => matches!(ty, Temp | Address | RasterizerOutput | AttributeOutput),
        ShaderKind::Pixel if version.minor == 4 && !is_texture_addressing => {
            matches!(ty, Temp | ColorOutput)
        }
        ShaderKind::Pixel => matches!(ty, Temp | Texture | ColorOutput),
    };
    if legal {
        Ok(())
    } else {
        Err(ParseError::new(
            line_no,
            format!("'{}' may not write to a register of this type in a {:?} shader", op, kind),
        ))
    }
}

fn opcode_from_str(s: &str) -> Option<Opcode> {
    use Opcode::*;
    Some(match s {
        "mov" => Mov,
        "add" => Add,
        "sub" => Sub,
        "mad" => Mad,
        "mul" => Mul,
        "rcp" => Rcp,
        "rsq" => Rsq,
        "dp3" => Dp3,
        "dp4" => Dp4,
        "min" => Min,
        "max" => Max,
        "slt" => Slt,
        "sge" => Sge,
        "exp" => Exp,
        "log" => Log,
        "lit" => Lit,
        "dst" => Dst,
        "lrp" => Lrp,
        "frc" => Frc,
        "m4x4" => M4x4,
        "m4x3" => M4x3,
        "m3x4" => M3x4,
        "m3x3" => M3x3,
        "m3x2" => M3x2,
        "tex" | "texld" => Tex,
        "texcoord" => Texcoord,
        "texkill" => Texkill,
        "cnd" => Cnd,
        "cmp" => Cmp,
        "bem" => Bem,
        "phase" => Phase,
        "expp" => Expp,
        "logp" => Logp,
        "sincos" => Sincos,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_vertex_shader_parses() {
        // spec §8 end-to-end scenario 1.
        let shader = parse("vs.1.1\ndcl_position v0\nm4x4 oPos, v0, c0\n").unwrap();
        assert_eq!(shader.version, ShaderVersion { major: 1, minor: 1 });
        assert_eq!(shader.instructions.len(), 1);
        assert!(shader.uses_position);
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(parse("dcl_position v0\n").is_err());
    }

    #[test]
    fn vertex_constant_index_95_accepted_96_rejected() {
        assert!(parse("vs.1.1\ndcl_position v0\nmov oPos, c95\n").is_ok());
        assert!(parse("vs.1.1\ndcl_position v0\nmov oPos, c96\n").is_err());
    }

    #[test]
    fn pixel_constant_index_31_accepted_32_rejected() {
        assert!(parse("ps.1.4\nmov r0, c31\nmov oC0, r0\n").is_ok());
        assert!(parse("ps.1.4\nmov r0, c32\nmov oC0, r0\n").is_err());
    }

    #[test]
    fn texture_stage_7_accepted_8_rejected() {
        assert!(parse("ps.1.4\ntex t7\nmov oC0, t7\n").is_ok());
        assert!(parse("ps.1.4\ntex t8\nmov oC0, t8\n").is_err());
    }

    #[test]
    fn ps_1_4_rejects_ordinary_writes_to_texture_registers() {
        // spec §4.1 register-type legality table: ps.1.4 destinations are
        // limited to temp/color-output; `t#` is a read-only source there.
        assert!(parse("ps.1.4\nmov t0, c0\nmov oC0, t0\n").is_err());
        // The same write is still legal for ps <= 1.3.
        assert!(parse("ps.1.3\nmov t0, c0\nmov oC0, t0\n").is_ok());
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        assert!(parse("ps.1.1\nbogus r0, c0\nmov oC0, r0\n").is_err());
    }

    #[test]
    fn dest_to_illegal_register_type_is_rejected() {
        // A pixel shader may not write the vertex-only rasterizer output.
        assert!(parse("ps.1.1\nmov oPos, c0\n").is_err());
    }
}
