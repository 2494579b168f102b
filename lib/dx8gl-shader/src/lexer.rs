use dx8gl_types::{Component, Modifier, Register, RegisterType, RelativeAddress, Swizzle, WriteMask};

use crate::error::{ParseError, ParseResult};

/// Strips a `;` or `//` comment and trailing whitespace from a line.
pub fn strip_comment(line: &str) -> &str {
    let cut = line.find(';').or_else(|| line.find("//"));
    match cut {
        Some(i) => line[..i].trim_end(),
        None => line.trim_end(),
    }
}

/// Splits `opcode[_modifier] dst, src0, src1, src2` into the head token and
/// the comma-separated register tokens (spec §4.1 tokenization).
pub fn split_instruction(line: &str) -> ParseResult<(String, Vec<String>)> {
    let line = line.trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("").to_string();
    let rest = parts.next().unwrap_or("").trim();
    let regs = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(|s| s.trim().to_string()).collect()
    };
    Ok((head, regs))
}

/// Parses `<opcode>[_<modifier>]` into its two components.
pub fn split_opcode_modifier(head: &str) -> (String, Modifier) {
    if let Some(idx) = head.find('_') {
        let (op, suffix) = head.split_at(idx);
        let suffix = &suffix[1..];
        if let Some(m) = Modifier::from_suffix(suffix) {
            return (op.to_lowercase(), m);
        }
    }
    (head.to_lowercase(), Modifier::None)
}

/// Parses one register token, destination or source.
pub fn parse_register(token: &str, line_no: usize, is_dest: bool) -> ParseResult<Register> {
    let mut s = token.trim();
    let negate = if let Some(rest) = s.strip_prefix('-') {
        s = rest;
        true
    } else {
        false
    };

    // Split off the trailing `.xyzw`/mask suffix, if present, but only
    // after the bracketed relative-addressing expression (if any) so that
    // `c[a0.x + 3].xyz` is split correctly.
    let (core, suffix) = split_core_and_suffix(s);

    // A source register may additionally carry a `_<modifier>` segment,
    // e.g. `r0_bias.xyz` (the same eight modifiers as the destination-side
    // `_sat`/`_x2` opcode suffix, spec §3 "a source-side modifier (same
    // enumeration as destination)").
    let (core, modifier) = split_core_and_modifier(core);

    let (reg_type, index, relative) = parse_core(core, line_no)?;

    let components = parse_component_string(suffix, line_no)?;

    let (write_mask, swizzle) = if is_dest {
        if has_duplicate(&components) {
            return Err(ParseError::new(
                line_no,
                format!("duplicate component in write mask '{}'", suffix),
            ));
        }
        (WriteMask::from_components(&components), Swizzle::IDENTITY)
    } else {
        (WriteMask::default(), Swizzle::from_parsed(&components))
    };

    Ok(Register {
        reg_type,
        index,
        write_mask,
        swizzle,
        modifier: if is_dest { Modifier::None } else { modifier },
        negate,
        relative,
    })
}

/// Splits a trailing `_<modifier>` segment off a register core, if the
/// segment after the last underscore names one of the eight recognized
/// modifiers. Register cores never otherwise contain an underscore, so
/// this is unambiguous.
fn split_core_and_modifier(core: &str) -> (&str, Modifier) {
    if let Some(idx) = core.rfind('_') {
        let (head, suffix) = core.split_at(idx);
        if let Some(m) = Modifier::from_suffix(&suffix[1..]) {
            return (head, m);
        }
    }
    (core, Modifier::None)
}

fn split_core_and_suffix(s: &str) -> (&str, &str) {
    // find the last '.' that is not inside brackets
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut dot_pos = None;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'[' => depth += 1,
            b']' => depth -= 1,
            b'.' if depth == 0 => dot_pos = Some(i),
            _ => {}
        }
    }
    match dot_pos {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}

fn parse_component_string(suffix: &str, line_no: usize) -> ParseResult<Vec<Component>> {
    suffix
        .chars()
        .map(|c| {
            Component::from_char(c)
                .ok_or_else(|| ParseError::new(line_no, format!("invalid component '{}'", c)))
        })
        .collect()
}

fn has_duplicate(comps: &[Component]) -> bool {
    for i in 0..comps.len() {
        for j in (i + 1)..comps.len() {
            if comps[i] == comps[j] {
                return true;
            }
        }
    }
    false
}

/// Known named output registers that do not follow the `<letter><digits>`
/// scheme. The index space for `AttributeOutput` is partitioned internally
/// (see DESIGN.md) to keep the diffuse/specular, texcoord, fog, and point
/// size varyings distinguishable without widening the shared register-type
/// enumeration.
pub(crate) const OD_BASE: u32 = 0;
pub(crate) const OT_BASE: u32 = 8;
pub(crate) const OFOG_INDEX: u32 = 16;
pub(crate) const OPTS_INDEX: u32 = 17;

/// Which varying an `AttributeOutput` register index denotes, for the
/// benefit of the emitters (spec §4.3/§4.4 varying declarations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOutputSlot {
    Diffuse,
    Specular,
    Texcoord(u32),
    Fog,
    PointSize,
}

pub fn attribute_output_slot(index: u32) -> AttributeOutputSlot {
    if index == OFOG_INDEX {
        AttributeOutputSlot::Fog
    } else if index == OPTS_INDEX {
        AttributeOutputSlot::PointSize
    } else if index >= OT_BASE {
        AttributeOutputSlot::Texcoord(index - OT_BASE)
    } else if index == OD_BASE {
        AttributeOutputSlot::Diffuse
    } else {
        AttributeOutputSlot::Specular
    }
}

fn parse_core(core: &str, line_no: usize) -> ParseResult<(RegisterType, u32, Option<RelativeAddress>)> {
    if core == "oPos" {
        return Ok((RegisterType::RasterizerOutput, 0, None));
    }
    if core == "oFog" {
        return Ok((RegisterType::AttributeOutput, OFOG_INDEX, None));
    }
    if core == "oPts" {
        return Ok((RegisterType::AttributeOutput, OPTS_INDEX, None));
    }
    if let Some(rest) = core.strip_prefix("oD") {
        let n = parse_index(rest, line_no)?;
        return Ok((RegisterType::AttributeOutput, OD_BASE + n, None));
    }
    if let Some(rest) = core.strip_prefix("oT") {
        let n = parse_index(rest, line_no)?;
        return Ok((RegisterType::AttributeOutput, OT_BASE + n, None));
    }
    if let Some(rest) = core.strip_prefix("oC") {
        let n = parse_index(rest, line_no)?;
        return Ok((RegisterType::ColorOutput, n, None));
    }
    // bracketed relative addressing: c[a0.x + k] or c[a0.x - k]
    if let Some(rest) = core.strip_prefix('c').and_then(|r| r.strip_prefix('[')) {
        let inner = rest
            .strip_suffix(']')
            .ok_or_else(|| ParseError::new(line_no, format!("unterminated '[' in '{}'", core)))?;
        let inner = inner.trim();
        let (sign, expr) = if let Some(e) = inner.strip_prefix("a0.x") {
            (1i64, e.trim())
        } else {
            return Err(ParseError::new(
                line_no,
                format!("unsupported relative addressing expression '{}'", inner),
            ));
        };
        let offset = if expr.is_empty() {
            0
        } else {
            let expr = expr.trim_start_matches('+').trim();
            let (mult, digits) = if let Some(d) = expr.strip_prefix('-') {
                (-1i64, d.trim())
            } else {
                (sign, expr)
            };
            let v: i64 = digits
                .parse()
                .map_err(|_| ParseError::new(line_no, format!("bad relative offset '{}'", expr)))?;
            mult * v
        };
        if offset < 0 {
            return Err(ParseError::new(
                line_no,
                "relative address offset must be non-negative",
            ));
        }
        return Ok((
            RegisterType::Constant,
            0,
            Some(RelativeAddress {
                offset: offset as u32,
            }),
        ));
    }

    let mut chars = core.chars();
    let letter = chars
        .next()
        .ok_or_else(|| ParseError::new(line_no, "empty register token"))?;
    let digits: String = chars.collect();
    let index = parse_index(&digits, line_no)?;
    let reg_type = match letter {
        'r' => RegisterType::Temp,
        'v' => RegisterType::VertexInput,
        'c' => RegisterType::Constant,
        'a' => RegisterType::Address,
        't' => RegisterType::Texture,
        's' => RegisterType::Sampler,
        _ => {
            return Err(ParseError::new(
                line_no,
                format!("unrecognized register letter '{}'", letter),
            ))
        }
    };
    Ok((reg_type, index, None))
}

/// Renders a register back to its textual form; the inverse of
/// [`parse_register`], used by the disassembler (spec §6 round-trip law).
pub fn format_register(reg: &Register, is_dest: bool) -> String {
    let mut out = String::new();
    if reg.negate {
        out.push('-');
    }
    match reg.reg_type {
        RegisterType::RasterizerOutput => out.push_str("oPos"),
        RegisterType::AttributeOutput => {
            if reg.index == OFOG_INDEX {
                out.push_str("oFog");
            } else if reg.index == OPTS_INDEX {
                out.push_str("oPts");
            } else if reg.index >= OT_BASE {
                out.push_str(&format!("oT{}", reg.index - OT_BASE));
            } else {
                out.push_str(&format!("oD{}", reg.index - OD_BASE));
            }
        }
        RegisterType::ColorOutput => out.push_str(&format!("oC{}", reg.index)),
        RegisterType::Constant if reg.relative.is_some() => {
            let off = reg.relative.unwrap().offset;
            if off == 0 {
                out.push_str("c[a0.x]");
            } else {
                out.push_str(&format!("c[a0.x + {}]", off));
            }
        }
        other => out.push_str(&format!("{}{}", other.letter(), reg.index)),
    }
    if !is_dest && reg.modifier != Modifier::None {
        out.push('_');
        out.push_str(reg.modifier.suffix());
    }
    if is_dest {
        let mask = reg.write_mask.as_str();
        if !mask.is_empty() {
            out.push('.');
            out.push_str(&mask);
        }
    } else if !reg.swizzle.is_identity() {
        out.push('.');
        out.push_str(&reg.swizzle.as_str());
    }
    out
}

fn parse_index(digits: &str, line_no: usize) -> ParseResult<u32> {
    digits
        .parse()
        .map_err(|_| ParseError::new(line_no, format!("expected register index, got '{}'", digits)))
}
