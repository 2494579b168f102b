use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The enumerated opcode set recognized by the translator (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    Mov,
    Add,
    Sub,
    Mad,
    Mul,
    Rcp,
    Rsq,
    Dp3,
    Dp4,
    Min,
    Max,
    Slt,
    Sge,
    Exp,
    Log,
    Lit,
    Dst,
    Lrp,
    Frc,
    M4x4,
    M4x3,
    M3x4,
    M3x3,
    M3x2,
    Tex,
    Texcoord,
    Texkill,
    Cnd,
    Cmp,
    Bem,
    Phase,
    Expp,
    Logp,
    Sincos,
    Dcl,
    Def,
    End,
}

impl Opcode {
    /// Number of source registers the instruction form takes. `dcl` and
    /// `def` are directives handled separately by the parser and are not
    /// reachable here.
    pub fn source_count(self) -> usize {
        use Opcode::*;
        match self {
            Mov | Rcp | Rsq | Lit | Frc | Tex | Texcoord | Texkill | Expp | Logp | Sincos
            | Exp | Log => 1,
            Add | Sub | Min | Max | Slt | Sge | Dp3 | Dp4 | M3x2 | Bem | M4x4 | M4x3 | M3x4
            | M3x3 | Mul | Dst => 2,
            Mad | Lrp | Cnd | Cmp => 3,
            Phase | Dcl | Def | End => 0,
        }
    }

    pub fn has_destination(self) -> bool {
        !matches!(self, Opcode::Texkill | Opcode::Phase | Opcode::End)
    }

    /// Opcodes legal only in a vertex shader.
    pub fn vertex_only(self) -> bool {
        matches!(self, Opcode::M4x4 | Opcode::M4x3 | Opcode::M3x4 | Opcode::M3x3 | Opcode::M3x2)
    }

    /// Opcodes legal only in a pixel shader.
    pub fn pixel_only(self) -> bool {
        matches!(
            self,
            Opcode::Tex
                | Opcode::Texcoord
                | Opcode::Texkill
                | Opcode::Cnd
                | Opcode::Cmp
                | Opcode::Bem
                | Opcode::Phase
                | Opcode::Sincos
        )
    }
}
