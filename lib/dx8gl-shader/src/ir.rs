use fxhash::FxHashMap;
use smallvec::SmallVec;

use dx8gl_types::{Modifier, Opcode, Register, RegisterType, ShaderKind, ShaderVersion};

/// A single parsed instruction (spec §3 "An instruction carries...").
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest_modifier: Modifier,
    pub dest: Option<Register>,
    pub srcs: SmallVec<[Register; 3]>,
    /// 1-based source line, kept for diagnostics in later passes (bytecode
    /// encoding never emits it).
    pub line: usize,
}

/// What a `dcl_<semantic>` directive attaches to an input register (spec
/// §4.1 edge cases).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semantic {
    Position,
    Normal,
    Color,
    Texcoord(u32),
    BlendWeight,
    BlendIndices,
}

/// The full parsed IR for one shader (spec §3 "Parsed shader").
#[derive(Debug, Clone)]
pub struct ParsedShader {
    pub version: ShaderVersion,
    pub kind: ShaderKind,
    pub instructions: Vec<Instruction>,
    /// Constant index -> literal 4-tuple, from inline `def` directives.
    pub constants: FxHashMap<u32, [f32; 4]>,
    /// Declared `dcl_<semantic>` attachments, vertex shaders only.
    pub declared_inputs: FxHashMap<u32, Semantic>,
    /// Whether `mov oPos, ...` (or equivalent write to the position output)
    /// was observed while parsing.
    pub uses_position: bool,
    /// True once an address register (`a0`) has been written; used to
    /// reject a read-before-write at parse time (spec §4.1).
    pub address_written: bool,
}

impl ParsedShader {
    pub fn new(version: ShaderVersion, kind: ShaderKind) -> Self {
        ParsedShader {
            version,
            kind,
            instructions: Vec::new(),
            constants: FxHashMap::default(),
            declared_inputs: FxHashMap::default(),
            uses_position: false,
            address_written: false,
        }
    }

    /// The varying (color/texcoord) slots actually referenced: written by a
    /// vertex shader, or read by a pixel shader. Spec §4.3: "a color or
    /// texcoord varying is declared if and only if the IR either writes it
    /// (vertex shader) or reads it".
    pub fn referenced_varyings(&self) -> FxHashMap<RegisterType, Vec<u32>> {
        let mut out: FxHashMap<RegisterType, Vec<u32>> = FxHashMap::default();
        let is_vertex = self.kind == ShaderKind::Vertex;
        for instr in &self.instructions {
            if is_vertex {
                if let Some(dest) = &instr.dest {
                    if matches!(
                        dest.reg_type,
                        RegisterType::AttributeOutput | RegisterType::RasterizerOutput
                    ) {
                        push_unique(&mut out, dest.reg_type, dest.index);
                    }
                }
            } else {
                for src in &instr.srcs {
                    if matches!(src.reg_type, RegisterType::Texture) {
                        push_unique(&mut out, src.reg_type, src.index);
                    }
                }
            }
        }
        out
    }

    /// Every texture-sampler stage referenced by a `tex`/`texld`/`bem`
    /// instruction, used to size sampler/binding declarations.
    pub fn referenced_texture_stages(&self) -> Vec<u32> {
        let mut stages: Vec<u32> = self
            .instructions
            .iter()
            .filter(|i| matches!(i.opcode, Opcode::Tex | Opcode::Bem))
            .filter_map(|i| i.dest.as_ref())
            .map(|d| d.index)
            .collect();
        stages.sort_unstable();
        stages.dedup();
        stages
    }

    /// Every constant index referenced anywhere (by `def` or by a plain
    /// read), used to size uniform declarations.
    pub fn referenced_constants(&self) -> Vec<u32> {
        let mut out: Vec<u32> = self.constants.keys().copied().collect();
        for instr in &self.instructions {
            for src in &instr.srcs {
                if src.reg_type == RegisterType::Constant {
                    out.push(src.index);
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn uses_address_register(&self) -> bool {
        self.instructions.iter().any(|i| {
            i.srcs
                .iter()
                .any(|s| s.reg_type == RegisterType::Constant && s.relative.is_some())
        })
    }
}

fn push_unique(map: &mut FxHashMap<RegisterType, Vec<u32>>, ty: RegisterType, index: u32) {
    let entry = map.entry(ty).or_default();
    if !entry.contains(&index) {
        entry.push(index);
    }
}
