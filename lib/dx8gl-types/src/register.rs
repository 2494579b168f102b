use std::fmt;

use serde::{Deserialize, Serialize};

/// A single component of a swizzle or write mask (spec §3 "register").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    X,
    Y,
    Z,
    W,
}

impl Component {
    pub const ALL: [Component; 4] = [Component::X, Component::Y, Component::Z, Component::W];

    pub fn from_char(c: char) -> Option<Component> {
        match c {
            'x' | 'r' => Some(Component::X),
            'y' | 'g' => Some(Component::Y),
            'z' | 'b' => Some(Component::Z),
            'w' | 'a' => Some(Component::W),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Component::X => 'x',
            Component::Y => 'y',
            Component::Z => 'z',
            Component::W => 'w',
        }
    }

    pub fn index(self) -> usize {
        match self {
            Component::X => 0,
            Component::Y => 1,
            Component::Z => 2,
            Component::W => 3,
        }
    }
}

/// A destination write mask: a subset of {x,y,z,w} with no duplicates.
/// Empty denotes a full write (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WriteMask {
    components: [bool; 4],
}

impl WriteMask {
    pub const FULL: WriteMask = WriteMask {
        components: [true; 4],
    };

    pub fn from_components(comps: &[Component]) -> WriteMask {
        let mut mask = WriteMask::default();
        for c in comps {
            mask.components[c.index()] = true;
        }
        mask
    }

    pub fn is_full_or_empty(&self) -> bool {
        self.components == [false; 4] || self.components == [true; 4]
    }

    pub fn contains(&self, c: Component) -> bool {
        self.components[c.index()]
    }

    /// Iterates the written components in canonical x,y,z,w order; an empty
    /// mask (meaning "full write") yields all four.
    pub fn iter_written(&self) -> impl Iterator<Item = Component> + '_ {
        let full = self.components == [false; 4];
        Component::ALL
            .into_iter()
            .filter(move |c| full || self.components[c.index()])
    }

    pub fn as_str(&self) -> String {
        if self.components == [false; 4] {
            String::new()
        } else {
            self.iter_written().map(Component::as_char).collect()
        }
    }
}

impl fmt::Display for WriteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source swizzle over {x,y,z,w}; replication is allowed. Empty denotes
/// the identity swizzle (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Swizzle {
    components: [Component; 4],
}

impl Default for Swizzle {
    fn default() -> Self {
        Swizzle::IDENTITY
    }
}

impl Swizzle {
    pub const IDENTITY: Swizzle = Swizzle {
        components: [Component::X, Component::Y, Component::Z, Component::W],
    };

    pub fn new(components: [Component; 4]) -> Swizzle {
        Swizzle { components }
    }

    /// Builds a swizzle from 1-4 parsed components, replicating the last one
    /// to fill remaining slots the way `vs.1.1` source-side `.x` expands to
    /// `.xxxx`.
    pub fn from_parsed(comps: &[Component]) -> Swizzle {
        if comps.is_empty() {
            return Swizzle::IDENTITY;
        }
        let mut out = [*comps.last().unwrap(); 4];
        for (i, c) in comps.iter().enumerate().take(4) {
            out[i] = *c;
        }
        Swizzle { components: out }
    }

    pub fn get(&self, i: usize) -> Component {
        self.components[i]
    }

    pub fn is_identity(&self) -> bool {
        *self == Swizzle::IDENTITY
    }

    pub fn as_str(&self) -> String {
        if self.is_identity() {
            String::new()
        } else {
            self.components.iter().map(|c| c.as_char()).collect()
        }
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The destination-or-source modifier enumeration (spec §3: "a source-side
/// modifier (same enumeration as destination)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    None,
    Saturate,
    X2,
    X4,
    Half,
    Bias,
    BiasAndDouble,
    Complement,
}

impl Modifier {
    pub fn from_suffix(s: &str) -> Option<Modifier> {
        match s {
            "" => Some(Modifier::None),
            "sat" => Some(Modifier::Saturate),
            "x2" => Some(Modifier::X2),
            "x4" => Some(Modifier::X4),
            "d2" => Some(Modifier::Half),
            "bias" => Some(Modifier::Bias),
            "bx2" => Some(Modifier::BiasAndDouble),
            "comp" => Some(Modifier::Complement),
            _ => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Saturate => "sat",
            Modifier::X2 => "x2",
            Modifier::X4 => "x4",
            Modifier::Half => "d2",
            Modifier::Bias => "bias",
            Modifier::BiasAndDouble => "bx2",
            Modifier::Complement => "comp",
        }
    }
}

/// Register-type tag (spec §3 "register"). `Sampler` is not itself a
/// distinct storage class in the data model but is needed to recognize the
/// `s<n>` token used by `tex`/`texld` sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterType {
    Temp,
    VertexInput,
    Constant,
    Address,
    Texture,
    RasterizerOutput,
    AttributeOutput,
    ColorOutput,
    Sampler,
}

impl RegisterType {
    pub fn letter(self) -> &'static str {
        match self {
            RegisterType::Temp => "r",
            RegisterType::VertexInput => "v",
            RegisterType::Constant => "c",
            RegisterType::Address => "a",
            RegisterType::Texture => "t",
            RegisterType::RasterizerOutput | RegisterType::AttributeOutput | RegisterType::ColorOutput => "o",
            RegisterType::Sampler => "s",
        }
    }
}

/// Relative addressing of a constant register: `c[a0.x + k]` (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeAddress {
    pub offset: u32,
}

/// A fully parsed register occurrence, destination or source (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Register {
    pub reg_type: RegisterType,
    pub index: u32,
    pub write_mask: WriteMask,
    pub swizzle: Swizzle,
    pub modifier: Modifier,
    pub negate: bool,
    pub relative: Option<RelativeAddress>,
}

impl Register {
    pub fn dest(reg_type: RegisterType, index: u32, write_mask: WriteMask) -> Register {
        Register {
            reg_type,
            index,
            write_mask,
            swizzle: Swizzle::IDENTITY,
            modifier: Modifier::None,
            negate: false,
            relative: None,
        }
    }

    pub fn src(reg_type: RegisterType, index: u32) -> Register {
        Register {
            reg_type,
            index,
            write_mask: WriteMask::default(),
            swizzle: Swizzle::IDENTITY,
            modifier: Modifier::None,
            negate: false,
            relative: None,
        }
    }
}
