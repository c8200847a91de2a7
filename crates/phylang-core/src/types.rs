//! The phylang expression-level type system.
//!
//! Type tags are carried on literals and variable names in the typed IR and
//! drive dynamic operator dispatch in the interpreter. Struct fields use
//! [`IndexMap`] so that declaration order is preserved everywhere -- field
//! iteration order is the insertion order of the IR and is never sorted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Width of a signed integer type, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Number of bits in this width.
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// Array length: a literal count or a symbolic length variable left behind
/// by polymorphic array types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrLen {
    Lit(usize),
    Sym(String),
}

/// Named struct definition with insertion-ordered fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDef {
    pub name: String,
    pub fields: IndexMap<String, Ty>,
}

/// Expression-level type tags.
///
/// `Bit` and `Bool` are distinct types with no implicit coercion between
/// them; only an explicit `Cast` converts. `Arrow` appears solely in type
/// positions (the interpreter never fabricates arrow values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ty {
    Unit,
    Bit,
    Bool,
    Int(IntWidth),
    Double,
    String,
    Array { len: ArrLen, elem: Box<Ty> },
    Struct(StructDef),
    Arrow { args: Vec<Ty>, ret: Box<Ty> },
}

impl Ty {
    /// Convenience constructor for the default integer type.
    pub fn int32() -> Ty {
        Ty::Int(IntWidth::W32)
    }

    /// Returns `true` for the signed integer types.
    pub fn is_int(&self) -> bool {
        matches!(self, Ty::Int(_))
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Unit => write!(f, "()"),
            Ty::Bit => write!(f, "bit"),
            Ty::Bool => write!(f, "bool"),
            Ty::Int(w) => write!(f, "int{}", w.bits()),
            Ty::Double => write!(f, "double"),
            Ty::String => write!(f, "string"),
            Ty::Array { len, elem } => match len {
                ArrLen::Lit(n) => write!(f, "arr[{n}] {elem}"),
                ArrLen::Sym(s) => write!(f, "arr[{s}] {elem}"),
            },
            Ty::Struct(def) => write!(f, "{}", def.name),
            Ty::Arrow { args, ret } => {
                write!(f, "(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}
