//! Ground scalar values.
//!
//! [`Value`] is the scalar payload of a `Val` literal in the IR. Arrays and
//! structs are *not* values: they stay expressions (`ValArr`, `Struct`
//! literals) so that partially reduced data can coexist with concrete data
//! during evaluation.
//!
//! `Int` holds the mathematical integer as an `i64`; the width lives in the
//! accompanying [`Ty`](crate::types::Ty) tag and is enforced only by casts.

use serde::{Deserialize, Serialize};

/// A ground scalar value.
///
/// `Bit` and `Bool` are distinct -- a bit is a wire-level symbol, a bool is a
/// truth value, and only an explicit cast converts between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Unit,
    Bit(bool),
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
}

impl Value {
    /// Returns a human-readable description of the value's kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bit(_) => "bit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
        }
    }
}

impl std::fmt::Display for Value {
    /// Deterministic rendering, distinct per scalar kind: unit is `()`,
    /// bits print with a tick (`'0`, `'1`), doubles always carry a decimal
    /// point, strings are quoted.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bit(b) => write!(f, "'{}", if *b { 1 } else { 0 }),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Double(d) => {
                if d.is_finite() && d.fract() == 0.0 {
                    write!(f, "{d:.1}")
                } else {
                    write!(f, "{d}")
                }
            }
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_distinct_per_kind() {
        let rendered = [
            Value::Unit.to_string(),
            Value::Bit(true).to_string(),
            Value::Bool(true).to_string(),
            Value::Int(1).to_string(),
            Value::Double(1.0).to_string(),
            Value::Str("1".into()).to_string(),
        ];
        for (i, a) in rendered.iter().enumerate() {
            for b in rendered.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Unit.to_string(), "()");
        assert_eq!(Value::Bit(false).to_string(), "'0");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::Double(2.0).to_string(), "2.0");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Str("hi".into()).to_string(), "\"hi\"");
    }

    #[test]
    fn serde_roundtrip() {
        for v in [
            Value::Unit,
            Value::Bit(true),
            Value::Bool(false),
            Value::Int(123),
            Value::Double(0.5),
            Value::Str("s".into()),
        ] {
            let json = serde_json::to_string(&v).unwrap();
            let back: Value = serde_json::from_str(&json).unwrap();
            assert_eq!(v, back);
        }
    }
}
