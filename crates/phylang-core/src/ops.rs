//! Unary and binary operators of the expression language.

use serde::{Deserialize, Serialize};

use crate::types::Ty;

/// Unary operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnOp {
    /// Arithmetic negation on ints and doubles.
    Neg,
    /// Logical negation on bools.
    Not,
    /// Bitwise complement on bits, bools, and ints.
    BwNeg,
    /// Array length. Polymorphic in the element type.
    ALength,
    /// Explicit conversion to the carried target type.
    Cast(Ty),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mult,
    Div,
    Rem,
    Expon,
    ShL,
    ShR,
    BwAnd,
    BwOr,
    BwXor,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    And,
    Or,
}

impl BinOp {
    /// Returns `true` for the six comparison operators.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::Gt | BinOp::Leq | BinOp::Geq
        )
    }

    /// Logical negation of a comparison: `= <-> !=`, `< <-> >=`, `> <-> <=`.
    ///
    /// Only defined for comparison operators; other operators return
    /// themselves unchanged (callers guard with [`BinOp::is_comparison`]).
    pub fn negated(self) -> BinOp {
        match self {
            BinOp::Eq => BinOp::Neq,
            BinOp::Neq => BinOp::Eq,
            BinOp::Lt => BinOp::Geq,
            BinOp::Geq => BinOp::Lt,
            BinOp::Gt => BinOp::Leq,
            BinOp::Leq => BinOp::Gt,
            other => other,
        }
    }

    /// Operator symbol used by the pretty printer.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mult => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Expon => "**",
            BinOp::ShL => "<<",
            BinOp::ShR => ">>",
            BinOp::BwAnd => "&",
            BinOp::BwOr => "|",
            BinOp::BwXor => "^",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Leq => "<=",
            BinOp::Geq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negation_is_an_involution_on_comparisons() {
        for op in [
            BinOp::Eq,
            BinOp::Neq,
            BinOp::Lt,
            BinOp::Gt,
            BinOp::Leq,
            BinOp::Geq,
        ] {
            assert!(op.is_comparison());
            assert_ne!(op.negated(), op);
            assert_eq!(op.negated().negated(), op);
        }
    }

    #[test]
    fn non_comparisons_are_fixed_by_negation() {
        assert_eq!(BinOp::Add.negated(), BinOp::Add);
        assert!(!BinOp::And.is_comparison());
    }
}
