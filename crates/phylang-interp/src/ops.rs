//! Dynamic operator dispatch over ground scalar values.
//!
//! Each operator is a family of monomorphic cases keyed by the operand type
//! tags; dispatch is a closed `match`, so the whole table is checked at
//! build time. A dispatch miss is *not* an error here: `Ok(None)` means "no
//! family member matches", and the evaluator decides whether to residualize,
//! error, or guess based on its mode. `Err` is reserved for operators
//! applied inside their family but outside their domain (division by zero,
//! negative shifts, casts outside the matrix never reach `Err` -- they are
//! misses).
//!
//! Integers are mathematical values carried in `i64`; the declared width is
//! enforced only by casts, so arithmetic never traps on overflow.

use std::cmp::Ordering;

use phylang_core::{BinOp, IntWidth, Ty, UnOp, Value};

use crate::error::EvalError;

/// Truncates `v` to `w` bits with sign extension.
pub fn truncate_to_width(w: IntWidth, v: i64) -> i64 {
    match w {
        IntWidth::W8 => v as i8 as i64,
        IntWidth::W16 => v as i16 as i64,
        IntWidth::W32 => v as i32 as i64,
        IntWidth::W64 => v,
    }
}

fn same_int_width(ta: &Ty, tb: &Ty) -> bool {
    matches!((ta, tb), (Ty::Int(a), Ty::Int(b)) if a == b)
}

/// Applies a binary operator to two ground scalars.
pub fn apply_bin_op(
    op: BinOp,
    ta: &Ty,
    va: &Value,
    tb: &Ty,
    vb: &Value,
) -> Result<Option<(Ty, Value)>, EvalError> {
    use BinOp::*;
    match op {
        Add | Sub | Mult | Div | Rem | Expon => match (va, vb) {
            (Value::Int(a), Value::Int(b)) if same_int_width(ta, tb) => {
                Ok(Some((ta.clone(), Value::Int(int_arith(op, *a, *b)?))))
            }
            (Value::Double(a), Value::Double(b)) => {
                Ok(double_arith(op, *a, *b)?.map(|d| (Ty::Double, Value::Double(d))))
            }
            _ => Ok(None),
        },

        // The left operand's type determines the result; the shift amount
        // may have any integer width.
        ShL | ShR => match (va, vb) {
            (Value::Int(a), Value::Int(s)) if ta.is_int() && tb.is_int() => {
                Ok(Some((ta.clone(), Value::Int(shift(op, *a, *s)?))))
            }
            _ => Ok(None),
        },

        BwAnd | BwOr | BwXor => match (va, vb) {
            (Value::Bit(a), Value::Bit(b)) => {
                Ok(Some((Ty::Bit, Value::Bit(bitwise_bool(op, *a, *b)))))
            }
            (Value::Bool(a), Value::Bool(b)) => {
                Ok(Some((Ty::Bool, Value::Bool(bitwise_bool(op, *a, *b)))))
            }
            (Value::Int(a), Value::Int(b)) if same_int_width(ta, tb) => {
                let r = match op {
                    BwAnd => a & b,
                    BwOr => a | b,
                    BwXor => a ^ b,
                    _ => unreachable!(),
                };
                Ok(Some((ta.clone(), Value::Int(r))))
            }
            _ => Ok(None),
        },

        Eq | Neq | Lt | Gt | Leq | Geq => Ok(compare(op, ta, va, tb, vb)
            .map(|b| (Ty::Bool, Value::Bool(b)))),

        // Strict evaluation is acceptable: the IR is free of divergent
        // sub-expressions, so no short-circuit is needed for termination.
        And => match (va, vb) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Some((Ty::Bool, Value::Bool(*a && *b)))),
            _ => Ok(None),
        },
        Or => match (va, vb) {
            (Value::Bool(a), Value::Bool(b)) => Ok(Some((Ty::Bool, Value::Bool(*a || *b)))),
            _ => Ok(None),
        },
    }
}

/// Applies a unary operator to a ground scalar.
///
/// `ALength` always misses here: it only applies to array literals and has
/// a dedicated reduction in the evaluator.
pub fn apply_un_op(op: &UnOp, ta: &Ty, va: &Value) -> Result<Option<(Ty, Value)>, EvalError> {
    match op {
        UnOp::Neg => match va {
            Value::Int(i) => Ok(Some((ta.clone(), Value::Int(i.wrapping_neg())))),
            Value::Double(d) => Ok(Some((Ty::Double, Value::Double(-d)))),
            _ => Ok(None),
        },
        UnOp::Not => match va {
            Value::Bool(b) => Ok(Some((Ty::Bool, Value::Bool(!b)))),
            _ => Ok(None),
        },
        UnOp::BwNeg => match va {
            Value::Bit(b) => Ok(Some((Ty::Bit, Value::Bit(!b)))),
            Value::Bool(b) => Ok(Some((Ty::Bool, Value::Bool(!b)))),
            Value::Int(i) => Ok(Some((ta.clone(), Value::Int(!i)))),
            _ => Ok(None),
        },
        UnOp::ALength => Ok(None),
        UnOp::Cast(target) => {
            Ok(apply_cast(target, ta, va)?.map(|v| (target.clone(), v)))
        }
    }
}

/// The source -> target conversion matrix. `Ok(None)` marks pairs outside
/// the matrix.
pub fn apply_cast(target: &Ty, src_ty: &Ty, v: &Value) -> Result<Option<Value>, EvalError> {
    let out = match (target, v) {
        // Every scalar collapses to unit.
        (Ty::Unit, _) => Some(Value::Unit),

        // "show": the deterministic pretty form; identity on strings.
        (Ty::String, Value::Str(s)) => Some(Value::Str(s.clone())),
        (Ty::String, other) => Some(Value::Str(other.to_string())),

        (Ty::Bit, Value::Bit(b)) => Some(Value::Bit(*b)),
        (Ty::Bit, Value::Bool(b)) => Some(Value::Bit(*b)),
        (Ty::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (Ty::Bool, Value::Bit(b)) => Some(Value::Bool(*b)),

        (Ty::Int(_), Value::Bit(b)) | (Ty::Int(_), Value::Bool(b)) => {
            Some(Value::Int(i64::from(*b)))
        }

        // Identity at equal width, else bitwise truncation with sign
        // extension.
        (Ty::Int(w), Value::Int(i)) => match src_ty {
            Ty::Int(sw) if sw == w => Some(Value::Int(*i)),
            Ty::Int(_) => Some(Value::Int(truncate_to_width(*w, *i))),
            _ => None,
        },

        // Round half to even, then truncate to the target width.
        (Ty::Int(w), Value::Double(d)) => {
            Some(Value::Int(truncate_to_width(*w, d.round_ties_even() as i64)))
        }

        (Ty::Double, Value::Int(i)) => Some(Value::Double(*i as f64)),
        (Ty::Double, Value::Double(d)) => Some(Value::Double(*d)),

        _ => None,
    };
    Ok(out)
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

fn int_arith(op: BinOp, a: i64, b: i64) -> Result<i64, EvalError> {
    let r = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mult => a.wrapping_mul(b),
        // Quotient truncated toward zero; remainder takes the dividend's sign.
        BinOp::Div => {
            if b == 0 {
                return Err(EvalError::OpDomain {
                    reason: "division by zero".into(),
                });
            }
            a.wrapping_div(b)
        }
        BinOp::Rem => {
            if b == 0 {
                return Err(EvalError::OpDomain {
                    reason: "remainder by zero".into(),
                });
            }
            a.wrapping_rem(b)
        }
        BinOp::Expon => {
            if b < 0 {
                return Err(EvalError::OpDomain {
                    reason: "negative integer exponent".into(),
                });
            }
            if b > u32::MAX as i64 {
                return Err(EvalError::OpDomain {
                    reason: "integer exponent out of range".into(),
                });
            }
            a.wrapping_pow(b as u32)
        }
        _ => unreachable!("non-arithmetic operator in int_arith"),
    };
    Ok(r)
}

fn double_arith(op: BinOp, a: f64, b: f64) -> Result<Option<f64>, EvalError> {
    let r = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mult => a * b,
        // IEEE division: no zero check.
        BinOp::Div => a / b,
        // Remainder is undefined for doubles.
        BinOp::Rem => return Ok(None),
        BinOp::Expon => a.powf(b),
        _ => unreachable!("non-arithmetic operator in double_arith"),
    };
    Ok(Some(r))
}

fn shift(op: BinOp, a: i64, s: i64) -> Result<i64, EvalError> {
    if s < 0 {
        return Err(EvalError::OpDomain {
            reason: "negative shift amount".into(),
        });
    }
    if s >= 64 {
        return Err(EvalError::OpDomain {
            reason: "shift amount out of range".into(),
        });
    }
    Ok(match op {
        BinOp::ShL => a.wrapping_shl(s as u32),
        // Arithmetic shift: sign-extending.
        BinOp::ShR => a >> s,
        _ => unreachable!("non-shift operator in shift"),
    })
}

fn bitwise_bool(op: BinOp, a: bool, b: bool) -> bool {
    match op {
        BinOp::BwAnd => a & b,
        BinOp::BwOr => a | b,
        BinOp::BwXor => a ^ b,
        _ => unreachable!("non-bitwise operator in bitwise_bool"),
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

fn ordering_holds(op: BinOp, ord: Ordering) -> bool {
    match op {
        BinOp::Eq => ord == Ordering::Equal,
        BinOp::Neq => ord != Ordering::Equal,
        BinOp::Lt => ord == Ordering::Less,
        BinOp::Gt => ord == Ordering::Greater,
        BinOp::Leq => ord != Ordering::Greater,
        BinOp::Geq => ord != Ordering::Less,
        _ => unreachable!("non-comparison operator in ordering_holds"),
    }
}

/// Comparison over matching scalar kinds; `None` on a family miss.
fn compare(op: BinOp, ta: &Ty, va: &Value, tb: &Ty, vb: &Value) -> Option<bool> {
    match (va, vb) {
        (Value::Unit, Value::Unit) => Some(ordering_holds(op, Ordering::Equal)),
        (Value::Bit(a), Value::Bit(b)) => Some(ordering_holds(op, a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => Some(ordering_holds(op, a.cmp(b))),
        (Value::Int(a), Value::Int(b)) if same_int_width(ta, tb) => {
            Some(ordering_holds(op, a.cmp(b)))
        }
        // IEEE semantics: every comparison with NaN is false except `!=`.
        (Value::Double(a), Value::Double(b)) => match a.partial_cmp(b) {
            Some(ord) => Some(ordering_holds(op, ord)),
            None => Some(op == BinOp::Neq),
        },
        (Value::Str(a), Value::Str(b)) => Some(ordering_holds(op, a.cmp(b))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32t() -> Ty {
        Ty::int32()
    }

    fn bin(op: BinOp, a: i64, b: i64) -> Option<(Ty, Value)> {
        apply_bin_op(op, &i32t(), &Value::Int(a), &i32t(), &Value::Int(b)).unwrap()
    }

    #[test]
    fn int_arithmetic_families() {
        assert_eq!(bin(BinOp::Add, 2, 3), Some((i32t(), Value::Int(5))));
        assert_eq!(bin(BinOp::Sub, 2, 3), Some((i32t(), Value::Int(-1))));
        assert_eq!(bin(BinOp::Mult, 4, 3), Some((i32t(), Value::Int(12))));
        assert_eq!(bin(BinOp::Expon, 2, 10), Some((i32t(), Value::Int(1024))));
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(bin(BinOp::Div, 7, 2), Some((i32t(), Value::Int(3))));
        assert_eq!(bin(BinOp::Div, -7, 2), Some((i32t(), Value::Int(-3))));
        assert_eq!(bin(BinOp::Div, 7, -2), Some((i32t(), Value::Int(-3))));
    }

    #[test]
    fn remainder_takes_dividend_sign() {
        assert_eq!(bin(BinOp::Rem, 7, 3), Some((i32t(), Value::Int(1))));
        assert_eq!(bin(BinOp::Rem, -7, 3), Some((i32t(), Value::Int(-1))));
        assert_eq!(bin(BinOp::Rem, 7, -3), Some((i32t(), Value::Int(1))));
    }

    #[test]
    fn division_by_zero_is_a_domain_error() {
        for op in [BinOp::Div, BinOp::Rem] {
            let r = apply_bin_op(op, &i32t(), &Value::Int(1), &i32t(), &Value::Int(0));
            assert!(matches!(r, Err(EvalError::OpDomain { .. })));
        }
    }

    #[test]
    fn mismatched_int_widths_miss() {
        let r = apply_bin_op(
            BinOp::Add,
            &Ty::Int(IntWidth::W8),
            &Value::Int(1),
            &i32t(),
            &Value::Int(2),
        )
        .unwrap();
        assert_eq!(r, None);
    }

    #[test]
    fn shifts() {
        let w8 = Ty::Int(IntWidth::W8);
        // Left operand type determines the result type.
        let r = apply_bin_op(BinOp::ShL, &w8, &Value::Int(1), &i32t(), &Value::Int(4)).unwrap();
        assert_eq!(r, Some((w8, Value::Int(16))));
        // Arithmetic right shift sign-extends.
        assert_eq!(bin(BinOp::ShR, -8, 1), Some((i32t(), Value::Int(-4))));

        let neg = apply_bin_op(BinOp::ShL, &i32t(), &Value::Int(1), &i32t(), &Value::Int(-1));
        assert!(matches!(neg, Err(EvalError::OpDomain { .. })));
        let wide = apply_bin_op(BinOp::ShR, &i32t(), &Value::Int(1), &i32t(), &Value::Int(64));
        assert!(matches!(wide, Err(EvalError::OpDomain { .. })));
    }

    #[test]
    fn bitwise_families() {
        assert_eq!(bin(BinOp::BwAnd, 6, 3), Some((i32t(), Value::Int(2))));
        assert_eq!(bin(BinOp::BwOr, 6, 3), Some((i32t(), Value::Int(7))));
        assert_eq!(bin(BinOp::BwXor, 6, 3), Some((i32t(), Value::Int(5))));

        let r = apply_bin_op(
            BinOp::BwXor,
            &Ty::Bit,
            &Value::Bit(true),
            &Ty::Bit,
            &Value::Bit(true),
        )
        .unwrap();
        assert_eq!(r, Some((Ty::Bit, Value::Bit(false))));
    }

    #[test]
    fn comparisons_yield_bool() {
        assert_eq!(bin(BinOp::Lt, 1, 2), Some((Ty::Bool, Value::Bool(true))));
        assert_eq!(bin(BinOp::Geq, 1, 2), Some((Ty::Bool, Value::Bool(false))));

        let r = apply_bin_op(
            BinOp::Eq,
            &Ty::String,
            &Value::Str("a".into()),
            &Ty::String,
            &Value::Str("a".into()),
        )
        .unwrap();
        assert_eq!(r, Some((Ty::Bool, Value::Bool(true))));

        let r = apply_bin_op(
            BinOp::Leq,
            &Ty::Unit,
            &Value::Unit,
            &Ty::Unit,
            &Value::Unit,
        )
        .unwrap();
        assert_eq!(r, Some((Ty::Bool, Value::Bool(true))));
    }

    #[test]
    fn nan_comparisons_follow_ieee() {
        let nan = Value::Double(f64::NAN);
        let one = Value::Double(1.0);
        for op in [BinOp::Eq, BinOp::Lt, BinOp::Gt, BinOp::Leq, BinOp::Geq] {
            let r = apply_bin_op(op, &Ty::Double, &nan, &Ty::Double, &one).unwrap();
            assert_eq!(r, Some((Ty::Bool, Value::Bool(false))));
        }
        let r = apply_bin_op(BinOp::Neq, &Ty::Double, &nan, &Ty::Double, &one).unwrap();
        assert_eq!(r, Some((Ty::Bool, Value::Bool(true))));
    }

    #[test]
    fn logic_requires_bools() {
        let r = apply_bin_op(
            BinOp::And,
            &Ty::Bool,
            &Value::Bool(true),
            &Ty::Bool,
            &Value::Bool(false),
        )
        .unwrap();
        assert_eq!(r, Some((Ty::Bool, Value::Bool(false))));
        assert_eq!(bin(BinOp::And, 1, 1), None);
    }

    #[test]
    fn double_rem_is_undefined() {
        let r = apply_bin_op(
            BinOp::Rem,
            &Ty::Double,
            &Value::Double(1.0),
            &Ty::Double,
            &Value::Double(0.5),
        )
        .unwrap();
        assert_eq!(r, None);
    }

    #[test]
    fn unary_families() {
        let r = apply_un_op(&UnOp::Neg, &i32t(), &Value::Int(5)).unwrap();
        assert_eq!(r, Some((i32t(), Value::Int(-5))));
        let r = apply_un_op(&UnOp::Not, &Ty::Bool, &Value::Bool(true)).unwrap();
        assert_eq!(r, Some((Ty::Bool, Value::Bool(false))));
        let r = apply_un_op(&UnOp::BwNeg, &i32t(), &Value::Int(0)).unwrap();
        assert_eq!(r, Some((i32t(), Value::Int(-1))));
        let r = apply_un_op(&UnOp::BwNeg, &Ty::Bit, &Value::Bit(false)).unwrap();
        assert_eq!(r, Some((Ty::Bit, Value::Bit(true))));
        // Not on an int is a miss, not an error.
        let r = apply_un_op(&UnOp::Not, &i32t(), &Value::Int(1)).unwrap();
        assert_eq!(r, None);
    }

    #[test]
    fn cast_int_truncates_with_sign_extension() {
        let r = apply_cast(&Ty::Int(IntWidth::W8), &i32t(), &Value::Int(300)).unwrap();
        assert_eq!(r, Some(Value::Int(44)));
        let r = apply_cast(&Ty::Int(IntWidth::W8), &i32t(), &Value::Int(-129)).unwrap();
        assert_eq!(r, Some(Value::Int(127)));
        // Same-width cast is the identity, even for out-of-range carriers.
        let r = apply_cast(&i32t(), &i32t(), &Value::Int(1 << 40)).unwrap();
        assert_eq!(r, Some(Value::Int(1 << 40)));
    }

    #[test]
    fn cast_double_rounds_half_to_even() {
        for (d, want) in [(2.5, 2), (3.5, 4), (-2.5, -2), (0.4999, 0)] {
            let r = apply_cast(&i32t(), &Ty::Double, &Value::Double(d)).unwrap();
            assert_eq!(r, Some(Value::Int(want)), "rounding {d}");
        }
    }

    #[test]
    fn cast_bit_bool_and_enum_to_int() {
        let r = apply_cast(&Ty::Bool, &Ty::Bit, &Value::Bit(true)).unwrap();
        assert_eq!(r, Some(Value::Bool(true)));
        let r = apply_cast(&Ty::Bit, &Ty::Bool, &Value::Bool(false)).unwrap();
        assert_eq!(r, Some(Value::Bit(false)));
        let r = apply_cast(&i32t(), &Ty::Bool, &Value::Bool(true)).unwrap();
        assert_eq!(r, Some(Value::Int(1)));
        let r = apply_cast(&Ty::Int(IntWidth::W64), &Ty::Bit, &Value::Bit(true)).unwrap();
        assert_eq!(r, Some(Value::Int(1)));
    }

    #[test]
    fn cast_to_string_is_show() {
        let r = apply_cast(&Ty::String, &i32t(), &Value::Int(42)).unwrap();
        assert_eq!(r, Some(Value::Str("42".into())));
        let r = apply_cast(&Ty::String, &Ty::Unit, &Value::Unit).unwrap();
        assert_eq!(r, Some(Value::Str("()".into())));
        let r = apply_cast(&Ty::String, &Ty::String, &Value::Str("id".into())).unwrap();
        assert_eq!(r, Some(Value::Str("id".into())));
    }

    #[test]
    fn casts_outside_the_matrix_miss() {
        let r = apply_cast(&Ty::Bit, &Ty::Double, &Value::Double(1.0)).unwrap();
        assert_eq!(r, None);
        let r = apply_cast(&i32t(), &Ty::String, &Value::Str("5".into())).unwrap();
        assert_eq!(r, None);
        let r = apply_cast(&Ty::Double, &Ty::Bool, &Value::Bool(true)).unwrap();
        assert_eq!(r, None);
    }

    #[test]
    fn everything_casts_to_unit() {
        for (ty, v) in [
            (Ty::Unit, Value::Unit),
            (Ty::Bit, Value::Bit(true)),
            (Ty::String, Value::Str("s".into())),
            (Ty::Double, Value::Double(1.5)),
        ] {
            let r = apply_cast(&Ty::Unit, &ty, &v).unwrap();
            assert_eq!(r, Some(Value::Unit));
        }
    }
}
