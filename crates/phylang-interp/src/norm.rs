//! Normal forms and the helpers that take them apart.
//!
//! A fully reduced expression is a `Val`, a `ValArr` whose elements are all
//! in normal form, or a `Struct` whose fields are all in normal form. Full
//! evaluation returns one of these or fails; partial evaluation may return
//! anything. The split/slice/field helpers preserve element and field order.

use phylang_core::{ArrLen, Exp, ExpKind, Ty, Value};

use crate::error::EvalError;

/// `true` if `e` is fully reduced (contains no reducible sub-term).
pub fn is_ground(e: &Exp) -> bool {
    match &e.kind {
        ExpKind::Val(..) => true,
        ExpKind::ValArr(elems) => elems.iter().all(is_ground),
        ExpKind::Struct { fields, .. } => fields.iter().all(|(_, v)| is_ground(v)),
        _ => false,
    }
}

/// Views `e` as a ground scalar, if it is one.
pub fn as_scalar(e: &Exp) -> Option<(&Ty, &Value)> {
    match &e.kind {
        ExpKind::Val(ty, v) => Some((ty, v)),
        _ => None,
    }
}

/// Views `e` as a ground machine integer, if it is one.
pub fn as_int(e: &Exp) -> Option<i64> {
    match &e.kind {
        ExpKind::Val(_, Value::Int(i)) => Some(*i),
        _ => None,
    }
}

/// Views `e` as a ground boolean, if it is one.
pub fn as_bool(e: &Exp) -> Option<bool> {
    match &e.kind {
        ExpKind::Val(_, Value::Bool(b)) => Some(*b),
        _ => None,
    }
}

/// Splits `elems` at element `i` into `(prefix, elems[i], suffix)`.
///
/// `i` must be non-negative and strictly less than the length.
pub fn split_array_at(i: i64, elems: &[Exp]) -> Result<(&[Exp], &Exp, &[Exp]), EvalError> {
    let len = elems.len();
    if i < 0 || i as usize >= len {
        return Err(EvalError::OutOfBounds { index: i, len });
    }
    let at = i as usize;
    Ok((&elems[..at], &elems[at], &elems[at + 1..]))
}

/// Splits out the slice `elems[i .. i+n]` as `(prefix, middle, suffix)`.
///
/// Fails when `i < 0` or `i + n` exceeds the length.
pub fn slice_array_at(
    i: i64,
    n: usize,
    elems: &[Exp],
) -> Result<(&[Exp], &[Exp], &[Exp]), EvalError> {
    let len = elems.len();
    if i < 0 || (i as usize).saturating_add(n) > len {
        return Err(EvalError::OutOfBounds { index: i, len });
    }
    let at = i as usize;
    Ok((&elems[..at], &elems[at..at + n], &elems[at + n..]))
}

/// Finds field `field` in an ordered field list, returning its position and
/// value.
pub fn find_field<'a>(
    struct_name: &str,
    field: &str,
    fields: &'a [(String, Exp)],
) -> Result<(usize, &'a Exp), EvalError> {
    fields
        .iter()
        .position(|(f, _)| f == field)
        .map(|i| (i, &fields[i].1))
        .ok_or_else(|| EvalError::UnknownField {
            name: struct_name.to_string(),
            field: field.to_string(),
        })
}

/// Type-driven default used by `var` declarations without an initializer.
///
/// Arrays of literal length recurse element-wise and structs field-wise;
/// scalars get `false`/`'0`/`0`/`0.0`/`""`/`()`. Arrays of symbolic length
/// have no constructible default.
pub fn initial_value(ident: &str, ty: &Ty) -> Result<Exp, EvalError> {
    let e = match ty {
        Ty::Unit => Exp::val(Ty::Unit, Value::Unit),
        Ty::Bit => Exp::val(Ty::Bit, Value::Bit(false)),
        Ty::Bool => Exp::val(Ty::Bool, Value::Bool(false)),
        Ty::Int(w) => Exp::val(Ty::Int(*w), Value::Int(0)),
        Ty::Double => Exp::val(Ty::Double, Value::Double(0.0)),
        Ty::String => Exp::val(Ty::String, Value::Str(String::new())),
        Ty::Array { len, elem } => match len {
            ArrLen::Lit(n) => {
                let mut elems = Vec::with_capacity(*n);
                for _ in 0..*n {
                    elems.push(initial_value(ident, elem)?);
                }
                Exp::arr(elems)
            }
            ArrLen::Sym(_) => {
                return Err(EvalError::SymbolicArrayLength {
                    ident: ident.to_string(),
                })
            }
        },
        Ty::Struct(def) => {
            let mut fields = Vec::with_capacity(def.fields.len());
            for (f, fty) in &def.fields {
                fields.push((f.clone(), initial_value(ident, fty)?));
            }
            Exp::record(ty.clone(), fields)
        }
        Ty::Arrow { .. } => {
            return Err(EvalError::Internal {
                message: format!("no default value for arrow-typed `{ident}`"),
            })
        }
    };
    Ok(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use phylang_core::{IntWidth, StructDef};

    fn ints(vals: &[i64]) -> Vec<Exp> {
        vals.iter().map(|&i| Exp::int32(i)).collect()
    }

    #[test]
    fn ground_recognizes_normal_forms() {
        assert!(is_ground(&Exp::int32(1)));
        assert!(is_ground(&Exp::arr(ints(&[1, 2]))));
        assert!(!is_ground(&Exp::arr(vec![
            Exp::int32(1),
            Exp::var(&phylang_core::Name::new(1, "x", Ty::int32())),
        ])));
    }

    #[test]
    fn split_in_bounds() {
        let elems = ints(&[10, 20, 30]);
        let (pre, mid, post) = split_array_at(1, &elems).unwrap();
        assert_eq!(pre.len(), 1);
        assert_eq!(mid, &Exp::int32(20));
        assert_eq!(post.len(), 1);
    }

    #[test]
    fn split_rejects_out_of_bounds() {
        let elems = ints(&[10, 20, 30]);
        assert_eq!(
            split_array_at(5, &elems),
            Err(EvalError::OutOfBounds { index: 5, len: 3 })
        );
        assert_eq!(
            split_array_at(-1, &elems),
            Err(EvalError::OutOfBounds { index: -1, len: 3 })
        );
    }

    #[test]
    fn slice_in_bounds() {
        let elems = ints(&[1, 2, 3, 4, 5]);
        let (pre, mid, post) = slice_array_at(1, 2, &elems).unwrap();
        assert_eq!(pre.len(), 1);
        assert_eq!(mid, &ints(&[2, 3])[..]);
        assert_eq!(post.len(), 2);
    }

    #[test]
    fn slice_rejects_overrun() {
        let elems = ints(&[1, 2, 3]);
        assert!(slice_array_at(2, 2, &elems).is_err());
        assert!(slice_array_at(-1, 1, &elems).is_err());
        // Full-width slice is fine.
        assert!(slice_array_at(0, 3, &elems).is_ok());
    }

    #[test]
    fn find_field_preserves_position() {
        let fields = vec![
            ("re".to_string(), Exp::int32(1)),
            ("im".to_string(), Exp::int32(2)),
        ];
        let (i, v) = find_field("complex", "im", &fields).unwrap();
        assert_eq!(i, 1);
        assert_eq!(v, &Exp::int32(2));
        assert!(matches!(
            find_field("complex", "mag", &fields),
            Err(EvalError::UnknownField { .. })
        ));
    }

    #[test]
    fn initial_values_are_structural() {
        let arr_ty = Ty::Array {
            len: ArrLen::Lit(3),
            elem: Box::new(Ty::Int(IntWidth::W16)),
        };
        let v = initial_value("a", &arr_ty).unwrap();
        assert_eq!(
            v,
            Exp::arr(vec![
                Exp::int(IntWidth::W16, 0),
                Exp::int(IntWidth::W16, 0),
                Exp::int(IntWidth::W16, 0),
            ])
        );

        let def = StructDef {
            name: "c".into(),
            fields: indexmap::IndexMap::from([
                ("re".into(), Ty::int32()),
                ("im".into(), Ty::Bool),
            ]),
        };
        let v = initial_value("s", &Ty::Struct(def.clone())).unwrap();
        assert_eq!(
            v,
            Exp::record(
                Ty::Struct(def),
                vec![
                    ("re".into(), Exp::int32(0)),
                    ("im".into(), Exp::bool_val(false)),
                ],
            )
        );
    }

    #[test]
    fn symbolic_length_has_no_default() {
        let ty = Ty::Array {
            len: ArrLen::Sym("n".into()),
            elem: Box::new(Ty::Bit),
        };
        assert!(matches!(
            initial_value("a", &ty),
            Err(EvalError::SymbolicArrayLength { .. })
        ));
    }
}
