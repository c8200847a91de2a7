//! The reduction engine shared by all three evaluation modes.
//!
//! [`Reducer`] walks the expression tree under a [`Mode`], consulting the
//! heap for variables, the dynamic operator table for primitives, and -- in
//! approximation mode only -- the guesser for stuck sub-terms. The modes
//! differ exactly at the stuck points: partial evaluation residualizes, full
//! evaluation errors, approximation guesses.
//!
//! Errors abort the current branch only; print output produced before an
//! error is retained by the caller.

use smallvec::SmallVec;

use phylang_core::{substitute, BinOp, Exp, ExpKind, Name, RangeKind, Ty, UnOp, Value};

use crate::error::EvalError;
use crate::guess::{self, GuessState};
use crate::heap::Heap;
use crate::norm::{self, as_bool, as_int, as_scalar};
use crate::ops;
use crate::trace::TraceEntry;

/// Evaluation mode. See the crate docs for the mode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Partial,
    Full,
    Approx,
}

/// Why a branch stopped: a real error, or a pruned guess (empty domain).
/// Pruned branches produce no result and are never surfaced as errors.
#[derive(Debug)]
pub(crate) enum Stop {
    Error(EvalError),
    Pruned,
}

impl From<EvalError> for Stop {
    fn from(e: EvalError) -> Stop {
        Stop::Error(e)
    }
}

/// One segment of a deref path, outermost first.
#[derive(Debug, Clone, PartialEq)]
enum PathSeg {
    Idx(i64),
    Slice(i64, usize),
    Field(String),
}

/// Reduction state for one evaluation branch.
pub(crate) struct Reducer {
    mode: Mode,
    pub heap: Heap,
    pub guesses: GuessState,
    pub prints: String,
    pub trace: Option<Vec<TraceEntry>>,
}

impl Reducer {
    pub fn new(mode: Mode, heap: Heap, script: Vec<bool>, trace_enabled: bool) -> Reducer {
        Reducer {
            mode,
            heap,
            guesses: GuessState::new(script),
            prints: String::new(),
            trace: trace_enabled.then(Vec::new),
        }
    }

    /// Reduces `e` under the current mode, recording a trace entry when
    /// tracing is enabled.
    pub fn eval(&mut self, e: &Exp) -> Result<Exp, Stop> {
        let result = self.reduce(e);
        if self.trace.is_some() {
            let outcome = match &result {
                Ok(v) => v.to_string(),
                Err(Stop::Error(err)) => format!("error: {err}"),
                Err(Stop::Pruned) => "pruned".to_string(),
            };
            let entry = TraceEntry {
                expr: e.to_string(),
                outcome,
            };
            if let Some(entries) = &mut self.trace {
                entries.push(entry);
            }
        }
        result
    }

    fn reduce(&mut self, e: &Exp) -> Result<Exp, Stop> {
        match &e.kind {
            ExpKind::Val(..) => Ok(e.clone()),

            ExpKind::ValArr(elems) => {
                let mut out = Vec::with_capacity(elems.len());
                for el in elems {
                    out.push(self.eval(el)?);
                }
                Ok(Exp::arr(out))
            }

            ExpKind::Struct { ty, fields } => {
                let mut out = Vec::with_capacity(fields.len());
                for (f, v) in fields {
                    out.push((f.clone(), self.eval(v)?));
                }
                Ok(Exp::record(ty.clone(), out))
            }

            ExpKind::Var(n) => match self.heap.read(n.id) {
                Some(v) => Ok(v.clone()),
                None => self.stuck(Exp::var(n)),
            },

            ExpKind::UnOp(op, a) => self.eval_unop(op, a),
            ExpKind::BinOp(op, a, b) => self.eval_binop(*op, a, b),

            ExpKind::ArrRead { arr, idx, range } => self.eval_arr_read(arr, idx, *range),

            // Sugar: a[i] := rhs is Assign(ArrRead(a, i), rhs).
            ExpKind::ArrWrite {
                arr,
                idx,
                range,
                rhs,
            } => {
                let lhs = Exp::arr_read((**arr).clone(), (**idx).clone(), *range);
                self.eval_assign(&lhs, rhs)
            }

            ExpKind::Proj { record, field } => self.eval_proj(record, field),

            ExpKind::Let {
                name,
                force_inline,
                rhs,
                body,
            } => {
                if *force_inline {
                    // Substitute the unreduced initializer: effects occur at
                    // every use site, as if written there.
                    let inlined = substitute(body, name.id, rhs);
                    self.eval(&inlined)
                } else {
                    let v = self.eval(rhs)?;
                    self.scoped(name, v, |red| red.eval(body))
                }
            }

            ExpKind::LetRef { name, init, body } => {
                let v = match init {
                    Some(i) => self.eval(i)?,
                    None => norm::initial_value(&name.ident, &name.ty)?,
                };
                self.scoped(name, v, |red| red.eval(body))
            }

            ExpKind::Assign { lhs, rhs } => self.eval_assign(lhs, rhs),

            ExpKind::Seq(a, b) => {
                self.eval(a)?;
                self.eval(b)
            }

            ExpKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.eval(cond)?;
                match as_bool(&c) {
                    Some(true) => self.eval(then_branch),
                    Some(false) => self.eval(else_branch),
                    None => Err(EvalError::ControlFlowNotGround {
                        expr: c.to_string(),
                    }
                    .into()),
                }
            }

            ExpKind::While { cond, body } => loop {
                let c = self.eval(cond)?;
                match as_bool(&c) {
                    Some(true) => {
                        self.eval(body)?;
                    }
                    Some(false) => return Ok(Exp::unit()),
                    None => {
                        return Err(EvalError::ControlFlowNotGround {
                            expr: c.to_string(),
                        }
                        .into())
                    }
                }
            },

            ExpKind::For {
                var,
                start,
                len,
                body,
            } => self.eval_for(var, start, len, body),

            ExpKind::Call { func, .. } => Err(EvalError::UnsupportedConstruct {
                construct: format!("call to `{}`", func.ident),
            }
            .into()),

            ExpKind::Print { newline, arg } => {
                let v = self.eval(arg)?;
                self.prints.push_str(&v.to_string());
                if *newline {
                    self.prints.push('\n');
                }
                Ok(Exp::unit())
            }

            ExpKind::Error { msg } => Err(EvalError::ExplicitError {
                message: msg.clone(),
            }
            .into()),

            // Transparent wrapper.
            ExpKind::Lut(a) => self.eval(a),

            ExpKind::BPerm(..) => Err(EvalError::UnsupportedConstruct {
                construct: "bit permutation".into(),
            }
            .into()),
        }
    }

    /// Binds `name`, runs `f`, and unbinds in LIFO order.
    fn scoped<F>(&mut self, name: &Name, value: Exp, f: F) -> Result<Exp, Stop>
    where
        F: FnOnce(&mut Reducer) -> Result<Exp, Stop>,
    {
        let shadowed = self.heap.insert(name.id, value);
        let out = f(self);
        self.heap.restore(name.id, shadowed);
        out
    }

    /// Mode table for a sub-term that cannot be reduced further.
    fn stuck(&mut self, residual: Exp) -> Result<Exp, Stop> {
        match self.mode {
            Mode::Partial => Ok(residual),
            Mode::Full => Err(EvalError::FreeVariables {
                expr: residual.to_string(),
            }
            .into()),
            Mode::Approx => match guess::guess(&mut self.guesses, &residual)? {
                Some(assumed) => Ok(assumed),
                None => Ok(residual),
            },
        }
    }

    fn eval_unop(&mut self, op: &UnOp, operand: &Exp) -> Result<Exp, Stop> {
        let a = self.eval(operand)?;

        // Array length has a dedicated reduction on array literals.
        if let UnOp::ALength = op {
            if let ExpKind::ValArr(elems) = &a.kind {
                return Ok(Exp::int32(elems.len() as i64));
            }
        }

        if let Some((ta, va)) = as_scalar(&a) {
            if let Some((ty, v)) = ops::apply_un_op(op, ta, va)? {
                return Ok(Exp::val(ty, v));
            }
        }

        let ground = norm::is_ground(&a);
        let residual = Exp::unop(op.clone(), a);
        if ground {
            Err(EvalError::OpDomain {
                reason: format!("no matching operator instance for `{residual}`"),
            }
            .into())
        } else {
            self.stuck(residual)
        }
    }

    fn eval_binop(&mut self, op: BinOp, e1: &Exp, e2: &Exp) -> Result<Exp, Stop> {
        let a = self.eval(e1)?;
        let b = self.eval(e2)?;

        if let (Some((ta, va)), Some((tb, vb))) = (as_scalar(&a), as_scalar(&b)) {
            if let Some((ty, v)) = ops::apply_bin_op(op, ta, va, tb, vb)? {
                return Ok(Exp::val(ty, v));
            }
        }

        let ground = norm::is_ground(&a) && norm::is_ground(&b);
        let residual = Exp::binop(op, a, b);
        if ground {
            Err(EvalError::OpDomain {
                reason: format!("no matching operator instance for `{residual}`"),
            }
            .into())
        } else {
            self.stuck(residual)
        }
    }

    fn eval_arr_read(&mut self, arr: &Exp, idx: &Exp, range: RangeKind) -> Result<Exp, Stop> {
        let arr_v = self.eval(arr)?;
        let idx_v = self.eval(idx)?;

        if let (ExpKind::ValArr(elems), Some(i)) = (&arr_v.kind, as_int(&idx_v)) {
            return match range {
                RangeKind::Singleton => {
                    let (_, elem, _) = norm::split_array_at(i, elems)?;
                    Ok(elem.clone())
                }
                RangeKind::Length(n) => {
                    let (_, mid, _) = norm::slice_array_at(i, n, elems)?;
                    Ok(Exp::arr(mid.to_vec()))
                }
            };
        }

        if norm::is_ground(&arr_v) && norm::is_ground(&idx_v) {
            return Err(EvalError::Internal {
                message: format!("array read on non-array `{arr_v}`"),
            }
            .into());
        }
        self.stuck(Exp::arr_read(arr_v, idx_v, range))
    }

    fn eval_proj(&mut self, record: &Exp, field: &str) -> Result<Exp, Stop> {
        let r = self.eval(record)?;
        if let ExpKind::Struct { ty, fields } = &r.kind {
            let (_, v) = norm::find_field(struct_name(ty), field, fields)?;
            return Ok(v.clone());
        }
        if norm::is_ground(&r) {
            return Err(EvalError::Internal {
                message: format!("field projection on non-struct `{r}`"),
            }
            .into());
        }
        self.stuck(Exp::proj(r, field))
    }

    fn eval_for(&mut self, var: &Name, start: &Exp, len: &Exp, body: &Exp) -> Result<Exp, Stop> {
        let s = self.eval(start)?;
        let l = self.eval(len)?;
        let (Some(s), Some(l)) = (as_int(&s), as_int(&l)) else {
            return Err(EvalError::ControlFlowNotGround {
                expr: format!("for bounds [{s}, {l}]"),
            }
            .into());
        };

        // Ascending iteration; non-positive length runs zero iterations.
        let end = s.saturating_add(l.max(0));
        let shadowed = self.heap.insert(var.id, Exp::val(var.ty.clone(), Value::Int(s)));
        let mut failure = None;
        let mut i = s;
        while i < end {
            self.heap.insert(var.id, Exp::val(var.ty.clone(), Value::Int(i)));
            if let Err(stop) = self.eval(body) {
                failure = Some(stop);
                break;
            }
            i += 1;
        }
        self.heap.restore(var.id, shadowed);
        match failure {
            Some(stop) => Err(stop),
            None => Ok(Exp::unit()),
        }
    }

    // -----------------------------------------------------------------------
    // Assignment through deref paths
    // -----------------------------------------------------------------------

    fn eval_assign(&mut self, lhs: &Exp, rhs: &Exp) -> Result<Exp, Stop> {
        let value = self.eval(rhs)?;
        let (root, segs) = self.resolve_path(lhs)?;
        let current = match self.heap.read(root.id) {
            Some(cur) => cur.clone(),
            None => {
                return Err(EvalError::NotInScope {
                    ident: root.ident.clone(),
                }
                .into())
            }
        };
        let updated = write_path(&current, &segs, value)?;
        self.heap.write(root.id, updated);
        Ok(Exp::unit())
    }

    /// Walks an assignment target down to its root variable, reducing the
    /// indices along the way. Indices must come out ground.
    fn resolve_path(&mut self, lhs: &Exp) -> Result<(Name, SmallVec<[PathSeg; 4]>), Stop> {
        match &lhs.kind {
            ExpKind::Var(n) => Ok((n.clone(), SmallVec::new())),
            ExpKind::ArrRead { arr, idx, range } => {
                let (root, mut segs) = self.resolve_path(arr)?;
                let iv = self.eval(idx)?;
                let Some(i) = as_int(&iv) else {
                    return Err(EvalError::AssignNotGround {
                        expr: iv.to_string(),
                    }
                    .into());
                };
                segs.push(match range {
                    RangeKind::Singleton => PathSeg::Idx(i),
                    RangeKind::Length(n) => PathSeg::Slice(i, *n),
                });
                Ok((root, segs))
            }
            ExpKind::Proj { record, field } => {
                let (root, mut segs) = self.resolve_path(record)?;
                segs.push(PathSeg::Field(field.clone()));
                Ok((root, segs))
            }
            other => Err(EvalError::Internal {
                message: format!("malformed assignment target: `{}`", Exp::new(other.clone())),
            }
            .into()),
        }
    }
}

fn struct_name(ty: &Ty) -> &str {
    match ty {
        Ty::Struct(def) => &def.name,
        _ => "struct",
    }
}

/// Functional update along a resolved path: replaces the addressed slot of
/// `current` with `value`, rebuilding the spine.
fn write_path(current: &Exp, segs: &[PathSeg], value: Exp) -> Result<Exp, EvalError> {
    let Some((seg, rest)) = segs.split_first() else {
        return Ok(value);
    };
    match seg {
        PathSeg::Idx(i) => match &current.kind {
            ExpKind::ValArr(elems) => {
                let (pre, old, post) = norm::split_array_at(*i, elems)?;
                let new = write_path(old, rest, value)?;
                let mut out = Vec::with_capacity(elems.len());
                out.extend_from_slice(pre);
                out.push(new);
                out.extend_from_slice(post);
                Ok(Exp::arr(out))
            }
            _ => Err(EvalError::AssignNotGround {
                expr: current.to_string(),
            }),
        },
        PathSeg::Slice(i, n) => match &current.kind {
            ExpKind::ValArr(elems) => {
                let (pre, mid, post) = norm::slice_array_at(*i, *n, elems)?;
                let mid_arr = Exp::arr(mid.to_vec());
                let new_mid = write_path(&mid_arr, rest, value)?;
                match new_mid.kind {
                    ExpKind::ValArr(new_elems) if new_elems.len() == *n => {
                        let mut out = Vec::with_capacity(elems.len());
                        out.extend_from_slice(pre);
                        out.extend(new_elems);
                        out.extend_from_slice(post);
                        Ok(Exp::arr(out))
                    }
                    _ => Err(EvalError::Internal {
                        message: format!("slice update must produce {n} elements"),
                    }),
                }
            }
            _ => Err(EvalError::AssignNotGround {
                expr: current.to_string(),
            }),
        },
        PathSeg::Field(f) => match &current.kind {
            ExpKind::Struct { ty, fields } => {
                let (pos, old) = norm::find_field(struct_name(ty), f, fields)?;
                let new = write_path(old, rest, value)?;
                let mut out = fields.clone();
                out[pos].1 = new;
                Ok(Exp::record(ty.clone(), out))
            }
            _ => Err(EvalError::AssignNotGround {
                expr: current.to_string(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial() -> Reducer {
        Reducer::new(Mode::Partial, Heap::new(), Vec::new(), false)
    }

    fn full() -> Reducer {
        Reducer::new(Mode::Full, Heap::new(), Vec::new(), false)
    }

    fn name(id: u32, ident: &str) -> Name {
        Name::new(id, ident, Ty::int32())
    }

    #[test]
    fn let_binds_and_unbinds() {
        let x = name(1, "x");
        let e = Exp::let_(x.clone(), Exp::int32(5), Exp::var(&x));
        let mut red = partial();
        assert_eq!(red.eval(&e).unwrap(), Exp::int32(5));
        // Scope discipline: the binder is gone after exit.
        assert!(red.heap.read(x.id).is_none());
    }

    #[test]
    fn seq_discards_first_result() {
        let e = Exp::seq(Exp::int32(1), Exp::int32(2));
        assert_eq!(partial().eval(&e).unwrap(), Exp::int32(2));
    }

    #[test]
    fn assignment_to_unbound_variable_fails_in_every_mode() {
        let x = name(1, "x");
        let e = Exp::assign(Exp::var(&x), Exp::int32(1));
        for mut red in [partial(), full()] {
            match red.eval(&e) {
                Err(Stop::Error(EvalError::NotInScope { ident })) => assert_eq!(ident, "x"),
                other => panic!("expected NotInScope, got {other:?}"),
            }
        }
    }

    #[test]
    fn write_path_through_nested_structures() {
        // {{1,2},{3,4}} with [Idx(1), Idx(0)] := 9  =>  {{1,2},{9,4}}
        let arr = Exp::arr(vec![
            Exp::arr(vec![Exp::int32(1), Exp::int32(2)]),
            Exp::arr(vec![Exp::int32(3), Exp::int32(4)]),
        ]);
        let out = write_path(&arr, &[PathSeg::Idx(1), PathSeg::Idx(0)], Exp::int32(9)).unwrap();
        assert_eq!(
            out,
            Exp::arr(vec![
                Exp::arr(vec![Exp::int32(1), Exp::int32(2)]),
                Exp::arr(vec![Exp::int32(9), Exp::int32(4)]),
            ])
        );
    }

    #[test]
    fn write_path_slice_length_is_checked() {
        let arr = Exp::arr(vec![Exp::int32(1), Exp::int32(2), Exp::int32(3)]);
        let bad = write_path(
            &arr,
            &[PathSeg::Slice(0, 2)],
            Exp::arr(vec![Exp::int32(9)]),
        );
        assert!(matches!(bad, Err(EvalError::Internal { .. })));
    }

    #[test]
    fn write_path_through_residual_is_rejected() {
        let free = Exp::var(&name(9, "a"));
        let out = write_path(&free, &[PathSeg::Idx(0)], Exp::int32(1));
        assert!(matches!(out, Err(EvalError::AssignNotGround { .. })));
    }

    #[test]
    fn for_loop_descending_length_is_empty() {
        let i = name(1, "i");
        let r = name(2, "r");
        // var r := 0 in { for i in [0, -3] do r := r + 1; r }
        let body = Exp::assign(Exp::var(&r), Exp::add(Exp::var(&r), Exp::int32(1)));
        let e = Exp::let_ref(
            r.clone(),
            Some(Exp::int32(0)),
            Exp::seq(
                Exp::for_(i, Exp::int32(0), Exp::int32(-3), body),
                Exp::var(&r),
            ),
        );
        assert_eq!(partial().eval(&e).unwrap(), Exp::int32(0));
    }

    #[test]
    fn explicit_error_carries_message() {
        let mut red = partial();
        match red.eval(&Exp::error("bad input")) {
            Err(Stop::Error(EvalError::ExplicitError { message })) => {
                assert_eq!(message, "bad input")
            }
            other => panic!("expected ExplicitError, got {other:?}"),
        }
    }

    #[test]
    fn call_is_rejected() {
        let f = Name::new(
            10,
            "f",
            Ty::Arrow {
                args: vec![],
                ret: Box::new(Ty::int32()),
            },
        );
        let e = Exp::new(ExpKind::Call {
            func: f,
            args: vec![],
        });
        assert!(matches!(
            partial().eval(&e),
            Err(Stop::Error(EvalError::UnsupportedConstruct { .. }))
        ));
    }

    #[test]
    fn lut_is_transparent() {
        let e = Exp::lut(Exp::add(Exp::int32(2), Exp::int32(3)));
        assert_eq!(full().eval(&e).unwrap(), Exp::int32(5));
    }
}
