//! The typed expression IR consumed by the interpreter.
//!
//! Nodes are produced by the type checker; the interpreter never mutates
//! them. Source locations are carried for error reporting only: they are
//! skipped during serialization, ignored by [`Exp`]'s `PartialEq`, and
//! stripped by [`Exp::erase_loc`], so two structurally equal expressions at
//! different positions share a [`canonical_key`](Exp::canonical_key).

use serde::{Deserialize, Serialize};

use crate::id::UniqId;
use crate::ops::{BinOp, UnOp};
use crate::types::Ty;
use crate::value::Value;

/// A source position, used only for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrcLoc {
    pub line: u32,
    pub col: u32,
}

/// A typed variable name with its unique identity.
///
/// The `ident` is the surface spelling and is never used for lookup; the
/// heap and substitution both key on `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name {
    pub id: UniqId,
    pub ident: String,
    pub ty: Ty,
}

impl Name {
    pub fn new(id: u32, ident: impl Into<String>, ty: Ty) -> Name {
        Name {
            id: UniqId(id),
            ident: ident.into(),
            ty,
        }
    }
}

/// Distinguishes an element read from a fixed-length slice read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeKind {
    Singleton,
    Length(usize),
}

/// A typed expression node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exp {
    pub kind: ExpKind,
    /// Diagnostic position. Skipped by serde so the serialized form is the
    /// location-erased form.
    #[serde(skip)]
    pub loc: Option<SrcLoc>,
}

/// Structural equality, ignoring source locations.
impl PartialEq for Exp {
    fn eq(&self, other: &Exp) -> bool {
        self.kind == other.kind
    }
}

/// Expression node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExpKind {
    /// A literal scalar with its type tag.
    Val(Ty, Value),
    /// A literal array; elements are expressions so partially reduced data
    /// can coexist with concrete data.
    ValArr(Vec<Exp>),
    /// A record literal, field order preserved.
    Struct { ty: Ty, fields: Vec<(String, Exp)> },
    Var(Name),
    UnOp(UnOp, Box<Exp>),
    BinOp(BinOp, Box<Exp>, Box<Exp>),
    ArrRead {
        arr: Box<Exp>,
        idx: Box<Exp>,
        range: RangeKind,
    },
    /// Sugar for `Assign(ArrRead(arr, idx, range), rhs)`; desugared on entry
    /// to the interpreter.
    ArrWrite {
        arr: Box<Exp>,
        idx: Box<Exp>,
        range: RangeKind,
        rhs: Box<Exp>,
    },
    Proj { record: Box<Exp>, field: String },
    Let {
        name: Name,
        force_inline: bool,
        rhs: Box<Exp>,
        body: Box<Exp>,
    },
    LetRef {
        name: Name,
        init: Option<Box<Exp>>,
        body: Box<Exp>,
    },
    /// `lhs` is a deref path: `Var`, `ArrRead` of a path, or `Proj` of a path.
    Assign { lhs: Box<Exp>, rhs: Box<Exp> },
    Seq(Box<Exp>, Box<Exp>),
    If {
        cond: Box<Exp>,
        then_branch: Box<Exp>,
        else_branch: Box<Exp>,
    },
    While { cond: Box<Exp>, body: Box<Exp> },
    For {
        var: Name,
        start: Box<Exp>,
        len: Box<Exp>,
        body: Box<Exp>,
    },
    /// Function call. Not evaluable; rejected by the interpreter.
    Call { func: Name, args: Vec<Exp> },
    Print { newline: bool, arg: Box<Exp> },
    Error { msg: String },
    /// Lookup-table wrapper; transparent to evaluation.
    Lut(Box<Exp>),
    /// Bit permutation. Not evaluable; rejected by the interpreter.
    BPerm(Box<Exp>, Box<Exp>),
}

impl Exp {
    pub fn new(kind: ExpKind) -> Exp {
        Exp { kind, loc: None }
    }

    pub fn with_loc(mut self, line: u32, col: u32) -> Exp {
        self.loc = Some(SrcLoc { line, col });
        self
    }

    // -----------------------------------------------------------------------
    // Literal builders
    // -----------------------------------------------------------------------

    pub fn val(ty: Ty, v: Value) -> Exp {
        Exp::new(ExpKind::Val(ty, v))
    }

    pub fn unit() -> Exp {
        Exp::val(Ty::Unit, Value::Unit)
    }

    pub fn bit(b: bool) -> Exp {
        Exp::val(Ty::Bit, Value::Bit(b))
    }

    pub fn bool_val(b: bool) -> Exp {
        Exp::val(Ty::Bool, Value::Bool(b))
    }

    pub fn int32(i: i64) -> Exp {
        Exp::val(Ty::int32(), Value::Int(i))
    }

    pub fn int(w: crate::types::IntWidth, i: i64) -> Exp {
        Exp::val(Ty::Int(w), Value::Int(i))
    }

    pub fn double(d: f64) -> Exp {
        Exp::val(Ty::Double, Value::Double(d))
    }

    pub fn str_val(s: impl Into<String>) -> Exp {
        Exp::val(Ty::String, Value::Str(s.into()))
    }

    pub fn arr(elems: Vec<Exp>) -> Exp {
        Exp::new(ExpKind::ValArr(elems))
    }

    pub fn record(ty: Ty, fields: Vec<(String, Exp)>) -> Exp {
        Exp::new(ExpKind::Struct { ty, fields })
    }

    // -----------------------------------------------------------------------
    // Compound builders
    // -----------------------------------------------------------------------

    pub fn var(name: &Name) -> Exp {
        Exp::new(ExpKind::Var(name.clone()))
    }

    pub fn unop(op: UnOp, e: Exp) -> Exp {
        Exp::new(ExpKind::UnOp(op, Box::new(e)))
    }

    pub fn binop(op: BinOp, a: Exp, b: Exp) -> Exp {
        Exp::new(ExpKind::BinOp(op, Box::new(a), Box::new(b)))
    }

    pub fn add(a: Exp, b: Exp) -> Exp {
        Exp::binop(BinOp::Add, a, b)
    }

    pub fn mul(a: Exp, b: Exp) -> Exp {
        Exp::binop(BinOp::Mult, a, b)
    }

    pub fn not(e: Exp) -> Exp {
        Exp::unop(UnOp::Not, e)
    }

    pub fn arr_read(arr: Exp, idx: Exp, range: RangeKind) -> Exp {
        Exp::new(ExpKind::ArrRead {
            arr: Box::new(arr),
            idx: Box::new(idx),
            range,
        })
    }

    pub fn arr_write(arr: Exp, idx: Exp, range: RangeKind, rhs: Exp) -> Exp {
        Exp::new(ExpKind::ArrWrite {
            arr: Box::new(arr),
            idx: Box::new(idx),
            range,
            rhs: Box::new(rhs),
        })
    }

    pub fn proj(record: Exp, field: impl Into<String>) -> Exp {
        Exp::new(ExpKind::Proj {
            record: Box::new(record),
            field: field.into(),
        })
    }

    pub fn let_(name: Name, rhs: Exp, body: Exp) -> Exp {
        Exp::new(ExpKind::Let {
            name,
            force_inline: false,
            rhs: Box::new(rhs),
            body: Box::new(body),
        })
    }

    pub fn let_inline(name: Name, rhs: Exp, body: Exp) -> Exp {
        Exp::new(ExpKind::Let {
            name,
            force_inline: true,
            rhs: Box::new(rhs),
            body: Box::new(body),
        })
    }

    pub fn let_ref(name: Name, init: Option<Exp>, body: Exp) -> Exp {
        Exp::new(ExpKind::LetRef {
            name,
            init: init.map(Box::new),
            body: Box::new(body),
        })
    }

    pub fn assign(lhs: Exp, rhs: Exp) -> Exp {
        Exp::new(ExpKind::Assign {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn seq(a: Exp, b: Exp) -> Exp {
        Exp::new(ExpKind::Seq(Box::new(a), Box::new(b)))
    }

    pub fn if_(cond: Exp, then_branch: Exp, else_branch: Exp) -> Exp {
        Exp::new(ExpKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn while_(cond: Exp, body: Exp) -> Exp {
        Exp::new(ExpKind::While {
            cond: Box::new(cond),
            body: Box::new(body),
        })
    }

    pub fn for_(var: Name, start: Exp, len: Exp, body: Exp) -> Exp {
        Exp::new(ExpKind::For {
            var,
            start: Box::new(start),
            len: Box::new(len),
            body: Box::new(body),
        })
    }

    pub fn print(newline: bool, arg: Exp) -> Exp {
        Exp::new(ExpKind::Print {
            newline,
            arg: Box::new(arg),
        })
    }

    pub fn error(msg: impl Into<String>) -> Exp {
        Exp::new(ExpKind::Error { msg: msg.into() })
    }

    pub fn lut(e: Exp) -> Exp {
        Exp::new(ExpKind::Lut(Box::new(e)))
    }

    // -----------------------------------------------------------------------
    // Identity and substitution
    // -----------------------------------------------------------------------

    /// Deterministic identity of this expression with source locations
    /// ignored. Used as the memoization key for guesses.
    ///
    /// The `loc` field is `#[serde(skip)]`, so the serialized form is the
    /// location-erased form by construction.
    pub fn canonical_key(&self) -> String {
        serde_json::to_string(&self.kind).unwrap_or_default()
    }

    /// Returns a copy with every source location removed.
    pub fn erase_loc(&self) -> Exp {
        let mut out = self.clone();
        strip_locs(&mut out);
        out
    }
}

fn strip_locs(e: &mut Exp) {
    e.loc = None;
    match &mut e.kind {
        ExpKind::Val(..) | ExpKind::Var(_) | ExpKind::Error { .. } => {}
        ExpKind::ValArr(elems) => elems.iter_mut().for_each(strip_locs),
        ExpKind::Struct { fields, .. } => fields.iter_mut().for_each(|(_, v)| strip_locs(v)),
        ExpKind::UnOp(_, a) | ExpKind::Lut(a) | ExpKind::Print { arg: a, .. } => strip_locs(a),
        ExpKind::BinOp(_, a, b)
        | ExpKind::Seq(a, b)
        | ExpKind::BPerm(a, b)
        | ExpKind::Assign { lhs: a, rhs: b }
        | ExpKind::While { cond: a, body: b } => {
            strip_locs(a);
            strip_locs(b);
        }
        ExpKind::ArrRead { arr, idx, .. } => {
            strip_locs(arr);
            strip_locs(idx);
        }
        ExpKind::ArrWrite { arr, idx, rhs, .. } => {
            strip_locs(arr);
            strip_locs(idx);
            strip_locs(rhs);
        }
        ExpKind::Proj { record, .. } => strip_locs(record),
        ExpKind::Let { rhs, body, .. } => {
            strip_locs(rhs);
            strip_locs(body);
        }
        ExpKind::LetRef { init, body, .. } => {
            if let Some(i) = init {
                strip_locs(i);
            }
            strip_locs(body);
        }
        ExpKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            strip_locs(cond);
            strip_locs(then_branch);
            strip_locs(else_branch);
        }
        ExpKind::For {
            start, len, body, ..
        } => {
            strip_locs(start);
            strip_locs(len);
            strip_locs(body);
        }
        ExpKind::Call { args, .. } => args.iter_mut().for_each(strip_locs),
    }
}

/// Textual substitution of `replacement` for every free occurrence of the
/// variable `target` in `e`.
///
/// Capture cannot arise because binder identities are unique, but shadowing
/// is still respected: a binder that rebinds `target` stops the substitution
/// in its scope (while its initializer, being outside that scope, is still
/// substituted).
pub fn substitute(e: &Exp, target: UniqId, replacement: &Exp) -> Exp {
    let kind = match &e.kind {
        ExpKind::Var(n) if n.id == target => return replacement.clone(),
        ExpKind::Val(..) | ExpKind::Var(_) | ExpKind::Error { .. } => e.kind.clone(),
        ExpKind::ValArr(elems) => ExpKind::ValArr(
            elems
                .iter()
                .map(|el| substitute(el, target, replacement))
                .collect(),
        ),
        ExpKind::Struct { ty, fields } => ExpKind::Struct {
            ty: ty.clone(),
            fields: fields
                .iter()
                .map(|(f, v)| (f.clone(), substitute(v, target, replacement)))
                .collect(),
        },
        ExpKind::UnOp(op, a) => {
            ExpKind::UnOp(op.clone(), Box::new(substitute(a, target, replacement)))
        }
        ExpKind::BinOp(op, a, b) => ExpKind::BinOp(
            *op,
            Box::new(substitute(a, target, replacement)),
            Box::new(substitute(b, target, replacement)),
        ),
        ExpKind::ArrRead { arr, idx, range } => ExpKind::ArrRead {
            arr: Box::new(substitute(arr, target, replacement)),
            idx: Box::new(substitute(idx, target, replacement)),
            range: *range,
        },
        ExpKind::ArrWrite {
            arr,
            idx,
            range,
            rhs,
        } => ExpKind::ArrWrite {
            arr: Box::new(substitute(arr, target, replacement)),
            idx: Box::new(substitute(idx, target, replacement)),
            range: *range,
            rhs: Box::new(substitute(rhs, target, replacement)),
        },
        ExpKind::Proj { record, field } => ExpKind::Proj {
            record: Box::new(substitute(record, target, replacement)),
            field: field.clone(),
        },
        ExpKind::Let {
            name,
            force_inline,
            rhs,
            body,
        } => ExpKind::Let {
            name: name.clone(),
            force_inline: *force_inline,
            rhs: Box::new(substitute(rhs, target, replacement)),
            body: if name.id == target {
                body.clone()
            } else {
                Box::new(substitute(body, target, replacement))
            },
        },
        ExpKind::LetRef { name, init, body } => ExpKind::LetRef {
            name: name.clone(),
            init: init
                .as_ref()
                .map(|i| Box::new(substitute(i, target, replacement))),
            body: if name.id == target {
                body.clone()
            } else {
                Box::new(substitute(body, target, replacement))
            },
        },
        ExpKind::Assign { lhs, rhs } => ExpKind::Assign {
            lhs: Box::new(substitute(lhs, target, replacement)),
            rhs: Box::new(substitute(rhs, target, replacement)),
        },
        ExpKind::Seq(a, b) => ExpKind::Seq(
            Box::new(substitute(a, target, replacement)),
            Box::new(substitute(b, target, replacement)),
        ),
        ExpKind::If {
            cond,
            then_branch,
            else_branch,
        } => ExpKind::If {
            cond: Box::new(substitute(cond, target, replacement)),
            then_branch: Box::new(substitute(then_branch, target, replacement)),
            else_branch: Box::new(substitute(else_branch, target, replacement)),
        },
        ExpKind::While { cond, body } => ExpKind::While {
            cond: Box::new(substitute(cond, target, replacement)),
            body: Box::new(substitute(body, target, replacement)),
        },
        ExpKind::For {
            var,
            start,
            len,
            body,
        } => ExpKind::For {
            var: var.clone(),
            start: Box::new(substitute(start, target, replacement)),
            len: Box::new(substitute(len, target, replacement)),
            body: if var.id == target {
                body.clone()
            } else {
                Box::new(substitute(body, target, replacement))
            },
        },
        ExpKind::Call { func, args } => ExpKind::Call {
            func: func.clone(),
            args: args
                .iter()
                .map(|a| substitute(a, target, replacement))
                .collect(),
        },
        ExpKind::Print { newline, arg } => ExpKind::Print {
            newline: *newline,
            arg: Box::new(substitute(arg, target, replacement)),
        },
        ExpKind::Lut(a) => ExpKind::Lut(Box::new(substitute(a, target, replacement))),
        ExpKind::BPerm(a, b) => ExpKind::BPerm(
            Box::new(substitute(a, target, replacement)),
            Box::new(substitute(b, target, replacement)),
        ),
    };
    Exp { kind, loc: e.loc }
}

// ---------------------------------------------------------------------------
// Pretty printing
// ---------------------------------------------------------------------------

/// `true` for expressions that never need parentheses as operands.
fn is_atom(e: &Exp) -> bool {
    matches!(
        e.kind,
        ExpKind::Val(..)
            | ExpKind::ValArr(_)
            | ExpKind::Struct { .. }
            | ExpKind::Var(_)
            | ExpKind::ArrRead { .. }
            | ExpKind::Proj { .. }
    )
}

fn fmt_operand(e: &Exp, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if is_atom(e) {
        write!(f, "{e}")
    } else {
        write!(f, "({e})")
    }
}

impl std::fmt::Display for Exp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ExpKind::Val(_, v) => write!(f, "{v}"),
            ExpKind::ValArr(elems) => {
                write!(f, "{{")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "}}")
            }
            ExpKind::Struct { ty, fields } => {
                match ty {
                    Ty::Struct(def) => write!(f, "{}", def.name)?,
                    other => write!(f, "{other}")?,
                }
                write!(f, "{{")?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}={v}")?;
                }
                write!(f, "}}")
            }
            ExpKind::Var(n) => write!(f, "{}", n.ident),
            ExpKind::UnOp(op, a) => match op {
                UnOp::Neg => {
                    write!(f, "-")?;
                    fmt_operand(a, f)
                }
                UnOp::Not => {
                    write!(f, "!")?;
                    fmt_operand(a, f)
                }
                UnOp::BwNeg => {
                    write!(f, "~")?;
                    fmt_operand(a, f)
                }
                UnOp::ALength => write!(f, "length({a})"),
                UnOp::Cast(ty) => write!(f, "{ty}({a})"),
            },
            ExpKind::BinOp(op, a, b) => {
                fmt_operand(a, f)?;
                write!(f, " {} ", op.symbol())?;
                fmt_operand(b, f)
            }
            ExpKind::ArrRead { arr, idx, range } => {
                fmt_operand(arr, f)?;
                match range {
                    RangeKind::Singleton => write!(f, "[{idx}]"),
                    RangeKind::Length(n) => write!(f, "[{idx},{n}]"),
                }
            }
            ExpKind::ArrWrite {
                arr,
                idx,
                range,
                rhs,
            } => {
                fmt_operand(arr, f)?;
                match range {
                    RangeKind::Singleton => write!(f, "[{idx}] := {rhs}"),
                    RangeKind::Length(n) => write!(f, "[{idx},{n}] := {rhs}"),
                }
            }
            ExpKind::Proj { record, field } => {
                fmt_operand(record, f)?;
                write!(f, ".{field}")
            }
            ExpKind::Let {
                name,
                force_inline,
                rhs,
                body,
            } => {
                if *force_inline {
                    write!(f, "let inline {} = {rhs} in {body}", name.ident)
                } else {
                    write!(f, "let {} = {rhs} in {body}", name.ident)
                }
            }
            ExpKind::LetRef { name, init, body } => match init {
                Some(i) => write!(f, "var {} := {i} in {body}", name.ident),
                None => write!(f, "var {} in {body}", name.ident),
            },
            ExpKind::Assign { lhs, rhs } => write!(f, "{lhs} := {rhs}"),
            ExpKind::Seq(a, b) => write!(f, "{a}; {b}"),
            ExpKind::If {
                cond,
                then_branch,
                else_branch,
            } => write!(f, "if {cond} then {then_branch} else {else_branch}"),
            ExpKind::While { cond, body } => write!(f, "while {cond} do {body}"),
            ExpKind::For {
                var,
                start,
                len,
                body,
            } => write!(f, "for {} in [{start}, {len}] do {body}", var.ident),
            ExpKind::Call { func, args } => {
                write!(f, "{}(", func.ident)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            ExpKind::Print { newline, arg } => {
                if *newline {
                    write!(f, "println({arg})")
                } else {
                    write!(f, "print({arg})")
                }
            }
            ExpKind::Error { msg } => write!(f, "error({msg:?})"),
            ExpKind::Lut(a) => write!(f, "lut({a})"),
            ExpKind::BPerm(a, b) => write!(f, "bperm({a}, {b})"),
        }
    }
}
