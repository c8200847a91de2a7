//! Expression interpreter for the phylang optimizer.
//!
//! One reduction engine plays three roles against the typed expression IR:
//!
//! - **Partial evaluation** -- reduce under an open environment, leaving
//!   residual terms where free variables block reduction.
//! - **Full evaluation** -- reduce to a ground normal form; any free
//!   variable is an error.
//! - **Approximation** -- explore the plausible reductions of an expression,
//!   recording *guesses* for unknown boolean and integer sub-terms, so the
//!   optimizer can ask "is this predicate provable?" or "does A imply B?".
//!
//! # Architecture
//!
//! - [`api::Evaluator`] is the entry point: configuration, initial
//!   bindings, and the `eval_*`/`approximate`/`provable` family.
//! - `eval` holds the mode-parameterized reduction engine, including
//!   assignment through deref paths.
//! - `ops` is the dynamic operator table: closed `match` dispatch per
//!   operator over operand type tags, including the cast matrix.
//! - `norm` defines normal forms and the array/struct helpers.
//! - `heap` maps variable identities to their current values.
//! - `guess` and `domain` implement the approximation machinery: memoized
//!   boolean guesses and interval-with-holes integer domains.
//! - [`trace::TraceEntry`] records reduction steps when tracing is enabled.
//!
//! # Usage
//!
//! ```ignore
//! let sum = Exp::add(Exp::int32(1), Exp::int32(2));
//! assert_eq!(eval_int(&sum).outcome, Ok(3));
//!
//! let x = Name::new(0, "x", Ty::int32());
//! let claim = Exp::binop(BinOp::Geq, Exp::mul(Exp::var(&x), Exp::var(&x)), Exp::int32(0));
//! assert!(provable(&claim));
//! ```
//!
//! The interpreter is a pure library: no files, no environment, no
//! concurrency. Approximation is enumerated lazily, so hosts bound the
//! search simply by not pulling more branches.

pub mod api;
mod domain;
pub mod error;
mod eval;
mod guess;
mod heap;
pub mod norm;
pub mod ops;
pub mod trace;

pub use api::{
    approximate, eval_bool, eval_full, eval_int, eval_partial, eval_src_bool, eval_src_int,
    implies, provable, satisfiable, Branch, Branches, Elaborate, EvalConfig, Evaluation, Evaluator,
};
pub use error::EvalError;
pub use trace::TraceEntry;
