//! Evaluation error types.
//!
//! Every error short-circuits the current evaluation branch only: the
//! approximation driver drops erroring branches and keeps enumerating, while
//! the single-branch entry points surface the error together with whatever
//! print output was produced before it.

use serde::{Deserialize, Serialize};

/// Errors produced while reducing an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum EvalError {
    #[error("out of bounds: index {index} on array of length {len}")]
    OutOfBounds { index: i64, len: usize },

    #[error("unknown field `{field}` in struct `{name}`")]
    UnknownField { name: String, field: String },

    /// Read or write of a variable absent from the heap. Writes to
    /// variables not introduced by the interpreted expression always land
    /// here, in every mode.
    #[error("variable `{ident}` is not in scope")]
    NotInScope { ident: String },

    /// Full evaluation demanded a value that depends on a free variable.
    #[error("free variables prevent full evaluation: `{expr}`")]
    FreeVariables { expr: String },

    /// An `if`/`while` condition or `for` bound did not reduce to a literal.
    #[error("control flow on a non-ground condition: `{expr}`")]
    ControlFlowNotGround { expr: String },

    #[error("unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String },

    /// A cast outside the conversion matrix, or an arithmetic operator
    /// applied outside its domain (division or remainder by zero, negative
    /// or oversized shift amounts, negative exponents).
    #[error("operator domain error: {reason}")]
    OpDomain { reason: String },

    /// An `error` node was executed; carries the user message.
    #[error("{message}")]
    ExplicitError { message: String },

    /// `eval_int`/`eval_bool` demanded a result shape and got another.
    #[error("expected {expected}, got `{got}`")]
    TypeProjection { expected: String, got: String },

    /// Forwarded from the elaboration service by the source-level entry
    /// points.
    #[error("type check failed: {message}")]
    TypeCheck { message: String },

    /// Assignment walked through an index, array, or struct that is not
    /// ground.
    #[error("partial assignment for arrays/structs not supported: `{expr}`")]
    AssignNotGround { expr: String },

    /// A `var` declaration without initializer whose type is an array of
    /// symbolic length has no constructible default.
    #[error("cannot build a default value for symbolic-length array `{ident}`")]
    SymbolicArrayLength { ident: String },

    /// Invariant violation inside the interpreter (e.g. a slice splice of
    /// mismatched length).
    #[error("internal error: {message}")]
    Internal { message: String },
}
