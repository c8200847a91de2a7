//! Reduction trace recording.
//!
//! When tracing is enabled via [`crate::api::EvalConfig::trace_enabled`],
//! the evaluator records a [`TraceEntry`] for every reduction step,
//! capturing the expression going in and the outcome coming out, both
//! pretty-printed.

/// A single entry in the reduction trace.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Pretty form of the expression before reduction.
    pub expr: String,
    /// Pretty form of the reduced expression, or the error message.
    pub outcome: String,
}
