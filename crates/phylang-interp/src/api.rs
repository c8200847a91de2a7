//! Top-level evaluation API.
//!
//! Single-branch entry points ([`eval_partial`], [`eval_full`], [`eval_int`],
//! [`eval_bool`]) run one deterministic reduction. The approximation entry
//! points ([`approximate`], [`satisfiable`], [`provable`], [`implies`])
//! enumerate guess branches lazily: each branch is one full re-run of the
//! reduction under a decision script, owning its own heap, guess maps, and
//! print buffer. Hosts bound the search by simply not pulling more branches.
//!
//! [`Evaluator`] carries the configuration and an initial environment of
//! variable bindings; the free functions are shorthands over a default
//! evaluator.

use phylang_core::{BinOp, Exp, ExpKind, Name, Value};

use crate::error::EvalError;
use crate::eval::{Mode, Reducer, Stop};
use crate::heap::Heap;
use crate::trace::TraceEntry;

/// Evaluator configuration.
#[derive(Debug, Clone, Default)]
pub struct EvalConfig {
    /// Record a [`TraceEntry`] per reduction step on the single-branch entry
    /// points.
    pub trace_enabled: bool,
}

/// Result of a top-level evaluation: the outcome plus everything printed
/// along the way. Prints produced before an error are retained.
#[derive(Debug, Clone)]
pub struct Evaluation<T> {
    pub outcome: Result<T, EvalError>,
    pub prints: String,
    /// Reduction trace, when enabled in the configuration.
    pub trace: Option<Vec<TraceEntry>>,
}

/// One successful branch of the approximation enumeration.
#[derive(Debug, Clone)]
pub struct Branch {
    pub value: Exp,
    pub prints: String,
}

/// External elaboration service: type-checks raw source text into the typed
/// IR. The interpreter treats it as a black box (it brings its own
/// fresh-name generator); failures are forwarded as
/// [`EvalError::TypeCheck`].
pub trait Elaborate {
    fn elaborate(&mut self, src: &str) -> Result<Exp, String>;
}

/// Evaluation entry point object: configuration plus initial bindings.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
    bindings: Vec<(Name, Exp)>,
}

struct RunOutput {
    result: Result<Exp, Stop>,
    prints: String,
    trace: Option<Vec<TraceEntry>>,
    script: Vec<bool>,
}

impl Evaluator {
    pub fn new(config: EvalConfig) -> Evaluator {
        Evaluator {
            config,
            bindings: Vec::new(),
        }
    }

    /// Adds an initial heap binding, visible to every evaluation run from
    /// this evaluator.
    pub fn bind(&mut self, name: Name, value: Exp) -> &mut Evaluator {
        self.bindings.push((name, value));
        self
    }

    fn run(&self, mode: Mode, e: &Exp, script: Vec<bool>, trace: bool) -> RunOutput {
        let mut red = Reducer::new(mode, Heap::from_bindings(&self.bindings), script, trace);
        let result = red.eval(e);
        RunOutput {
            result,
            prints: red.prints,
            trace: red.trace,
            script: red.guesses.into_script(),
        }
    }

    fn single(&self, mode: Mode, e: &Exp) -> Evaluation<Exp> {
        let out = self.run(mode, e, Vec::new(), self.config.trace_enabled);
        Evaluation {
            outcome: out.result.map_err(|stop| match stop {
                Stop::Error(err) => err,
                // No guessing happens outside approximation mode.
                Stop::Pruned => EvalError::Internal {
                    message: "pruned branch outside approximation mode".into(),
                },
            }),
            prints: out.prints,
            trace: out.trace,
        }
    }

    /// Reduces `e` as far as possible, leaving residual terms where free
    /// variables block reduction.
    pub fn eval_partial(&self, e: &Exp) -> Evaluation<Exp> {
        self.single(Mode::Partial, e)
    }

    /// Reduces `e` to a ground normal form, failing on any free variable.
    pub fn eval_full(&self, e: &Exp) -> Evaluation<Exp> {
        self.single(Mode::Full, e)
    }

    /// Full evaluation projected to an integer result.
    pub fn eval_int(&self, e: &Exp) -> Evaluation<i64> {
        let ev = self.eval_full(e);
        Evaluation {
            outcome: ev.outcome.and_then(|v| match &v.kind {
                ExpKind::Val(_, Value::Int(i)) => Ok(*i),
                _ => Err(EvalError::TypeProjection {
                    expected: "an integer result".into(),
                    got: v.to_string(),
                }),
            }),
            prints: ev.prints,
            trace: ev.trace,
        }
    }

    /// Full evaluation projected to a boolean result.
    pub fn eval_bool(&self, e: &Exp) -> Evaluation<bool> {
        let ev = self.eval_full(e);
        Evaluation {
            outcome: ev.outcome.and_then(|v| match &v.kind {
                ExpKind::Val(_, Value::Bool(b)) => Ok(*b),
                _ => Err(EvalError::TypeProjection {
                    expected: "a boolean result".into(),
                    got: v.to_string(),
                }),
            }),
            prints: ev.prints,
            trace: ev.trace,
        }
    }

    /// Lazily enumerates the successful branches of the approximation.
    /// Error and pruned branches are silently dropped.
    pub fn approximate(&self, e: &Exp) -> Branches {
        Branches {
            evaluator: self.clone(),
            exp: e.clone(),
            next_script: Some(Vec::new()),
        }
    }

    /// `true` iff some branch of [`Evaluator::approximate`] yields boolean
    /// `true`. An erroring branch is never a witness.
    pub fn satisfiable(&self, e: &Exp) -> bool {
        self.approximate(e)
            .any(|b| matches!(b.value.kind, ExpKind::Val(_, Value::Bool(true))))
    }

    /// `provable(e) = !satisfiable(!e)`. Sound with respect to the guessing
    /// strategy; deliberately incomplete. An erroring branch is never a
    /// counterexample.
    pub fn provable(&self, e: &Exp) -> bool {
        !self.satisfiable(&Exp::not(e.clone()))
    }

    /// `implies(a, b) = provable(!a || b)`.
    pub fn implies(&self, a: &Exp, b: &Exp) -> bool {
        self.provable(&Exp::binop(BinOp::Or, Exp::not(a.clone()), b.clone()))
    }

    /// Elaborates `src` through the type-checking service, then evaluates to
    /// an integer.
    pub fn eval_src_int(&self, src: &str, service: &mut dyn Elaborate) -> Evaluation<i64> {
        match service.elaborate(src) {
            Ok(e) => self.eval_int(&e),
            Err(message) => Evaluation {
                outcome: Err(EvalError::TypeCheck { message }),
                prints: String::new(),
                trace: None,
            },
        }
    }

    /// Elaborates `src` through the type-checking service, then evaluates to
    /// a boolean.
    pub fn eval_src_bool(&self, src: &str, service: &mut dyn Elaborate) -> Evaluation<bool> {
        match service.elaborate(src) {
            Ok(e) => self.eval_bool(&e),
            Err(message) => Evaluation {
                outcome: Err(EvalError::TypeCheck { message }),
                prints: String::new(),
                trace: None,
            },
        }
    }
}

/// Lazy enumeration of approximation branches (depth-first over the guess
/// decisions, assume-true first).
pub struct Branches {
    evaluator: Evaluator,
    exp: Exp,
    next_script: Option<Vec<bool>>,
}

impl Iterator for Branches {
    type Item = Branch;

    fn next(&mut self) -> Option<Branch> {
        loop {
            let script = self.next_script.take()?;
            let out = self.evaluator.run(Mode::Approx, &self.exp, script, false);
            self.next_script = advance(out.script);
            match out.result {
                Ok(value) => {
                    return Some(Branch {
                        value,
                        prints: out.prints,
                    })
                }
                // Error and pruned branches produce no item.
                Err(_) => continue,
            }
        }
    }
}

/// Next decision script in depth-first order: drop exhausted (`false`)
/// suffixes and flip the deepest remaining `true`.
fn advance(mut script: Vec<bool>) -> Option<Vec<bool>> {
    while script.last() == Some(&false) {
        script.pop();
    }
    match script.last_mut() {
        Some(last) => {
            *last = false;
            Some(script)
        }
        None => None,
    }
}

// ---------------------------------------------------------------------------
// Free-function shorthands over a default evaluator
// ---------------------------------------------------------------------------

pub fn eval_partial(e: &Exp) -> Evaluation<Exp> {
    Evaluator::default().eval_partial(e)
}

pub fn eval_full(e: &Exp) -> Evaluation<Exp> {
    Evaluator::default().eval_full(e)
}

pub fn eval_int(e: &Exp) -> Evaluation<i64> {
    Evaluator::default().eval_int(e)
}

pub fn eval_bool(e: &Exp) -> Evaluation<bool> {
    Evaluator::default().eval_bool(e)
}

pub fn approximate(e: &Exp) -> Branches {
    Evaluator::default().approximate(e)
}

pub fn satisfiable(e: &Exp) -> bool {
    Evaluator::default().satisfiable(e)
}

pub fn provable(e: &Exp) -> bool {
    Evaluator::default().provable(e)
}

pub fn implies(a: &Exp, b: &Exp) -> bool {
    Evaluator::default().implies(a, b)
}

pub fn eval_src_int(src: &str, service: &mut dyn Elaborate) -> Evaluation<i64> {
    Evaluator::default().eval_src_int(src, service)
}

pub fn eval_src_bool(src: &str, service: &mut dyn Elaborate) -> Evaluation<bool> {
    Evaluator::default().eval_src_bool(src, service)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_walks_the_tree_depth_first() {
        assert_eq!(advance(vec![true, true]), Some(vec![true, false]));
        assert_eq!(advance(vec![true, false]), Some(vec![false]));
        assert_eq!(advance(vec![false]), None);
        assert_eq!(advance(vec![]), None);
    }

    #[test]
    fn branches_enumerate_both_guesses() {
        let b = Name::new(1, "b", phylang_core::Ty::Bool);
        let outcomes: Vec<Exp> = approximate(&Exp::var(&b)).map(|br| br.value).collect();
        assert_eq!(outcomes, vec![Exp::bool_val(true), Exp::bool_val(false)]);
    }

    #[test]
    fn bound_environment_is_visible() {
        let x = Name::new(1, "x", phylang_core::Ty::int32());
        let mut ev = Evaluator::default();
        ev.bind(x.clone(), Exp::int32(4));
        let out = ev.eval_int(&Exp::add(Exp::var(&x), Exp::int32(1)));
        assert_eq!(out.outcome, Ok(5));
    }
}
