//! Guessing for the approximation mode.
//!
//! When the evaluator gets stuck on a sub-term in approximation mode it asks
//! the guesser for an assumed outcome. Boolean sub-terms are memoized by
//! location-erased canonical key: the first encounter forks the enumeration
//! into an assume-true and an assume-false branch, later encounters reuse
//! the recorded assumption. Integer comparisons go through the domain
//! machinery instead, shrinking the compared atom's interval per branch and
//! pruning branches whose interval becomes empty. Non-boolean sub-terms are
//! declined (the evaluator residualizes them), which is what lets a
//! comparison arrive here whole.
//!
//! Branch enumeration is driven by a decision script: a run replays the
//! recorded decisions and extends the script (first alternative: `true`) at
//! each fresh choice point. The driver in `api` flips scripts depth-first.

use std::collections::HashMap;

use phylang_core::{BinOp, Exp, ExpKind, Ty, UnOp};

use crate::domain::{comparison_domain, decide_sign, lin_bounds, linearize, IntDomain};
use crate::eval::Stop;

/// Guess state owned by one evaluation branch: the boolean guess map, the
/// integer-domain map, and the decision script.
#[derive(Debug, Clone, Default)]
pub(crate) struct GuessState {
    bools: HashMap<String, bool>,
    domains: HashMap<String, IntDomain>,
    script: Vec<bool>,
    cursor: usize,
}

impl GuessState {
    pub fn new(script: Vec<bool>) -> GuessState {
        GuessState {
            script,
            ..GuessState::default()
        }
    }

    /// The decisions taken by this run, including any extensions made at
    /// fresh choice points.
    pub fn into_script(self) -> Vec<bool> {
        self.script
    }

    /// Replays the scripted decision at this choice point, or extends the
    /// script with the first alternative.
    fn decide(&mut self) -> bool {
        let d = if self.cursor < self.script.len() {
            self.script[self.cursor]
        } else {
            self.script.push(true);
            true
        };
        self.cursor += 1;
        d
    }

    fn domain_of(&self, key: &str) -> IntDomain {
        self.domains.get(key).cloned().unwrap_or_default()
    }
}

/// Attempts to guess the outcome of a stuck sub-term.
///
/// Returns the assumed ground value, or `None` when the sub-term is not
/// guessable (the caller residualizes it). Prunes the branch when an
/// assumed integer domain would be empty.
pub(crate) fn guess(gs: &mut GuessState, e: &Exp) -> Result<Option<Exp>, Stop> {
    if let ExpKind::BinOp(op, a, b) = &e.kind {
        // Operands are type-correct, so checking one side suffices.
        if op.is_comparison() && int_typed(a) {
            return guess_int_comparison(gs, *op, a, b, e).map(Some);
        }
    }
    if bool_typed(e) {
        return Ok(Some(guess_bool(gs, e)));
    }
    Ok(None)
}

fn guess_bool(gs: &mut GuessState, e: &Exp) -> Exp {
    let key = e.canonical_key();
    let assumed = match gs.bools.get(&key) {
        Some(&b) => b,
        None => {
            let b = gs.decide();
            gs.bools.insert(key, b);
            b
        }
    };
    Exp::bool_val(assumed)
}

/// Integer comparison guess via the linear view `c1*t1 + .. + ck*tk + d op 0`.
fn guess_int_comparison(
    gs: &mut GuessState,
    op: BinOp,
    lhs: &Exp,
    rhs: &Exp,
    whole: &Exp,
) -> Result<Exp, Stop> {
    let lin = linearize(lhs).sub(linearize(rhs));

    if lin.terms.is_empty() {
        // Fully constant; normally folded before reaching the guesser.
        if let Some(v) = decide_sign(op, Some(lin.konst), Some(lin.konst)) {
            return Ok(Exp::bool_val(v));
        }
        return Ok(guess_bool(gs, whole));
    }

    if lin.terms.len() == 1 {
        let Some((key, c)) = lin.terms.iter().map(|(k, c)| (k.clone(), *c)).next() else {
            return Ok(guess_bool(gs, whole));
        };
        let current = gs.domain_of(&key);
        let dom_true = current.intersect(&comparison_domain(op, c, lin.konst));
        let dom_false = current.intersect(&comparison_domain(op.negated(), c, lin.konst));
        return match (dom_true.is_empty(), dom_false.is_empty()) {
            (true, true) => Err(Stop::Pruned),
            (false, true) => {
                gs.domains.insert(key, dom_true);
                Ok(Exp::bool_val(true))
            }
            (true, false) => {
                gs.domains.insert(key, dom_false);
                Ok(Exp::bool_val(false))
            }
            (false, false) => {
                let assume = gs.decide();
                gs.domains
                    .insert(key, if assume { dom_true } else { dom_false });
                Ok(Exp::bool_val(assume))
            }
        };
    }

    // Several atoms: the interval of the whole form can still decide the
    // comparison outright.
    let (lo, hi) = lin_bounds(&lin, |key| gs.domain_of(key));
    if let Some(v) = decide_sign(op, lo, hi) {
        return Ok(Exp::bool_val(v));
    }
    Ok(guess_bool(gs, whole))
}

// ---------------------------------------------------------------------------
// Syntactic type sniffing
// ---------------------------------------------------------------------------

fn int_typed(e: &Exp) -> bool {
    match &e.kind {
        ExpKind::Val(Ty::Int(_), _) => true,
        ExpKind::Var(n) => n.ty.is_int(),
        ExpKind::UnOp(UnOp::Neg | UnOp::BwNeg, a) => int_typed(a),
        ExpKind::UnOp(UnOp::Cast(ty), _) => ty.is_int(),
        ExpKind::UnOp(UnOp::ALength, _) => true,
        ExpKind::BinOp(op, a, _) => match op {
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mult
            | BinOp::Div
            | BinOp::Rem
            | BinOp::Expon
            | BinOp::ShL
            | BinOp::ShR
            | BinOp::BwAnd
            | BinOp::BwOr
            | BinOp::BwXor => int_typed(a),
            _ => false,
        },
        ExpKind::Lut(a) => int_typed(a),
        _ => false,
    }
}

fn bool_typed(e: &Exp) -> bool {
    match &e.kind {
        ExpKind::Val(Ty::Bool, _) => true,
        ExpKind::Var(n) => n.ty == Ty::Bool,
        ExpKind::UnOp(UnOp::Not, _) => true,
        ExpKind::UnOp(UnOp::BwNeg, a) => bool_typed(a),
        ExpKind::BinOp(op, a, _) => {
            op.is_comparison()
                || matches!(op, BinOp::And | BinOp::Or)
                || (matches!(op, BinOp::BwAnd | BinOp::BwOr | BinOp::BwXor) && bool_typed(a))
        }
        ExpKind::Lut(a) => bool_typed(a),
        _ => false,
    }
}
