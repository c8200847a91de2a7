//! Integer domains and linear views of integer expressions.
//!
//! The approximator tracks, per residual integer term, an interval with
//! holes: optional lower and upper bounds plus a set of excluded values.
//! Comparisons against such terms shrink the domain; a branch whose domain
//! becomes empty is pruned.
//!
//! To connect comparisons to domains, an integer comparison `e1 op e2` is
//! first viewed as a linear form `c1*t1 + ... + ck*tk + d op 0` over atomic
//! residual terms (anything linearization cannot open up -- a variable, an
//! array read, a division -- becomes one atom keyed by its location-erased
//! canonical form). A single-atom form turns into a bound on that atom's
//! domain; a multi-atom form can still be decided outright when interval
//! arithmetic over the recorded domains leaves only one outcome.

use std::collections::{BTreeMap, BTreeSet};

use phylang_core::{BinOp, Exp, ExpKind, Value};

/// Interval with holes over the mathematical integers (carried in `i64`).
///
/// `None` bounds mean unbounded. The default domain is "unbounded, no
/// holes".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct IntDomain {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub holes: BTreeSet<i64>,
}

impl IntDomain {
    pub fn full() -> IntDomain {
        IntDomain::default()
    }

    pub fn empty() -> IntDomain {
        IntDomain {
            lower: Some(1),
            upper: Some(0),
            holes: BTreeSet::new(),
        }
    }

    pub fn point(k: i64) -> IntDomain {
        IntDomain {
            lower: Some(k),
            upper: Some(k),
            holes: BTreeSet::new(),
        }
    }

    pub fn at_least(k: i64) -> IntDomain {
        IntDomain {
            lower: Some(k),
            upper: None,
            holes: BTreeSet::new(),
        }
    }

    pub fn at_most(k: i64) -> IntDomain {
        IntDomain {
            lower: None,
            upper: Some(k),
            holes: BTreeSet::new(),
        }
    }

    pub fn hole(k: i64) -> IntDomain {
        IntDomain {
            lower: None,
            upper: None,
            holes: BTreeSet::from([k]),
        }
    }

    /// Empty when the bounds cross, or when they pin a single value that is
    /// excluded by a hole.
    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) if lo > hi => true,
            (Some(lo), Some(hi)) if lo == hi => self.holes.contains(&lo),
            _ => false,
        }
    }

    /// Pointwise max of lowers, min of uppers, union of holes.
    pub fn intersect(&self, other: &IntDomain) -> IntDomain {
        let lower = match (self.lower, other.lower) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let upper = match (self.upper, other.upper) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let holes = self.holes.union(&other.holes).copied().collect();
        IntDomain {
            lower,
            upper,
            holes,
        }
    }
}

// ---------------------------------------------------------------------------
// Linear forms
// ---------------------------------------------------------------------------

/// `konst + sum(coeff * atom)` with atoms keyed by canonical form.
/// Coefficients are `i128` so intermediate products cannot overflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinForm {
    pub konst: i128,
    pub terms: BTreeMap<String, i128>,
}

impl LinForm {
    fn constant(k: i128) -> LinForm {
        LinForm {
            konst: k,
            terms: BTreeMap::new(),
        }
    }

    fn atom(key: String) -> LinForm {
        LinForm {
            konst: 0,
            terms: BTreeMap::from([(key, 1)]),
        }
    }

    fn add(mut self, other: LinForm) -> LinForm {
        self.konst += other.konst;
        for (key, c) in other.terms {
            *self.terms.entry(key).or_insert(0) += c;
        }
        self.pruned()
    }

    fn neg(mut self) -> LinForm {
        self.konst = -self.konst;
        for c in self.terms.values_mut() {
            *c = -*c;
        }
        self
    }

    pub fn sub(self, other: LinForm) -> LinForm {
        self.add(other.neg())
    }

    fn scale(mut self, k: i128) -> LinForm {
        self.konst *= k;
        for c in self.terms.values_mut() {
            *c *= k;
        }
        self.pruned()
    }

    fn pruned(mut self) -> LinForm {
        self.terms.retain(|_, c| *c != 0);
        self
    }
}

/// Views an integer expression as a linear form. Never fails: sub-terms it
/// cannot open up become atoms.
pub(crate) fn linearize(e: &Exp) -> LinForm {
    match &e.kind {
        ExpKind::Val(_, Value::Int(i)) => LinForm::constant(*i as i128),
        ExpKind::UnOp(phylang_core::UnOp::Neg, a) => linearize(a).neg(),
        ExpKind::BinOp(BinOp::Add, a, b) => linearize(a).add(linearize(b)),
        ExpKind::BinOp(BinOp::Sub, a, b) => linearize(a).sub(linearize(b)),
        ExpKind::BinOp(BinOp::Mult, a, b) => {
            let la = linearize(a);
            let lb = linearize(b);
            if la.terms.is_empty() {
                lb.scale(la.konst)
            } else if lb.terms.is_empty() {
                la.scale(lb.konst)
            } else {
                LinForm::atom(e.canonical_key())
            }
        }
        ExpKind::Lut(a) => linearize(a),
        _ => LinForm::atom(e.canonical_key()),
    }
}

// ---------------------------------------------------------------------------
// Comparison domains
// ---------------------------------------------------------------------------

fn div_floor(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && (a < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i128, b: i128) -> i128 {
    let q = a / b;
    if a % b != 0 && (a < 0) == (b < 0) {
        q + 1
    } else {
        q
    }
}

fn lower_of(x: i128) -> IntDomain {
    if x > i64::MAX as i128 {
        IntDomain::empty()
    } else if x < i64::MIN as i128 {
        IntDomain::full()
    } else {
        IntDomain::at_least(x as i64)
    }
}

fn upper_of(x: i128) -> IntDomain {
    if x < i64::MIN as i128 {
        IntDomain::empty()
    } else if x > i64::MAX as i128 {
        IntDomain::full()
    } else {
        IntDomain::at_most(x as i64)
    }
}

/// The set of atom values `t` for which `c*t + d op 0` holds (`c != 0`).
pub(crate) fn comparison_domain(op: BinOp, c: i128, d: i128) -> IntDomain {
    // Order comparisons reduce to `c*t >= rhs` / `c*t <= rhs`.
    let ge = |rhs: i128| {
        if c > 0 {
            lower_of(div_ceil(rhs, c))
        } else {
            upper_of(div_floor(rhs, c))
        }
    };
    let le = |rhs: i128| {
        if c > 0 {
            upper_of(div_floor(rhs, c))
        } else {
            lower_of(div_ceil(rhs, c))
        }
    };
    match op {
        BinOp::Geq => ge(-d),
        BinOp::Gt => ge(-d + 1),
        BinOp::Leq => le(-d),
        BinOp::Lt => le(-d - 1),
        BinOp::Eq => {
            if d % c == 0 {
                let q = -d / c;
                if (i64::MIN as i128..=i64::MAX as i128).contains(&q) {
                    IntDomain::point(q as i64)
                } else {
                    IntDomain::empty()
                }
            } else {
                IntDomain::empty()
            }
        }
        BinOp::Neq => {
            if d % c == 0 {
                let q = -d / c;
                if (i64::MIN as i128..=i64::MAX as i128).contains(&q) {
                    IntDomain::hole(q as i64)
                } else {
                    IntDomain::full()
                }
            } else {
                IntDomain::full()
            }
        }
        _ => IntDomain::full(),
    }
}

// ---------------------------------------------------------------------------
// Interval decision for multi-atom forms
// ---------------------------------------------------------------------------

fn opt_add(a: Option<i128>, b: Option<i128>) -> Option<i128> {
    Some(a? + b?)
}

/// Interval of the linear form under the recorded atom domains (`None` is
/// the corresponding infinity). Holes are ignored -- the result is a sound
/// over-approximation.
pub(crate) fn lin_bounds<F>(lin: &LinForm, dom_of: F) -> (Option<i128>, Option<i128>)
where
    F: Fn(&str) -> IntDomain,
{
    let mut lo = Some(lin.konst);
    let mut hi = Some(lin.konst);
    for (key, &c) in &lin.terms {
        let dom = dom_of(key);
        let (dlo, dhi) = (dom.lower.map(i128::from), dom.upper.map(i128::from));
        let (term_lo, term_hi) = if c >= 0 {
            (dlo.map(|v| v * c), dhi.map(|v| v * c))
        } else {
            (dhi.map(|v| v * c), dlo.map(|v| v * c))
        };
        lo = opt_add(lo, term_lo);
        hi = opt_add(hi, term_hi);
    }
    (lo, hi)
}

/// Decides `L op 0` from the interval `[lo, hi]` of `L`, when only one
/// outcome is possible.
pub(crate) fn decide_sign(op: BinOp, lo: Option<i128>, hi: Option<i128>) -> Option<bool> {
    let lo_at_least = |k: i128| lo.is_some_and(|v| v >= k);
    let hi_at_most = |k: i128| hi.is_some_and(|v| v <= k);
    match op {
        BinOp::Geq if lo_at_least(0) => Some(true),
        BinOp::Geq if hi_at_most(-1) => Some(false),
        BinOp::Gt if lo_at_least(1) => Some(true),
        BinOp::Gt if hi_at_most(0) => Some(false),
        BinOp::Leq if hi_at_most(0) => Some(true),
        BinOp::Leq if lo_at_least(1) => Some(false),
        BinOp::Lt if hi_at_most(-1) => Some(true),
        BinOp::Lt if lo_at_least(0) => Some(false),
        BinOp::Eq if lo == Some(0) && hi == Some(0) => Some(true),
        BinOp::Eq if lo_at_least(1) || hi_at_most(-1) => Some(false),
        BinOp::Neq if lo_at_least(1) || hi_at_most(-1) => Some(true),
        BinOp::Neq if lo == Some(0) && hi == Some(0) => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phylang_core::{Name, Ty};

    #[test]
    fn default_domain_is_unbounded() {
        let d = IntDomain::full();
        assert_eq!(d.lower, None);
        assert_eq!(d.upper, None);
        assert!(d.holes.is_empty());
        assert!(!d.is_empty());
    }

    #[test]
    fn emptiness() {
        assert!(IntDomain::empty().is_empty());
        assert!(!IntDomain::point(3).is_empty());
        assert!(IntDomain::point(3).intersect(&IntDomain::hole(3)).is_empty());
        assert!(IntDomain::at_least(5)
            .intersect(&IntDomain::at_most(4))
            .is_empty());
        assert!(!IntDomain::at_least(5)
            .intersect(&IntDomain::at_most(5))
            .is_empty());
    }

    #[test]
    fn intersection_is_pointwise() {
        let a = IntDomain {
            lower: Some(0),
            upper: Some(10),
            holes: BTreeSet::from([3]),
        };
        let b = IntDomain {
            lower: Some(2),
            upper: None,
            holes: BTreeSet::from([7]),
        };
        let c = a.intersect(&b);
        assert_eq!(c.lower, Some(2));
        assert_eq!(c.upper, Some(10));
        assert_eq!(c.holes, BTreeSet::from([3, 7]));
    }

    #[test]
    fn intersection_commutes_on_samples() {
        let a = IntDomain::at_least(1);
        let b = IntDomain::at_most(9).intersect(&IntDomain::hole(4));
        assert_eq!(a.intersect(&b), b.intersect(&a));
    }

    #[test]
    fn comparison_domains_positive_coefficient() {
        // t - 5 < 0  <=>  t <= 4
        assert_eq!(comparison_domain(BinOp::Lt, 1, -5), IntDomain::at_most(4));
        // t - 5 >= 0  <=>  t >= 5
        assert_eq!(comparison_domain(BinOp::Geq, 1, -5), IntDomain::at_least(5));
        // t - 5 == 0  <=>  t == 5
        assert_eq!(comparison_domain(BinOp::Eq, 1, -5), IntDomain::point(5));
        // t - 5 != 0  <=>  hole at 5
        assert_eq!(comparison_domain(BinOp::Neq, 1, -5), IntDomain::hole(5));
    }

    #[test]
    fn comparison_domains_scaled_and_negative() {
        // 2t - 3 >= 0  <=>  t >= 2 (integer tightening)
        assert_eq!(comparison_domain(BinOp::Geq, 2, -3), IntDomain::at_least(2));
        // -t + 2 < 0  <=>  t > 2  <=>  t >= 3
        assert_eq!(comparison_domain(BinOp::Lt, -1, 2), IntDomain::at_least(3));
        // 2t - 3 == 0 has no integer solution
        assert!(comparison_domain(BinOp::Eq, 2, -3).is_empty());
        // 2t - 3 != 0 holds everywhere
        assert_eq!(comparison_domain(BinOp::Neq, 2, -3), IntDomain::full());
    }

    #[test]
    fn linearize_collapses_correlated_terms() {
        let x = Name::new(1, "x", Ty::int32());
        // x*2 - x  ==>  1*x
        let e = Exp::binop(
            BinOp::Sub,
            Exp::mul(Exp::var(&x), Exp::int32(2)),
            Exp::var(&x),
        );
        let lin = linearize(&e);
        assert_eq!(lin.konst, 0);
        assert_eq!(lin.terms.len(), 1);
        assert_eq!(*lin.terms.values().next().unwrap(), 1);
    }

    #[test]
    fn linearize_keeps_nonlinear_products_atomic() {
        let x = Name::new(1, "x", Ty::int32());
        let y = Name::new(2, "y", Ty::int32());
        let e = Exp::mul(Exp::var(&x), Exp::var(&y));
        let lin = linearize(&e);
        assert_eq!(lin.terms.len(), 1);
        assert_eq!(lin.konst, 0);
    }

    #[test]
    fn linearize_constant_folding() {
        let e = Exp::add(Exp::int32(2), Exp::mul(Exp::int32(3), Exp::int32(4)));
        assert_eq!(linearize(&e), LinForm::constant(14));
    }

    #[test]
    fn interval_decision() {
        let x = Name::new(1, "x", Ty::int32());
        let lin = linearize(&Exp::add(Exp::var(&x), Exp::int32(1)));
        // With x >= 0, x + 1 >= 0 is decidedly true.
        let (lo, hi) = lin_bounds(&lin, |_| IntDomain::at_least(0));
        assert_eq!(lo, Some(1));
        assert_eq!(hi, None);
        assert_eq!(decide_sign(BinOp::Geq, lo, hi), Some(true));
        assert_eq!(decide_sign(BinOp::Lt, lo, hi), Some(false));
        // With x unconstrained nothing is decided.
        let (lo, hi) = lin_bounds(&lin, |_| IntDomain::full());
        assert_eq!(decide_sign(BinOp::Geq, lo, hi), None);
    }
}
