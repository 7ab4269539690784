//! # Evaluate
//!
//! Constant evaluation and collection of like terms. This is the pass that every other pass
//! ends with: results of rules, substitutions and native calls are run through it to reach
//! the evaluated canonical form.
//!
//! ## Main Structures and Methods
//!
//! - [`EvaluateVisitor`] - cached recursive visitor; a node reached again while it is being
//!   evaluated is returned as it is
//! - [`evaluate`], [`evaluate_at`], [`evaluate_all`] - entry points
//! - [`evaluate_sum`] - combines like terms of a list of evaluated terms
//! - [`distribute`] - `x*A` with `x` distributed over the terms of `A`
//!
//! ## Interesting Code Features
//!
//! 1. Like terms are collected in a `BTreeMap` keyed by the non-constant part, so the result
//!    does not depend on hashing order.
//! 2. Evaluation is infallible: a native function that fails is recorded in
//!    [`EvaluateVisitor::failures`], logged at debug level, and its call is kept unevaluated.
//! 3. An expression that evaluates to itself is returned as the same `Arc`.
//! 4. A visitor built with [`EvaluateVisitor::holding`] evaluates the arguments of the held
//!    calls but never calls their functions. The symbolic operators use it on their own
//!    results: a derivative left as `D[y[t], t]` must not be handed back to `D`.
use crate::symbolic::namespace::Namespace;
use crate::symbolic::real::Real;
use crate::symbolic::substitution::{bindings_from_arrows, substitute};
use crate::symbolic::match_context::Bindings;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node, UnaryOp, Variable};
use crate::symbolic::symbolic_errors::AlgebraError;
use crate::symbolic::symbolic_functions::{Callable, Function};
use crate::symbolic::symbolic_visitors::{CachedVisitor, ExprVisitor, VisitCache, visit_cached, walk};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// relative tolerance of `~=`
pub(crate) const APPROX_EQUAL_TOLERANCE: f64 = 1e-12;

pub struct EvaluateVisitor<'a> {
    ns: &'a Namespace,
    cache: VisitCache,
    failures: Vec<(Expr, AlgebraError)>,
    held: HashSet<Expr>,
}

impl<'a> EvaluateVisitor<'a> {
    pub fn new(ns: &'a Namespace) -> EvaluateVisitor<'a> {
        EvaluateVisitor {
            ns,
            cache: VisitCache::new(),
            failures: Vec::new(),
            held: HashSet::new(),
        }
    }

    /// a visitor that leaves the calls in `held` unevaluated apart from their arguments
    pub fn holding(ns: &'a Namespace, held: HashSet<Expr>) -> EvaluateVisitor<'a> {
        EvaluateVisitor {
            held,
            ..EvaluateVisitor::new(ns)
        }
    }

    /// calls that failed during evaluation, with their errors
    pub fn failures(&self) -> &[(Expr, AlgebraError)] {
        &self.failures
    }

    /// `x*a`, distributing `x` over the terms of `a` (or over `x` when it is a sum)
    pub fn distribute(&mut self, x: &Expr, a: &Expr) -> Expr {
        if a.is_sum() || x.is_sum() {
            let mut terms = Vec::new();
            for t in a.terms() {
                terms.extend(self.distribute(t, x).terms().iter().cloned());
            }
            evaluate_sum(terms)
        } else {
            self.visit(&Expr::product([a.clone(), x.clone()]))
        }
    }

    /// `base^exponent` for evaluated operands
    fn power(&mut self, base: Expr, exponent: Expr) -> Expr {
        let (base, exponent) = match base.as_power() {
            Some((b, e)) => {
                let combined = self.visit(&Expr::product([exponent, e.clone()]));
                (b.clone(), combined)
            }
            None => (base, exponent),
        };
        let lr = base.as_real();
        if lr.is_some_and(|r| r.is_zero()) {
            return Expr::zero();
        }
        if lr.is_some_and(|r| r.is_one()) {
            return Expr::one();
        }
        let rr = exponent.as_real();
        if rr.is_some_and(|r| r.is_zero()) {
            return Expr::one();
        }
        if rr.is_some_and(|r| r.is_one()) {
            return base;
        }
        if let (Some(l), Some(r)) = (lr, rr) {
            if let Some(value) = l.pow(r) {
                return Expr::constant(value);
            }
        }
        Expr::power(base, exponent)
    }

    fn relation(op: BinaryOp, l: &Real, r: &Real) -> Option<bool> {
        Some(match op {
            BinaryOp::Equal => l == r,
            BinaryOp::NotEqual => l != r,
            BinaryOp::Less => l < r,
            BinaryOp::Greater => l > r,
            BinaryOp::LessEqual => l <= r,
            BinaryOp::GreaterEqual => l >= r,
            BinaryOp::ApproxEqual => {
                let scale = if l.abs() > r.abs() { l.abs() } else { r.abs() };
                l == r || (l - r).abs().to_f64() < APPROX_EQUAL_TOLERANCE * scale.to_f64()
            }
            _ => return None,
        })
    }
}

/// returns `original` itself when `result` is structurally equal to it
fn keep_identity(original: &Expr, result: Expr) -> Expr {
    if &result == original {
        original.clone()
    } else {
        result
    }
}

impl ExprVisitor for EvaluateVisitor<'_> {
    type Output = Expr;

    fn visit(&mut self, e: &Expr) -> Expr {
        visit_cached(self, e)
    }
    fn visit_unknown(&mut self, e: &Expr) -> Expr {
        walk(self, e)
    }
    fn visit_constant(&mut self, e: &Expr, _value: &Real) -> Expr {
        e.clone()
    }
    fn visit_variable(&mut self, e: &Expr, _variable: &Variable) -> Expr {
        e.clone()
    }

    fn visit_sum(&mut self, e: &Expr, terms: &[Expr]) -> Expr {
        let mut flat = Vec::with_capacity(terms.len());
        for t in terms {
            flat.extend(self.visit(t).terms().iter().cloned());
        }
        keep_identity(e, evaluate_sum(flat))
    }

    fn visit_product(&mut self, e: &Expr, factors: &[Expr]) -> Expr {
        let mut exponents: BTreeMap<Expr, Real> = BTreeMap::new();
        let mut c = Real::one();
        for f in factors {
            let visited = self.visit(f);
            for i in visited.factors() {
                if let Some(r) = i.as_real() {
                    c = &c * r;
                    continue;
                }
                let (base, exponent) = match i.as_power() {
                    Some((b, x)) => match x.as_real() {
                        Some(r) => (b.clone(), r.clone()),
                        None => (i.clone(), Real::one()),
                    },
                    None => (i.clone(), Real::one()),
                };
                let acc = exponents.entry(base).or_insert_with(Real::zero);
                *acc = &*acc + &exponent;
            }
        }
        if c.is_zero() {
            return Expr::zero();
        }
        if !c.is_one() {
            // c*(a + b) = c*a + c*b and c/(a + b) = 1/(a/c + b/c)
            let target = exponents
                .iter()
                .find(|(base, n)| n.abs().is_one() && base.is_sum())
                .map(|(base, n)| (base.clone(), n.clone()));
            let scale = target
                .as_ref()
                .and_then(|(_, n)| if n.is_negative() { c.recip() } else { Some(c.clone()) });
            if let (Some((sum, n)), Some(scale)) = (target, scale) {
                exponents.remove(&sum);
                let distributed = self.distribute(&Expr::constant(scale), &sum);
                c = Real::one();
                match distributed.as_real() {
                    Some(r) => match r.pow(&n) {
                        Some(v) => c = v,
                        None => {
                            exponents.insert(distributed.clone(), n);
                        }
                    },
                    None => {
                        let acc = exponents.entry(distributed).or_insert_with(Real::zero);
                        *acc = &*acc + &n;
                    }
                }
            }
        }
        let mut rebuilt = Vec::with_capacity(exponents.len() + 1);
        if !c.is_one() {
            rebuilt.push(Expr::constant(c));
        }
        for (base, n) in exponents {
            if n.is_zero() {
                continue;
            }
            if n.is_one() {
                rebuilt.push(base);
            } else {
                rebuilt.push(Expr::power(base, Expr::constant(n)));
            }
        }
        keep_identity(e, Expr::product(rebuilt))
    }

    fn visit_power(&mut self, e: &Expr, base: &Expr, exponent: &Expr) -> Expr {
        let l = self.visit(base);
        if l.is_product() {
            let distributed =
                Expr::product(l.factors().iter().map(|f| Expr::power(f.clone(), exponent.clone())));
            return self.visit(&distributed);
        }
        let r = self.visit(exponent);
        let result = self.power(l, r);
        keep_identity(e, result)
    }

    fn visit_binary(&mut self, e: &Expr, op: BinaryOp, left: &Expr, right: &Expr) -> Expr {
        let l = self.visit(left);
        let r = self.visit(right);
        if op == BinaryOp::Substitute {
            let bindings = bindings_from_arrows(r.members());
            let substituted = substitute(&l, &bindings, false);
            return self.visit(&substituted);
        }
        let (lr, rr) = (l.as_real(), r.as_real());
        if let (Some(a), Some(b)) = (lr, rr) {
            if let Some(truth) = EvaluateVisitor::relation(op, a, b) {
                return Expr::boolean(truth);
            }
        }
        match op {
            BinaryOp::And => {
                if l.is_false() || r.is_false() {
                    return Expr::boolean(false);
                }
                if l.is_true() && r.is_true() {
                    return Expr::boolean(true);
                }
            }
            BinaryOp::Or => {
                if l.is_true() || r.is_true() {
                    return Expr::boolean(true);
                }
                if l.is_false() && r.is_false() {
                    return Expr::boolean(false);
                }
            }
            BinaryOp::Equal | BinaryOp::ApproxEqual if l == r => return Expr::boolean(true),
            BinaryOp::NotEqual if l == r => return Expr::boolean(false),
            _ => {}
        }
        keep_identity(e, Expr::binary(op, l, r))
    }

    fn visit_unary(&mut self, e: &Expr, op: UnaryOp, operand: &Expr) -> Expr {
        let o = self.visit(operand);
        match op {
            UnaryOp::Not if o.is_true() => Expr::boolean(false),
            UnaryOp::Not if o.is_false() => Expr::boolean(true),
            UnaryOp::Not => keep_identity(e, Expr::not(o)),
        }
    }

    fn visit_call(&mut self, e: &Expr, _function: &Arc<Function>, _args: &[Expr]) -> Expr {
        let call = walk(self, e);
        if self.held.contains(e) || self.held.contains(&call) {
            return call;
        }
        let Node::Call(f, args) = call.node() else {
            return call;
        };
        if !f.can_call(args) {
            return call;
        }
        match f.call(args, self.ns) {
            Ok(Some(result)) => keep_identity(&call, result),
            Ok(None) => call,
            Err(err) => {
                debug!("evaluation of {} failed: {}", call, err);
                self.failures.push((call.clone(), err));
                call
            }
        }
    }
}

impl CachedVisitor for EvaluateVisitor<'_> {
    fn cache(&mut self) -> &mut VisitCache {
        &mut self.cache
    }
    fn revisit(&mut self, e: &Expr) -> Expr {
        e.clone()
    }
}

/// Combines like terms. Each term is split into its constant coefficient and the rest; the
/// coefficients of equal rests are added.
pub fn evaluate_sum<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
    let mut coefficients: BTreeMap<Expr, Real> = BTreeMap::new();
    let mut c = Real::zero();
    for t in terms {
        if let Some(r) = t.as_real() {
            c = &c + r;
            continue;
        }
        let factors = t.factors();
        let (coefficient, rest) = match factors.iter().position(|f| f.is_constant()) {
            Some(i) => {
                let coefficient = factors[i].as_real().cloned().unwrap_or_else(Real::one);
                let rest = Expr::product(
                    factors
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, f)| f.clone()),
                );
                (coefficient, rest)
            }
            None => (Real::one(), t.clone()),
        };
        let acc = coefficients.entry(rest).or_insert_with(Real::zero);
        *acc = &*acc + &coefficient;
    }
    let mut rebuilt: Vec<Expr> = coefficients
        .into_iter()
        .filter(|(_, k)| !k.is_zero())
        .map(|(t, k)| {
            if k.is_one() {
                t
            } else {
                Expr::product([Expr::constant(k), t])
            }
        })
        .collect();
    if !c.is_zero() {
        rebuilt.push(Expr::constant(c));
    }
    Expr::sum(rebuilt)
}

pub fn evaluate(f: &Expr, ns: &Namespace) -> Expr {
    EvaluateVisitor::new(ns).visit(f)
}

/// evaluates `f` without calling the functions of the `held` calls
pub fn evaluate_holding(f: &Expr, held: &HashSet<Expr>, ns: &Namespace) -> Expr {
    EvaluateVisitor::holding(ns, held.clone()).visit(f)
}

/// evaluates `f` after substituting the `x -> value` arrows
pub fn evaluate_at(f: &Expr, arrows: &[Expr], ns: &Namespace) -> Expr {
    evaluate(&substitute(f, &bindings_from_arrows(arrows), false), ns)
}

/// evaluates several expressions under the same bindings with one shared cache
pub fn evaluate_all(fs: &[Expr], bindings: &Bindings, ns: &Namespace) -> Vec<Expr> {
    let mut visitor = EvaluateVisitor::new(ns);
    fs.iter()
        .map(|f| visitor.visit(&substitute(f, bindings, false)))
        .collect()
}

/// `x*a` with `x` distributed over the terms of `a`
pub fn distribute(x: &Expr, a: &Expr, ns: &Namespace) -> Expr {
    EvaluateVisitor::new(ns).distribute(x, a)
}

impl Expr {
    pub fn evaluate(&self, ns: &Namespace) -> Expr {
        evaluate(self, ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns() -> Namespace {
        Namespace::standard()
    }

    #[test]
    fn test_like_terms() {
        let ns = ns();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        let f = Expr::sum([x.clone(), x.clone() * 2, y.clone(), Expr::integer(3), Expr::integer(-3)]);
        assert_eq!(evaluate(&f, &ns), Expr::sum([x * 3, y]));
    }

    #[test]
    fn test_cancellation() {
        let ns = ns();
        let x = Expr::var("x");
        assert_eq!(evaluate(&(x.clone() - x.clone()), &ns), Expr::zero());
        assert_eq!(evaluate(&(x.clone() / x.clone()), &ns), Expr::one());
        assert_eq!(evaluate(&(x.pow(2) * x.clone()), &ns), x.pow(3));
    }

    #[test]
    fn test_powers() {
        let ns = ns();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        assert_eq!(evaluate(&Expr::integer(2).pow(10), &ns), Expr::integer(1024));
        assert_eq!(evaluate(&x.pow(0), &ns), Expr::one());
        assert_eq!(evaluate(&x.pow(1), &ns), x);
        assert_eq!(evaluate(&x.pow(2).pow(3), &ns), x.pow(6));
        // (x*y)^2 = x^2*y^2
        let distributed = evaluate(&(x.clone() * y.clone()).pow(2), &ns);
        assert_eq!(distributed, Expr::product([x.pow(2), y.pow(2)]));
        assert_eq!(evaluate(&Expr::integer(4).pow(Expr::ratio(1, 2).unwrap()), &ns), Expr::integer(2));
    }

    #[test]
    fn test_constant_is_distributed_into_sum() {
        let ns = ns();
        let x = Expr::var("x");
        let f = Expr::product([Expr::integer(2), x.clone() + 1]);
        assert_eq!(evaluate(&f, &ns), Expr::sum([x * 2, Expr::integer(2)]));
    }

    #[test]
    fn test_relations() {
        let ns = ns();
        let (one, two) = (Expr::integer(1), Expr::integer(2));
        assert!(evaluate(&Expr::binary(BinaryOp::Greater, two.clone(), one.clone()), &ns).is_true());
        assert!(evaluate(&Expr::binary(BinaryOp::LessEqual, two.clone(), one.clone()), &ns).is_false());
        assert!(evaluate(&Expr::binary(BinaryOp::Less, one.clone(), two.clone()), &ns).is_true());
        assert!(evaluate(&Expr::binary(BinaryOp::GreaterEqual, one.clone(), one.clone()), &ns).is_true());
        let x = Expr::var("x");
        assert!(evaluate(&Expr::equal(x.clone(), x.clone()), &ns).is_true());
        assert!(evaluate(&Expr::binary(BinaryOp::NotEqual, x.clone(), x.clone()), &ns).is_false());
        let near = Expr::try_from(1.0 + 1e-14).unwrap();
        assert!(evaluate(&Expr::binary(BinaryOp::ApproxEqual, near, one.clone()), &ns).is_true());
        assert!(evaluate(&Expr::not(Expr::zero()), &ns).is_true());
        let and = Expr::binary(BinaryOp::And, x.clone(), Expr::zero());
        assert!(evaluate(&and, &ns).is_false());
        let or = Expr::binary(BinaryOp::Or, x, Expr::one());
        assert!(evaluate(&or, &ns).is_true());
    }

    #[test]
    fn test_idempotent_identity() {
        let ns = ns();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        let sin = ns.call("Sin", vec![x.clone()]).unwrap();
        let f = Expr::sum([x.pow(2) * 3, sin * y.clone(), y.pow(-1)]);
        let once = evaluate(&f, &ns);
        let twice = evaluate(&once, &ns);
        assert!(Expr::ptr_eq(&once, &twice));
    }

    #[test]
    fn test_native_calls() {
        let ns = ns();
        let x = Expr::var("x");
        let at_zero = ns.call("Cos", vec![Expr::zero()]).unwrap();
        assert_eq!(evaluate(&at_zero, &ns), Expr::one());
        let symbolic = ns.call("Cos", vec![x.clone()]).unwrap();
        assert_eq!(evaluate(&symbolic, &ns), symbolic);
        let at = evaluate_at(&symbolic, &[Expr::arrow(x, Expr::zero())], &ns);
        assert_eq!(at, Expr::one());
    }

    #[test]
    fn test_failed_call_is_recorded() {
        let ns = ns();
        let c = Expr::var("c");
        let call = ns
            .call("If", vec![c, Expr::var("a"), Expr::var("b")])
            .unwrap();
        let mut visitor = EvaluateVisitor::new(&ns);
        let result = visitor.visit(&call);
        assert_eq!(result, call);
        assert_eq!(visitor.failures().len(), 1);
    }

    #[test]
    fn test_distribute() {
        let ns = ns();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        let r = distribute(&(x.clone() + 1), &(y.clone() + 1), &ns);
        assert_eq!(r, Expr::sum([x.clone() * y.clone(), x, y, Expr::one()]));
    }
}
