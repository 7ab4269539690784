//! # Symbolic Expression Simplification Module
//!
//! Search for the cheapest algebraically equivalent form of an expression, and the
//! expansion of logarithms.
//!
//! ## Main Structures and Methods
//!
//! - [`simplify`] - bottom-up: every node is evaluated, its equivalents are enumerated with
//!   the identity rules up to [`SIMPLIFY_DEPTH`] rewrites deep, and the one with the lowest
//!   [`cost`] replaces it
//! - [`algebraic_equivalents`] - the enumeration itself, without duplicates; the input comes
//!   first
//! - [`expand_log`] - `Ln[x*y] -> Ln[x] + Ln[y]`, `Ln[x^y] -> y*Ln[x]` and the same for `Log`,
//!   applied until nothing changes
//!
//! ## Interesting Code Features
//!
//! 1. Equivalents of equal cost never replace the input, so simplifying a simplified
//!    expression returns it unchanged.
//! 2. The factors of the logarithm product rules are pattern variables that do not match `1`,
//!    so `Log[x^3, b]` is not split into `Log[x^3, b] + Log[1, b]` before the power rule sees it.
//! 3. Both passes are cached visitors; a node reached again while it is being simplified is
//!    returned as is, which stops rule cycles such as `Sec[x]^2 <-> 1 + Tan[x]^2`.
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::AlgebraResult;
use crate::symbolic::symbolic_visitors::{
    CachedVisitor, ExprVisitor, VisitCache, cost, visit_cached, walk,
};
use crate::symbolic::transforms::{SubstituteTransform, Transform, TransformSet};
use log::{debug, warn};
use std::collections::HashSet;

/// how many rewrites deep [`algebraic_equivalents`] searches
pub const SIMPLIFY_DEPTH: usize = 3;

//___________________________________RULES____________________________________

/// factor of a product pattern that does not take the identity binding `1`
fn factor_pattern(name: &str) -> Expr {
    Expr::pattern(name, |e| !e.equals_one())
}

/// the identities explored by [`simplify`]
pub fn equivalence_rules(ns: &Namespace) -> AlgebraResult<Vec<SubstituteTransform>> {
    let (x, y, b) = (Expr::var("x"), Expr::var("y"), Expr::var("b"));
    let f = |name: &str, a: &Expr| ns.call(name, vec![a.clone()]);
    let log = |a: Expr, base: &Expr| ns.call("Log", vec![a, base.clone()]);
    let neg = -x.clone();
    let one = Expr::one;
    let two = || Expr::integer(2);

    let mut rules: Vec<(Expr, Expr)> = vec![
        (f("Sqrt", &x)?, x.pow(Expr::inverse(two()))),
        (log(one(), &x)?, Expr::zero()),
        (log(x.clone(), &x)?, one()),
        (log(x.pow(y.clone()), &b)?, y.clone() * log(x.clone(), &b)?),
        (
            log(factor_pattern("x") * factor_pattern("y"), &b)?,
            log(x.clone(), &b)? + log(y.clone(), &b)?,
        ),
    ];
    if let Ok(e) = ns.resolve_value("e") {
        rules.insert(1, (log(x.clone(), &e)?, f("Ln", &x)?));
    }

    // parity
    for (name, odd) in [
        ("Sinh", true),
        ("Cosh", false),
        ("Tanh", true),
        ("Csch", true),
        ("Sech", false),
        ("Coth", true),
        ("Sin", true),
        ("Cos", false),
        ("Tan", true),
        ("Csc", true),
        ("Sec", false),
        ("Cot", true),
    ] {
        let result = if odd { -f(name, &x)? } else { f(name, &x)? };
        rules.push((f(name, &neg)?, result));
    }

    for (sin, cos, tan, csc, sec, cot) in [
        ("Sinh", "Cosh", "Tanh", "Csch", "Sech", "Coth"),
        ("Sin", "Cos", "Tan", "Csc", "Sec", "Cot"),
    ] {
        let (s, c, t) = (f(sin, &x)?, f(cos, &x)?, f(tan, &x)?);
        rules.extend([
            (Expr::inverse(c.clone()), f(sec, &x)?),
            (Expr::inverse(s.clone()), f(csc, &x)?),
            (Expr::inverse(t.clone()), f(cot, &x)?),
            (s.clone() / c.clone(), t.clone()),
            (s.clone() * f(sec, &x)?, t.clone()),
            (c.clone() * f(csc, &x)?, f(cot, &x)?),
        ]);
    }

    let (sinh, cosh, tanh) = (f("Sinh", &x)?, f("Cosh", &x)?, f("Tanh", &x)?);
    rules.extend([
        (cosh.pow(2) - sinh.pow(2), one()),
        (f("Sech", &x)?.pow(2), one() - tanh.pow(2)),
        (f("Coth", &x)?.pow(2), one() + f("Csch", &x)?.pow(2)),
        (f("Exp", &x)? - f("Exp", &neg)?, two() * sinh.clone()),
        (f("Exp", &x)? + f("Exp", &neg)?, two() * cosh.clone()),
        (cosh.clone() + sinh.clone(), f("Exp", &x)?),
        (cosh - sinh, f("Exp", &neg)?),
    ]);

    let (sin, cos, tan) = (f("Sin", &x)?, f("Cos", &x)?, f("Tan", &x)?);
    rules.extend([
        (sin.pow(2) + cos.pow(2), one()),
        (one() + tan.pow(2), f("Sec", &x)?.pow(2)),
        (one() + f("Cot", &x)?.pow(2), f("Csc", &x)?.pow(2)),
    ]);

    rules.extend([
        (
            f("Ln", &(factor_pattern("x") * factor_pattern("y")))?,
            f("Ln", &x)? + f("Ln", &y)?,
        ),
        (f("Ln", &x.pow(y.clone()))?, y.clone() * f("Ln", &x)?),
    ]);

    Ok(rules
        .into_iter()
        .map(|(pattern, result)| SubstituteTransform::new(pattern, result, vec![]))
        .collect())
}

/// the logarithm expansion rules of [`expand_log`]
pub fn log_expansion_rules(ns: &Namespace) -> AlgebraResult<TransformSet> {
    let (x, y, b) = (Expr::var("x"), Expr::var("y"), Expr::var("b"));
    let ln = |a: Expr| ns.call("Ln", vec![a]);
    let log = |a: Expr| ns.call("Log", vec![a, b.clone()]);
    let product = || factor_pattern("x") * factor_pattern("y");
    let rules = vec![
        SubstituteTransform::new(ln(product())?, ln(x.clone())? + ln(y.clone())?, vec![]),
        SubstituteTransform::new(ln(x.pow(y.clone()))?, y.clone() * ln(x.clone())?, vec![]),
        SubstituteTransform::new(log(product())?, log(x.clone())? + log(y.clone())?, vec![]),
        SubstituteTransform::new(log(x.pow(y.clone()))?, y.clone() * log(x.clone())?, vec![]),
        SubstituteTransform::new(ln(ns.call("Exp", vec![x.clone()])?)?, x, vec![]),
    ];
    Ok(TransformSet::from_rules(rules, ns))
}

//___________________________________SIMPLIFICATION____________________________________

/// `x` and everything reachable from it by at most `depth` rule applications, each once
pub fn algebraic_equivalents(
    x: &Expr,
    rules: &[SubstituteTransform],
    depth: usize,
    ns: &Namespace,
) -> Vec<Expr> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    enumerate_equivalents(x, rules, depth, ns, &mut seen, &mut found);
    found
}

fn enumerate_equivalents(
    x: &Expr,
    rules: &[SubstituteTransform],
    depth: usize,
    ns: &Namespace,
    seen: &mut HashSet<Expr>,
    found: &mut Vec<Expr>,
) {
    if !seen.insert(x.clone()) {
        return;
    }
    found.push(x.clone());
    if depth == 0 {
        return;
    }
    for rule in rules {
        if let Some(tx) = rule.try_apply(x, ns) {
            if &tx != x {
                enumerate_equivalents(&tx, rules, depth - 1, ns, seen, found);
            }
        }
    }
}

struct SimplifyVisitor<'a> {
    ns: &'a Namespace,
    rules: Vec<SubstituteTransform>,
    cache: VisitCache,
}

impl SimplifyVisitor<'_> {
    /// cheapest equivalent of `e`; the first one wins a tie, and that is `e` itself
    fn cheapest(&self, e: &Expr) -> Expr {
        let mut best = e.clone();
        let mut best_cost = cost(e);
        for candidate in algebraic_equivalents(e, &self.rules, SIMPLIFY_DEPTH, self.ns)
            .into_iter()
            .skip(1)
        {
            let c = cost(&candidate);
            if c < best_cost {
                best = candidate;
                best_cost = c;
            }
        }
        best
    }
}

impl ExprVisitor for SimplifyVisitor<'_> {
    type Output = Expr;

    fn visit(&mut self, e: &Expr) -> Expr {
        visit_cached(self, e)
    }
    fn visit_unknown(&mut self, e: &Expr) -> Expr {
        let children = walk(self, e);
        let evaluated = evaluate(&children, self.ns);
        let best = self.cheapest(&evaluated);
        if Expr::ptr_eq(&best, &evaluated) {
            best
        } else {
            self.visit(&best)
        }
    }
}

impl CachedVisitor for SimplifyVisitor<'_> {
    fn cache(&mut self) -> &mut VisitCache {
        &mut self.cache
    }
    fn revisit(&mut self, e: &Expr) -> Expr {
        e.clone()
    }
}

/// The algebraic equivalent of `f` with the minimum [`cost`].
pub fn simplify(f: &Expr, ns: &Namespace) -> Expr {
    let rules = match equivalence_rules(ns) {
        Ok(rules) => rules,
        Err(err) => {
            warn!("simplification rules unavailable in this namespace: {}", err);
            return evaluate(f, ns);
        }
    };
    let mut v = SimplifyVisitor {
        ns,
        rules,
        cache: VisitCache::new(),
    };
    let result = v.visit(f);
    debug!("simplified {} to {} ({} nodes visited)", f, result, v.cache.len());
    result
}

//___________________________________LOGARITHMS____________________________________

struct ExpandLogVisitor<'a> {
    ns: &'a Namespace,
    rules: TransformSet,
    cache: VisitCache,
}

impl ExprVisitor for ExpandLogVisitor<'_> {
    type Output = Expr;

    fn visit(&mut self, e: &Expr) -> Expr {
        visit_cached(self, e)
    }
    fn visit_unknown(&mut self, e: &Expr) -> Expr {
        let children = walk(self, e);
        // the rule set only reports results that differ from the input
        match self.rules.transform(&children, self.ns) {
            Some(expanded) => self.visit(&expanded),
            None => children,
        }
    }
}

impl CachedVisitor for ExpandLogVisitor<'_> {
    fn cache(&mut self) -> &mut VisitCache {
        &mut self.cache
    }
    fn revisit(&mut self, e: &Expr) -> Expr {
        e.clone()
    }
}

/// Expands logarithms of products and powers until no rule applies.
pub fn expand_log(f: &Expr, ns: &Namespace) -> Expr {
    let rules = match log_expansion_rules(ns) {
        Ok(rules) => rules,
        Err(err) => {
            warn!("logarithm rules unavailable in this namespace: {}", err);
            return f.clone();
        }
    };
    let mut v = ExpandLogVisitor {
        ns,
        rules,
        cache: VisitCache::new(),
    };
    let result = v.visit(&evaluate(f, ns));
    evaluate(&result, ns)
}
