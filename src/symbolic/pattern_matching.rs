//! # Pattern matching
//!
//! Structural matching of a pattern expression against a subject. Every variable of the
//! pattern is a pattern variable: it binds on first use and must match the same expression
//! on every later use. Sums and products are matched commutatively by searching subsets of
//! the subject terms; speculative attempts run inside [`MatchContext::try_match`] so a failed
//! branch never leaves bindings behind.
//!
//! The subset search is exponential in the number of subject terms. Patterns used by the rule
//! sets are small, so this is acceptable in practice.
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::match_context::{Bindings, MatchContext};
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node};
use crate::symbolic::symbolic_errors::AlgebraResult;
use crate::symbolic::symbolic_visitors::{ExprVisitor, walk};
use itertools::Itertools;

impl Expr {
    /// Matches `subject` against this pattern, extending the bindings of `ctx`.
    pub fn matches(&self, subject: &Expr, ctx: &mut MatchContext<'_>) -> bool {
        match self.node() {
            Node::Variable(v) => v.accepts(subject) && ctx.matches(self, subject),
            Node::Constant(_) => self == subject,
            Node::Sum(terms) => match_sum(terms, subject, ctx),
            Node::Product(factors) => match_product(factors, subject, ctx),
            Node::Binary(BinaryOp::Power, base, exponent) => {
                match_power(base, exponent, subject, ctx)
            }
            Node::Binary(op, l, r) => match subject.node() {
                Node::Binary(sop, sl, sr) if sop == op => {
                    ctx.try_match(|c| l.matches(sl, c) && r.matches(sr, c))
                }
                _ => false,
            },
            Node::Unary(op, o) => match subject.node() {
                Node::Unary(sop, so) if sop == op => ctx.try_match(|c| o.matches(so, c)),
                _ => false,
            },
            Node::Call(f, args) => match subject.node() {
                Node::Call(g, sargs) if f == g && args.len() == sargs.len() => {
                    // arguments are matched last to first, so trailing variable arguments
                    // (`D[f, x]`) are bound before the argument that uses them
                    ctx.try_match(|c| {
                        args.iter()
                            .zip(sargs.iter())
                            .rev()
                            .all(|(p, a)| p.matches(a, c))
                    })
                }
                _ => false,
            },
            Node::Set(members) => match subject.node() {
                Node::Set(smembers) if members.len() == smembers.len() => ctx.try_match(|c| {
                    members
                        .iter()
                        .zip(smembers.iter())
                        .all(|(p, a)| p.matches(a, c))
                }),
                _ => false,
            },
        }
    }

    /// bindings of a successful match of `subject` against this pattern
    pub fn match_expr<'a>(&self, subject: &Expr, ns: &'a Namespace) -> Option<MatchContext<'a>> {
        let mut ctx = MatchContext::new(ns);
        if self.matches(subject, &mut ctx) {
            Some(ctx)
        } else {
            None
        }
    }

    /// like [`Expr::match_expr`] with some variables bound in advance by `prematch` arrows
    pub fn match_with<'a>(
        &self,
        subject: &Expr,
        prematch: &[Expr],
        ns: &'a Namespace,
    ) -> AlgebraResult<Option<MatchContext<'a>>> {
        let mut ctx = MatchContext::with_prematch(prematch, ns)?;
        Ok(if self.matches(subject, &mut ctx) {
            Some(ctx)
        } else {
            None
        })
    }
}

fn without(items: &[Expr], skip: &[usize]) -> Vec<Expr> {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| !skip.contains(i))
        .map(|(_, t)| t.clone())
        .collect()
}

/// Commutative matching shared by sums and products. `combine` builds a sum or a product,
/// `residue(subject, x)` removes `x` from the subject (subtraction or division) and
/// `identity` is `0` or `1`.
fn match_commutative(
    pattern: &[Expr],
    subject: &Expr,
    ctx: &mut MatchContext<'_>,
    combine: fn(Vec<Expr>) -> Expr,
    residue: fn(Expr, Expr) -> Expr,
    identity: Expr,
    parts: fn(&Expr) -> &[Expr],
) -> bool {
    let ns = ctx.ns();
    let (constants, rest): (Vec<Expr>, Vec<Expr>) =
        pattern.iter().cloned().partition(|t| t.is_constant());
    let subject = if constants.is_empty() {
        subject.clone()
    } else {
        evaluate(&residue(subject.clone(), combine(constants)), ns)
    };
    if rest.is_empty() {
        return subject == identity;
    }
    let subject_parts = parts(&subject).to_vec();

    for (i, p) in rest.iter().enumerate() {
        let remaining = combine(without(&rest, &[i]));
        if p.is_variable() {
            if let Some(bound) = ctx.get(p).cloned() {
                let reduced = evaluate(&residue(subject.clone(), bound), ns);
                if ctx.try_match(|c| remaining.matches(&reduced, c)) {
                    return true;
                }
            } else {
                for k in 1..=subject_parts.len() {
                    for combo in (0..subject_parts.len()).combinations(k) {
                        let chosen = combine(combo.iter().map(|&j| subject_parts[j].clone()).collect());
                        let others = combine(without(&subject_parts, &combo));
                        if ctx.try_match(|c| p.matches(&chosen, c) && remaining.matches(&others, c)) {
                            return true;
                        }
                    }
                }
                if ctx.try_match(|c| p.matches(&identity, c) && remaining.matches(&subject, c)) {
                    return true;
                }
            }
        } else {
            for j in 0..subject_parts.len() {
                let others = combine(without(&subject_parts, &[j]));
                if ctx.try_match(|c| p.matches(&subject_parts[j], c) && remaining.matches(&others, c)) {
                    return true;
                }
            }
        }
    }
    false
}

fn match_sum(pattern: &[Expr], subject: &Expr, ctx: &mut MatchContext<'_>) -> bool {
    match_commutative(
        pattern,
        subject,
        ctx,
        Expr::sum,
        Expr::subtract,
        Expr::zero(),
        Expr::terms,
    )
}

fn match_product(pattern: &[Expr], subject: &Expr, ctx: &mut MatchContext<'_>) -> bool {
    if subject.equals_zero() {
        let zero = Expr::zero();
        return pattern
            .iter()
            .any(|p| ctx.try_match(|c| p.matches(&zero, c)));
    }
    match_commutative(
        pattern,
        subject,
        ctx,
        Expr::product,
        Expr::divide,
        Expr::one(),
        Expr::factors,
    )
}

fn match_power(base: &Expr, exponent: &Expr, subject: &Expr, ctx: &mut MatchContext<'_>) -> bool {
    let ns = ctx.ns();
    if let Some(bound) = ctx.get(exponent).cloned() {
        let root = evaluate(&Expr::power(subject.clone(), Expr::inverse(bound)), ns);
        if ctx.try_match(|c| base.matches(&root, c)) {
            return true;
        }
    }
    if subject.equals_one() && ctx.try_match(|c| exponent.matches(&Expr::zero(), c)) {
        return true;
    }
    if subject.equals_zero() && ctx.try_match(|c| base.matches(&Expr::zero(), c)) {
        return true;
    }
    if let Some((sb, se)) = subject.as_power() {
        if ctx.try_match(|c| base.matches(sb, c) && exponent.matches(se, c)) {
            return true;
        }
    }
    if ctx.try_match(|c| exponent.matches(&Expr::one(), c) && base.matches(subject, c)) {
        return true;
    }
    let root = evaluate(
        &Expr::power(subject.clone(), Expr::inverse(exponent.clone())),
        ns,
    );
    ctx.try_match(|c| base.matches(&root, c))
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              FIND MATCHES
////////////////////////////////////////////////////////////////////////////////////////////
struct FindMatches<'p, 'n> {
    patterns: &'p [Expr],
    ns: &'n Namespace,
    found: Vec<(Expr, Bindings)>,
}

impl ExprVisitor for FindMatches<'_, '_> {
    type Output = Expr;
    fn visit(&mut self, e: &Expr) -> Expr {
        for p in self.patterns {
            if let Some(ctx) = p.match_expr(e, self.ns) {
                self.found.push((e.clone(), ctx.into_bindings()));
                return e.clone();
            }
        }
        walk(self, e)
    }
    fn visit_unknown(&mut self, e: &Expr) -> Expr {
        walk(self, e)
    }
}

/// Subexpressions of `f` matching one of `patterns`, outermost first. The children of a
/// matched node are not searched.
pub fn find_matches(f: &Expr, patterns: &[Expr], ns: &Namespace) -> Vec<(Expr, Bindings)> {
    let mut finder = FindMatches {
        patterns,
        ns,
        found: Vec::new(),
    };
    finder.visit(f);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(ctx: &MatchContext<'_>, name: &str) -> Expr {
        ctx.get(&Expr::var(name)).cloned().unwrap()
    }

    #[test]
    fn test_product_is_commutative() {
        let ns = Namespace::standard();
        let v = Expr::symbols("a, b, u, w");
        let pattern = v[2].clone() * v[3].clone();
        let ab = v[0].clone() * v[1].clone();
        let ba = v[1].clone() * v[0].clone();
        let m1 = pattern.match_expr(&ab, &ns).unwrap();
        let m2 = pattern.match_expr(&ba, &ns).unwrap();
        assert_eq!(bound(&m1, "u") * bound(&m1, "w"), ab);
        assert_eq!(bound(&m2, "u") * bound(&m2, "w"), ba);
    }

    #[test]
    fn test_sum_variable_takes_several_terms() {
        let ns = Namespace::standard();
        let v = Expr::symbols("a, b, u, x");
        let sin_x = ns.call("Sin", vec![v[3].clone()]).unwrap();
        let pattern = v[2].clone() + sin_x.clone();
        let subject = Expr::sum([v[0].clone(), v[1].clone(), sin_x]);
        let m = pattern.match_expr(&subject, &ns).unwrap();
        assert_eq!(bound(&m, "u"), v[0].clone() + v[1].clone());
    }

    #[test]
    fn test_constant_factor_is_divided_out() {
        let ns = Namespace::standard();
        let (u, b) = (Expr::var("u"), Expr::var("b"));
        let m = (u * 2).match_expr(&(b.clone() * 6), &ns).unwrap();
        assert_eq!(bound(&m, "u"), b * 3);
    }

    #[test]
    fn test_power_root() {
        let ns = Namespace::standard();
        let (u, y) = (Expr::var("u"), Expr::var("y"));
        let m = u.pow(2).match_expr(&y.pow(4), &ns).unwrap();
        assert_eq!(bound(&m, "u"), y.pow(2));
        // a bare subject matches with exponent one
        let n = Expr::var("n");
        let m = y.pow(n).match_expr(&y, &ns).unwrap();
        assert_eq!(bound(&m, "n"), Expr::one());
    }

    #[test]
    fn test_pattern_condition() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let xc = x.clone();
        let c = Expr::pattern("c", move |e| !e.depends_on(&xc));
        let pattern = c * x.clone();
        let m = pattern.match_expr(&(x.clone() * 3), &ns).unwrap();
        assert_eq!(bound(&m, "c"), Expr::integer(3));
        let y = Expr::var("y");
        let m = pattern.match_expr(&(x.clone() * y.clone()), &ns).unwrap();
        assert_eq!(bound(&m, "c"), y);
        // with x pinned, x^2 has no factor free of x
        let pinned = [Expr::arrow(x.clone(), x.clone())];
        assert!(pattern.match_with(&x.pow(2), &pinned, &ns).unwrap().is_none());
    }

    #[test]
    fn test_call_arguments_reverse_order() {
        let ns = Namespace::standard();
        let (u, x, t) = (Expr::var("u"), Expr::var("x"), Expr::var("t"));
        let pattern = ns
            .call("D", vec![ns.call("Sin", vec![u]).unwrap(), x])
            .unwrap();
        let subject = ns
            .call("D", vec![ns.call("Sin", vec![t.pow(2)]).unwrap(), t.clone()])
            .unwrap();
        let m = pattern.match_expr(&subject, &ns).unwrap();
        assert_eq!(bound(&m, "x"), t);
        assert_eq!(bound(&m, "u"), Expr::var("t").pow(2));
    }

    #[test]
    fn test_failed_match_leaves_no_bindings() {
        let ns = Namespace::standard();
        let (u, a, b) = (Expr::var("u"), Expr::var("a"), Expr::var("b"));
        let mut ctx = MatchContext::new(&ns);
        // u binds to a first, then the second use fails against b
        let pattern = Expr::equal(u.clone(), u.clone());
        assert!(!pattern.matches(&Expr::equal(a, b), &mut ctx));
        assert!(ctx.bindings().is_empty());
    }

    #[test]
    fn test_prematch() {
        let ns = Namespace::standard();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        let xc = x.clone();
        let c = Expr::pattern("c", move |e| !e.depends_on(&xc));
        let pattern = c * x.clone();
        let pinned = [Expr::arrow(x.clone(), x.clone())];
        let m = pattern.match_with(&(y.clone() * 5), &pinned, &ns).unwrap();
        // x is pinned to itself so `c*x` cannot match `5*y`
        assert!(m.is_none());
        let m = pattern.match_with(&(x.clone() * y.clone() * 5), &pinned, &ns).unwrap();
        assert_eq!(bound(&m.unwrap(), "c"), y * 5);
    }

    #[test]
    fn test_find_matches() {
        let ns = Namespace::standard();
        let (x, u) = (Expr::var("x"), Expr::var("u"));
        let sin = |e: Expr| ns.call("Sin", vec![e]).unwrap();
        let f = sin(x.clone()) + sin(x.pow(2)) * 3;
        let found = find_matches(&f, &[sin(u)], &ns);
        assert_eq!(found.len(), 2);
    }
}
