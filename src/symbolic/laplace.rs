//! # Laplace transforms
//!
//! `F(s) = L[f(t)]` and `f(t) = IL[F(s)]` as linear transforms driven by rule tables.
//! Expressions outside the tables are expanded in `s` (partial fractions for the inverse)
//! and transformed again; what still does not match stays as an unevaluated `L` or `IL` call,
//! which the evaluation of the result leaves alone.
//!
//! The rules for `D` and `I` make the transform usable for linear differential equations:
//! `L[D[y[t], t], t, s]` becomes `s*L[y[t], t, s] - y[0]`.
use crate::symbolic::evaluate::evaluate_holding;
use crate::symbolic::expand::expand;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::AlgebraResult;
use crate::symbolic::transforms::{
    LinearTransform, SubstituteTransform, Transform, TransformSet, linear_visit,
};
use log::debug;
use std::collections::HashSet;

/// variables shared by the rule tables
struct RuleVars {
    f: Expr,
    t: Expr,
    s: Expr,
    a: Expr,
    n: Expr,
}

impl RuleVars {
    fn new() -> RuleVars {
        RuleVars {
            f: Expr::var("f"),
            t: Expr::var("t"),
            s: Expr::var("s"),
            a: Expr::var("a"),
            n: Expr::var("N"),
        }
    }
}

/// rules on `L[f, t, s]`
pub fn laplace_rules(ns: &Namespace) -> AlgebraResult<TransformSet> {
    let RuleVars { f, t, s, a, n } = RuleVars::new();
    let l = |e: Expr| ns.call("L", vec![e, t.clone(), s.clone()]);
    let call = |name: &str, arg: Expr| ns.call(name, vec![arg]);
    let at = a.clone() * t.clone();
    let s2_a2 = s.pow(2) + a.pow(2);
    let independent = Expr::not(ns.call("IsFunctionOf", vec![a.clone(), t.clone()])?);
    let initial = Expr::substitute_later(f.clone(), Expr::arrow(t.clone(), Expr::zero()));

    let rules = vec![
        SubstituteTransform::new(
            l(ns.call("D", vec![f.clone(), t.clone()])?)?,
            s.clone() * l(f.clone())? - initial,
            vec![],
        ),
        SubstituteTransform::new(
            l(ns.call("I", vec![f.clone(), t.clone()])?)?,
            l(f.clone())? / s.clone(),
            vec![],
        ),
        SubstituteTransform::new(
            l(ns.call("IL", vec![f.clone(), s.clone(), t.clone()])?)?,
            f.clone(),
            vec![],
        ),
        SubstituteTransform::new(
            l(t.pow(n.clone()))?,
            call("Factorial", n.clone())? / s.pow(n.clone() + 1),
            vec![call("IsNatural", n.clone())?],
        ),
        SubstituteTransform::new(
            l(call("Exp", at.clone())?)?,
            Expr::inverse(s.clone() - a.clone()),
            vec![independent.clone()],
        ),
        SubstituteTransform::new(
            l(call("Sin", at.clone())?)?,
            a.clone() / s2_a2.clone(),
            vec![independent.clone()],
        ),
        SubstituteTransform::new(
            l(call("Cos", at)?)?,
            s.clone() / s2_a2,
            vec![independent],
        ),
    ];
    Ok(TransformSet::from_rules(rules, ns))
}

/// rules on `IL[F, s, t]`
pub fn inverse_laplace_rules(ns: &Namespace) -> AlgebraResult<TransformSet> {
    let RuleVars { f, t, s, a, n } = RuleVars::new();
    let il = |e: Expr| ns.call("IL", vec![e, s.clone(), t.clone()]);
    let l_f = ns.call("L", vec![f.clone(), t.clone(), s.clone()])?;
    let call = |name: &str, arg: Expr| ns.call(name, vec![arg]);
    let at = a.clone() * t.clone();
    let s2_a2 = s.pow(2) + a.pow(2);
    let initial = Expr::substitute_later(f.clone(), Expr::arrow(t.clone(), Expr::zero()));

    let rules = vec![
        SubstituteTransform::new(il(l_f.clone())?, f.clone(), vec![]),
        SubstituteTransform::new(
            il(s.clone() * l_f.clone() - initial)?,
            ns.call("D", vec![f.clone(), t.clone()])?,
            vec![],
        ),
        SubstituteTransform::new(
            il(l_f / s.clone())?,
            ns.call("I", vec![f.clone(), t.clone()])?,
            vec![],
        ),
        SubstituteTransform::new(
            il(Expr::inverse(s.pow(n.clone())))?,
            t.pow(n.clone() - 1) / call("Factorial", n.clone() - 1)?,
            vec![call("IsNatural", n.clone())?],
        ),
        SubstituteTransform::new(
            il(Expr::inverse(s.clone() + a.clone()))?,
            call("Exp", -(a.clone() * t.clone()))?,
            vec![],
        ),
        SubstituteTransform::new(
            il(a.clone() / s2_a2.clone())?,
            call("Sin", at.clone())?,
            vec![],
        ),
        // linearity pulls the constant numerator out of a/(s^2 + a^2)
        SubstituteTransform::new(
            il(Expr::inverse(s2_a2.clone()))?,
            call("Sin", at.clone())? / a.clone(),
            vec![],
        ),
        SubstituteTransform::new(il(s.clone() / s2_a2)?, call("Cos", at)?, vec![]),
    ];
    Ok(TransformSet::from_rules(rules, ns))
}

struct Laplace<'a> {
    t: &'a Expr,
    s: &'a Expr,
    ns: &'a Namespace,
    rules: Option<TransformSet>,
    unevaluated: HashSet<Expr>,
}

impl LinearTransform for Laplace<'_> {
    fn ns(&self) -> &Namespace {
        self.ns
    }

    fn is_constant(&self, e: &Expr) -> bool {
        !e.depends_on(self.t)
    }

    fn visit(&mut self, e: &Expr) -> AlgebraResult<Expr> {
        if self.is_constant(e) {
            return Ok(Expr::divide(e.clone(), self.s.clone()));
        }
        linear_visit(self, e)
    }

    fn visit_leaf(&mut self, e: &Expr) -> AlgebraResult<Expr> {
        let le = self
            .ns
            .call("L", vec![e.clone(), self.t.clone(), self.s.clone()])?;
        if self.rules.is_none() {
            self.rules = Some(laplace_rules(self.ns)?);
        }
        if let Some(result) = self.rules.as_ref().and_then(|r| r.transform(&le, self.ns)) {
            return Ok(result);
        }
        let expanded = expand(e, Some(self.s), self.ns)?;
        if &expanded != e {
            return self.visit(&expanded);
        }
        debug!("no Laplace transform rule for {}", e);
        self.unevaluated.insert(le.clone());
        Ok(le)
    }
}

struct InverseLaplace<'a> {
    s: &'a Expr,
    t: &'a Expr,
    ns: &'a Namespace,
    rules: Option<TransformSet>,
    unevaluated: HashSet<Expr>,
}

impl LinearTransform for InverseLaplace<'_> {
    fn ns(&self) -> &Namespace {
        self.ns
    }

    fn is_constant(&self, e: &Expr) -> bool {
        !e.depends_on(self.s)
    }

    fn visit(&mut self, e: &Expr) -> AlgebraResult<Expr> {
        linear_visit(self, e)
    }

    fn visit_leaf(&mut self, e: &Expr) -> AlgebraResult<Expr> {
        let ile = self
            .ns
            .call("IL", vec![e.clone(), self.s.clone(), self.t.clone()])?;
        if self.rules.is_none() {
            self.rules = Some(inverse_laplace_rules(self.ns)?);
        }
        let s = self.s;
        let free_of_s = |x: &Expr| !x.depends_on(s);
        if let Some(result) = self
            .rules
            .as_ref()
            .and_then(|r| r.transform_with(&ile, &free_of_s, self.ns))
        {
            return Ok(result);
        }
        let expanded = expand(e, Some(self.s), self.ns)?;
        if &expanded != e {
            return self.visit(&expanded);
        }
        debug!("no inverse Laplace transform rule for {}", e);
        self.unevaluated.insert(ile.clone());
        Ok(ile)
    }
}

/// `F(s) = L[f(t)]`
pub fn laplace_transform(f: &Expr, t: &Expr, s: &Expr, ns: &Namespace) -> AlgebraResult<Expr> {
    let mut visitor = Laplace {
        t,
        s,
        ns,
        rules: None,
        unevaluated: HashSet::new(),
    };
    let result = visitor.visit(f)?;
    Ok(evaluate_holding(&result, &visitor.unevaluated, ns))
}

/// `f(t) = IL[F(s)]`
pub fn inverse_laplace_transform(
    f: &Expr,
    s: &Expr,
    t: &Expr,
    ns: &Namespace,
) -> AlgebraResult<Expr> {
    let mut visitor = InverseLaplace {
        s,
        t,
        ns,
        rules: None,
        unevaluated: HashSet::new(),
    };
    let result = visitor.visit(f)?;
    Ok(evaluate_holding(&result, &visitor.unevaluated, ns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::evaluate::evaluate;

    fn call(ns: &Namespace, name: &str, arg: Expr) -> Expr {
        ns.call(name, vec![arg]).unwrap()
    }

    fn ts() -> (Expr, Expr) {
        (Expr::var("t"), Expr::var("s"))
    }

    #[test]
    fn test_constant_and_powers() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        assert_eq!(
            laplace_transform(&Expr::integer(3), &t, &s, &ns).unwrap(),
            evaluate(&(Expr::integer(3) / s.clone()), &ns)
        );
        let l = laplace_transform(&t.pow(2), &t, &s, &ns).unwrap();
        assert_eq!(l, evaluate(&(Expr::integer(2) / s.pow(3)), &ns));
    }

    #[test]
    fn test_exponential_and_trig() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        let e = call(&ns, "Exp", t.clone() * 2);
        assert_eq!(
            laplace_transform(&e, &t, &s, &ns).unwrap(),
            evaluate(&Expr::inverse(s.clone() - 2), &ns)
        );
        let sin = call(&ns, "Sin", t.clone() * 3);
        assert_eq!(
            laplace_transform(&sin, &t, &s, &ns).unwrap(),
            evaluate(&(Expr::integer(3) / (s.pow(2) + 9)), &ns)
        );
    }

    #[test]
    fn test_derivative_rule_uses_initial_value() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        let y = Expr::undefined("y", vec![t.clone()]);
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        let l = laplace_transform(&dy, &t, &s, &ns).unwrap();
        let ly = ns.call("L", vec![y, t.clone(), s.clone()]).unwrap();
        let y0 = Expr::undefined("y", vec![Expr::zero()]);
        assert_eq!(l, evaluate(&(s * ly - y0), &ns));
    }

    #[test]
    fn test_inverse_of_simple_fractions() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        let f = Expr::inverse(s.clone() + 1);
        assert_eq!(
            inverse_laplace_transform(&f, &s, &t, &ns).unwrap(),
            call(&ns, "Exp", -t.clone())
        );
        let g = Expr::integer(6) / s.pow(4);
        assert_eq!(inverse_laplace_transform(&g, &s, &t, &ns).unwrap(), evaluate(&t.pow(3), &ns));
        let h = s.clone() / (s.pow(2) + 4);
        assert_eq!(
            inverse_laplace_transform(&h, &s, &t, &ns).unwrap(),
            call(&ns, "Cos", t.clone() * 2)
        );
    }

    #[test]
    fn test_inverse_with_partial_fractions() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        // 1/(s*(s + 1)) = 1/s - 1/(s + 1)
        let f = Expr::inverse(s.clone() * (s.clone() + 1));
        let result = inverse_laplace_transform(&f, &s, &t, &ns).unwrap();
        let expected = evaluate(&(Expr::one() - call(&ns, "Exp", -t.clone())), &ns);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_roundtrip_of_transform() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        let f = Expr::sum([t.clone() * 4, call(&ns, "Exp", -(t.clone() * 3))]);
        let forward = laplace_transform(&f, &t, &s, &ns).unwrap();
        let back = inverse_laplace_transform(&forward, &s, &t, &ns).unwrap();
        assert_eq!(back, evaluate(&f, &ns));
    }

    #[test]
    fn test_unknown_stays_unevaluated() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        let f = call(&ns, "Tan", t.clone());
        let l = laplace_transform(&f, &t, &s, &ns).unwrap();
        assert_eq!(l, ns.call("L", vec![f, t, s]).unwrap());
    }

    #[test]
    fn test_evaluated_transforms_of_unknown_function() {
        let ns = Namespace::standard();
        let (t, s) = ts();
        let y = Expr::undefined("y", vec![t.clone()]);
        let ly = ns.call("L", vec![y.clone(), t.clone(), s.clone()]).unwrap();
        assert_eq!(evaluate(&ly, &ns), ly);

        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        let l_dy = ns.call("L", vec![dy, t.clone(), s.clone()]).unwrap();
        let y0 = Expr::undefined("y", vec![Expr::zero()]);
        assert_eq!(evaluate(&l_dy, &ns), evaluate(&(s.clone() * ly.clone() - y0), &ns));

        let il = ns.call("IL", vec![ly, s, t]).unwrap();
        assert_eq!(evaluate(&il, &ns), y);
    }
}
