//! # Symbolic Integration Module
//!
//! Indefinite integrals of simple expressions, plus definite integrals computed either from
//! the antiderivative or numerically.
//!
//! ## Purpose
//!
//! Integration is linear in the integration variable `x`: sums are integrated term by term
//! and factors that do not depend on `x` are moved out. What remains is looked up in a small
//! table of rules:
//!
//! | integrand       | integral           | condition                |
//! |-----------------|--------------------|--------------------------|
//! | `x^N`           | `x^(N+1)/(N+1)`    | `N` constant, `N != -1`  |
//! | `1/x`           | `Ln[x]`            |                          |
//! | `Exp[a*x]`      | `Exp[a*x]/a`       | `a` independent of `x`   |
//! | `Sin[a*x]`      | `-Cos[a*x]/a`      | `a` independent of `x`   |
//! | `Cos[a*x]`      | `Sin[a*x]/a`       | `a` independent of `x`   |
//! | `D[u, x]`       | `u`                |                          |
//!
//! Integrands outside the table stay as `I[f, x]`, and the evaluation of the result leaves
//! those calls alone.
//!
//! ## Main Methods
//! - [`integrate`] - `∫ f dx`
//! - [`definite_integrate`] - `F(b) - F(a)` when the antiderivative is closed
//! - [`quad`] - Gauss-Legendre quadrature of the compiled integrand
use crate::symbolic::evaluate::{evaluate, evaluate_holding};
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node};
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use crate::symbolic::symbolic_lambdify::{Library, compile};
use crate::symbolic::transforms::{
    LinearTransform, SubstituteTransform, Transform, TransformSet, linear_visit,
};
use gauss_quad::GaussLegendre;
use log::info;
use std::collections::HashSet;

/// integration rules as rules on `I[f, x]`
pub fn integral_rules(ns: &Namespace) -> AlgebraResult<TransformSet> {
    let (x, n, a, u) = (
        Expr::var("x"),
        Expr::var("N"),
        Expr::var("a"),
        Expr::var("u"),
    );
    let i = |e: Expr| ns.call("I", vec![e, x.clone()]);
    let f = |name: &str, arg: Expr| ns.call(name, vec![arg]);
    let independent = Expr::not(ns.call("IsFunctionOf", vec![a.clone(), x.clone()])?);
    let ax = a.clone() * x.clone();

    let rules = vec![
        SubstituteTransform::new(
            i(x.pow(n.clone()))?,
            x.pow(n.clone() + 1) / (n.clone() + 1),
            vec![
                ns.call("IsConstant", vec![n.clone()])?,
                Expr::binary(BinaryOp::NotEqual, n.clone(), Expr::integer(-1)),
            ],
        ),
        SubstituteTransform::new(i(x.pow(-1))?, f("Ln", x.clone())?, vec![]),
        SubstituteTransform::new(
            i(f("Exp", ax.clone())?)?,
            f("Exp", ax.clone())? / a.clone(),
            vec![independent.clone()],
        ),
        SubstituteTransform::new(
            i(f("Sin", ax.clone())?)?,
            -f("Cos", ax.clone())? / a.clone(),
            vec![independent.clone()],
        ),
        SubstituteTransform::new(
            i(f("Cos", ax.clone())?)?,
            f("Sin", ax)? / a,
            vec![independent],
        ),
        SubstituteTransform::new(i(ns.call("D", vec![u.clone(), x.clone()])?)?, u, vec![]),
    ];
    Ok(TransformSet::from_rules(rules, ns))
}

struct Integrate<'a> {
    x: &'a Expr,
    ns: &'a Namespace,
    rules: Option<TransformSet>,
    unevaluated: HashSet<Expr>,
}

impl LinearTransform for Integrate<'_> {
    fn ns(&self) -> &Namespace {
        self.ns
    }

    fn is_constant(&self, e: &Expr) -> bool {
        !e.depends_on(self.x)
    }

    fn visit(&mut self, e: &Expr) -> AlgebraResult<Expr> {
        if self.is_constant(e) {
            return Ok(Expr::product([e.clone(), self.x.clone()]));
        }
        linear_visit(self, e)
    }

    fn visit_leaf(&mut self, e: &Expr) -> AlgebraResult<Expr> {
        let ie = self.ns.call("I", vec![e.clone(), self.x.clone()])?;
        if self.rules.is_none() {
            self.rules = Some(integral_rules(self.ns)?);
        }
        match self.rules.as_ref().and_then(|r| r.transform(&ie, self.ns)) {
            Some(result) => Ok(result),
            None => {
                self.unevaluated.insert(ie.clone());
                Ok(ie)
            }
        }
    }
}

/// `∫ f dx` without the constant of integration
pub fn integrate(f: &Expr, x: &Expr, ns: &Namespace) -> AlgebraResult<Expr> {
    let mut visitor = Integrate {
        x,
        ns,
        rules: None,
        unevaluated: HashSet::new(),
    };
    let result = visitor.visit(f)?;
    Ok(evaluate_holding(&result, &visitor.unevaluated, ns))
}

/// `∫ f dx` from `lower` to `upper` through the antiderivative. Fails with `Unimplemented`
/// when the antiderivative still contains an unevaluated integral.
pub fn definite_integrate(
    f: &Expr,
    x: &Expr,
    lower: &Expr,
    upper: &Expr,
    ns: &Namespace,
) -> AlgebraResult<Expr> {
    let antiderivative = integrate(f, x, ns)?;
    if has_integral(&antiderivative) {
        return Err(AlgebraError::Unimplemented(format!(
            "no closed antiderivative of {} in {}",
            f, x
        )));
    }
    let at_upper = antiderivative.substitute_one(x, upper);
    let at_lower = antiderivative.substitute_one(x, lower);
    Ok(evaluate(&Expr::subtract(at_upper, at_lower), ns))
}

fn has_integral(e: &Expr) -> bool {
    match e.node() {
        Node::Call(_, args) => e.call_name() == Some("I") || args.iter().any(has_integral),
        Node::Sum(items) | Node::Product(items) | Node::Set(items) => items.iter().any(has_integral),
        Node::Binary(_, l, r) => has_integral(l) || has_integral(r),
        Node::Unary(_, o) => has_integral(o),
        Node::Constant(_) | Node::Variable(_) => false,
    }
}

/// Numerical integration of `f` over `[lower, upper]` with a Gauss-Legendre rule of the given
/// degree. `f` may only depend on `x`.
pub fn quad(f: &Expr, x: &Expr, lower: f64, upper: f64, degree: usize) -> AlgebraResult<f64> {
    let compiled = compile(f, std::slice::from_ref(x), &[Library::standard()])?;
    let rule = GaussLegendre::new(degree).map_err(|e| {
        AlgebraError::InvalidArgument(format!("Gauss-Legendre rule of degree {}: {:?}", degree, e))
    })?;
    let result = rule.integrate(lower, upper, |t| compiled.eval(&[t]));
    info!("quadrature of {} over [{}, {}]: {}", f, lower, upper, result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn call(ns: &Namespace, name: &str, arg: Expr) -> Expr {
        ns.call(name, vec![arg]).unwrap()
    }

    #[test]
    fn test_integrate_constant_and_variable() {
        let ns = Namespace::standard();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        assert_eq!(integrate(&Expr::integer(5), &x, &ns).unwrap(), evaluate(&(x.clone() * 5), &ns));
        assert_eq!(integrate(&y, &x, &ns).unwrap(), evaluate(&(x.clone() * y), &ns));
        let expected = evaluate(&(x.pow(2) / 2), &ns);
        assert_eq!(integrate(&x, &x, &ns).unwrap(), expected);
    }

    #[test]
    fn test_polynomial_and_trig() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = Expr::sum([x.pow(2) * 3, call(&ns, "Cos", x.clone() * 2)]);
        let result = integrate(&f, &x, &ns).unwrap();
        let expected = evaluate(&(x.pow(3) + call(&ns, "Sin", x.clone() * 2) / 2), &ns);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_reciprocal_and_exponential() {
        let ns = Namespace::standard();
        let (x, a) = (Expr::var("x"), Expr::var("a"));
        assert_eq!(integrate(&x.pow(-1), &x, &ns).unwrap(), call(&ns, "Ln", x.clone()));
        let e = call(&ns, "Exp", a.clone() * x.clone());
        assert_eq!(integrate(&e, &x, &ns).unwrap(), evaluate(&(e.clone() / a), &ns));
    }

    #[test]
    fn test_coefficient_must_not_depend_on_variable() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let e = call(&ns, "Exp", x.pow(2));
        let result = integrate(&e, &x, &ns).unwrap();
        assert_eq!(result, ns.call("I", vec![e, x]).unwrap());
    }

    #[test]
    fn test_derivative_is_undone() {
        let ns = Namespace::standard();
        let t = Expr::var("t");
        let y = Expr::undefined("y", vec![t.clone()]);
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        assert_eq!(integrate(&dy, &t, &ns).unwrap(), y);
    }

    #[test]
    fn test_derivative_of_integral_roundtrip() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = Expr::sum([x.pow(4), x.clone() * 7, call(&ns, "Sin", x.clone() * 3)]);
        let antiderivative = integrate(&f, &x, &ns).unwrap();
        let back = crate::symbolic::symbolic_engine_derivatives::differentiate(&antiderivative, &x, &ns).unwrap();
        assert_eq!(back, evaluate(&f, &ns));
    }

    #[test]
    fn test_definite_integral() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let value = definite_integrate(&x.pow(2), &x, &Expr::zero(), &Expr::integer(3), &ns).unwrap();
        assert_eq!(value, Expr::integer(9));
        let open = call(&ns, "Tan", x.clone());
        assert!(definite_integrate(&open, &x, &Expr::zero(), &Expr::one(), &ns).is_err());
    }

    #[test]
    fn test_evaluated_integral_without_rule() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let tan = call(&ns, "Tan", x.clone());
        let integral = ns.call("I", vec![tan.clone(), x.clone()]).unwrap();
        assert_eq!(evaluate(&integral, &ns), integral);
        // only the part without a rule is left
        let f = Expr::sum([tan, x.clone()]);
        let result = evaluate(&ns.call("I", vec![f, x.clone()]).unwrap(), &ns);
        assert_eq!(result, evaluate(&(integral + x.pow(2) / 2), &ns));
    }

    #[test]
    fn test_quad() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = call(&ns, "Sin", x.clone());
        let value = quad(&f, &x, 0.0, std::f64::consts::PI, 16).unwrap();
        assert_relative_eq!(value, 2.0, epsilon = 1e-10);
    }
}
