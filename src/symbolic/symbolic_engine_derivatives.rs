//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of expressions.
//!
//! ## Purpose
//!
//! - differentiate sums, products and powers with the sum, product and power rules
//! - differentiate calls of the standard functions through a table of chain rules
//!   (`D[Sin[u], x] = Cos[u]*D[u, x]`, ...)
//! - keep derivatives that no rule covers as unevaluated `D[f, x]` calls, e.g. the derivative
//!   `D[y[t], t]` of an unknown function
//! - build symbolic Jacobians for the Newton solver
//!
//! ## Key Methods
//! - [`differentiate`] - `df/dx`, evaluated
//! - [`Expr::diff`] - the same for a variable given by name
//! - [`jacobian`] - matrix of partial derivatives, rows computed in parallel
//!
//! ## Interesting Code Features
//!
//! 1. **Rule results recurse through evaluation**: the chain rule templates contain `D[u, x]`,
//!    which the evaluation of the template hands back to the native `D`, i.e. to this module.
//! 2. **Leftover derivatives are held**: a `D[f, x]` that no rule covers is recorded, and the
//!    evaluations of this module leave it alone instead of calling `D` on it again.
//! 3. **Lazy rule table**: the table is built on the first call that needs it, so derivatives
//!    of sums, products and powers of variables never pay for it.
use crate::symbolic::evaluate::evaluate_holding;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr};
use crate::symbolic::symbolic_errors::AlgebraResult;
use crate::symbolic::symbolic_visitors::{ExprVisitor, dispatch};
use crate::symbolic::transforms::{SubstituteTransform, Transform, TransformSet};
use rayon::prelude::*;
use std::collections::HashSet;

/// The chain rules of the standard functions, as rules on `D[f[u], x]`.
pub fn derivative_rules(ns: &Namespace) -> AlgebraResult<TransformSet> {
    let (u, x) = (Expr::var("u"), Expr::var("x"));
    let f = |name: &str, arg: &Expr| ns.call(name, vec![arg.clone()]);
    let d = |e: &Expr| ns.call("D", vec![e.clone(), x.clone()]);
    let sqrt = |e: Expr| ns.call("Sqrt", vec![e]);
    let du = d(&u)?;
    let one_minus_u2 = Expr::sum([Expr::one(), -u.pow(2)]);
    let u2_minus_1 = u.pow(2) - 1;
    let u2_plus_1 = u.pow(2) + 1;
    let abs_u = f("Abs", &u)?;

    let table: Vec<(&str, Expr)> = vec![
        ("Sin", f("Cos", &u)? * du.clone()),
        ("Cos", -f("Sin", &u)? * du.clone()),
        ("Tan", f("Sec", &u)?.pow(2) * du.clone()),
        ("Sec", f("Sec", &u)? * f("Tan", &u)? * du.clone()),
        ("Csc", -f("Csc", &u)? * f("Cot", &u)? * du.clone()),
        ("Cot", -f("Csc", &u)?.pow(2) * du.clone()),
        ("ArcSin", du.clone() / sqrt(one_minus_u2.clone())?),
        ("ArcCos", -du.clone() / sqrt(one_minus_u2.clone())?),
        ("ArcTan", du.clone() / u2_plus_1.clone()),
        ("ArcSec", du.clone() / (abs_u.clone() * sqrt(u2_minus_1.clone())?)),
        ("ArcCsc", -du.clone() / (abs_u.clone() * sqrt(u2_minus_1.clone())?)),
        ("ArcCot", -du.clone() / u2_plus_1.clone()),
        ("Sinh", f("Cosh", &u)? * du.clone()),
        ("Cosh", f("Sinh", &u)? * du.clone()),
        ("Tanh", f("Sech", &u)?.pow(2) * du.clone()),
        ("Sech", -f("Sech", &u)? * f("Tanh", &u)? * du.clone()),
        ("Csch", -f("Csch", &u)? * f("Coth", &u)? * du.clone()),
        ("Coth", -f("Csch", &u)?.pow(2) * du.clone()),
        ("ArcSinh", du.clone() / sqrt(u2_plus_1.clone())?),
        ("ArcCosh", du.clone() / sqrt(u2_minus_1.clone())?),
        ("ArcTanh", du.clone() / one_minus_u2.clone()),
        ("ArcSech", -du.clone() / (u.clone() * sqrt(one_minus_u2.clone())?)),
        ("ArcCsch", -du.clone() / (abs_u.clone() * sqrt(u2_plus_1.clone())?)),
        ("ArcCoth", -du.clone() / one_minus_u2.clone()),
        ("Abs", f("Sign", &u)? * du.clone()),
        ("Sign", Expr::zero()),
        ("Exp", f("Exp", &u)? * du.clone()),
        ("Ln", du.clone() / u.clone()),
    ];
    let mut rules = Vec::with_capacity(table.len() + 4);
    for (name, result) in table {
        rules.push(SubstituteTransform::new(d(&f(name, &u)?)?, result, vec![]));
    }

    // D[I[u, x], x] = u
    let integral = ns.call("I", vec![u.clone(), x.clone()])?;
    rules.push(SubstituteTransform::new(d(&integral)?, u.clone(), vec![]));

    let (a, b, c) = (Expr::var("a"), Expr::var("b"), Expr::var("c"));
    let (t, e) = (Expr::var("t"), Expr::var("f"));
    let branch = |cond: Expr, l: &Expr, r: &Expr| ns.call("If", vec![cond, d(l)?, d(r)?]);
    let if_call = ns.call("If", vec![c.clone(), t.clone(), e.clone()])?;
    rules.push(SubstituteTransform::new(
        d(&if_call)?,
        branch(c, &t, &e)?,
        vec![],
    ));
    let max = ns.call("Max", vec![a.clone(), b.clone()])?;
    let greater = Expr::binary(BinaryOp::Greater, a.clone(), b.clone());
    rules.push(SubstituteTransform::new(d(&max)?, branch(greater, &a, &b)?, vec![]));
    let min = ns.call("Min", vec![a.clone(), b.clone()])?;
    let less = Expr::binary(BinaryOp::Less, a.clone(), b.clone());
    rules.push(SubstituteTransform::new(d(&min)?, branch(less, &a, &b)?, vec![]));

    Ok(TransformSet::from_rules(rules, ns))
}

struct Differentiate<'a> {
    x: &'a Expr,
    ns: &'a Namespace,
    rules: Option<TransformSet>,
    unevaluated: HashSet<Expr>,
}

impl Differentiate<'_> {
    fn evaluate(&self, e: &Expr) -> Expr {
        evaluate_holding(e, &self.unevaluated, self.ns)
    }

    fn product_rule(&mut self, l: &Expr, r: &[Expr]) -> AlgebraResult<Expr> {
        let Some((first, rest)) = r.split_first() else {
            return self.visit(l);
        };
        let dr = self.product_rule(first, rest)?;
        if l.depends_on(self.x) {
            let dl = self.visit(l)?;
            let left = Expr::product(std::iter::once(dl).chain(r.iter().cloned()));
            let right = Expr::product([l.clone(), dr]);
            Ok(self.evaluate(&Expr::sum([left, right])))
        } else {
            Ok(self.evaluate(&Expr::product([l.clone(), dr])))
        }
    }
}

impl ExprVisitor for Differentiate<'_> {
    type Output = AlgebraResult<Expr>;

    fn visit(&mut self, e: &Expr) -> Self::Output {
        if e == self.x {
            Ok(Expr::one())
        } else if !e.depends_on(self.x) {
            Ok(Expr::zero())
        } else {
            dispatch(self, e)
        }
    }

    fn visit_sum(&mut self, _e: &Expr, terms: &[Expr]) -> Self::Output {
        let mut derivatives = Vec::with_capacity(terms.len());
        for t in terms {
            let dt = self.visit(t)?;
            if !dt.equals_zero() {
                derivatives.push(dt);
            }
        }
        Ok(Expr::sum(derivatives))
    }

    fn visit_product(&mut self, _e: &Expr, factors: &[Expr]) -> Self::Output {
        match factors.split_first() {
            Some((first, rest)) => self.product_rule(first, rest),
            None => Ok(Expr::zero()),
        }
    }

    fn visit_power(&mut self, e: &Expr, f: &Expr, g: &Expr) -> Self::Output {
        let df = self.visit(f)?;
        let result = if g.depends_on(self.x) {
            // d(f^g) = f^g * (f'*g/f + g'*Ln[f])
            let dg = self.visit(g)?;
            let ln = self.ns.call("Ln", vec![f.clone()])?;
            Expr::product([
                e.clone(),
                Expr::sum([
                    Expr::product([df, Expr::divide(g.clone(), f.clone())]),
                    Expr::product([dg, ln]),
                ]),
            ])
        } else {
            Expr::product([g.clone(), Expr::power(f.clone(), g.clone() - 1), df])
        };
        Ok(self.evaluate(&result))
    }

    fn visit_unknown(&mut self, e: &Expr) -> Self::Output {
        let de = self.ns.call("D", vec![e.clone(), self.x.clone()])?;
        if self.rules.is_none() {
            self.rules = Some(derivative_rules(self.ns)?);
        }
        match self.rules.as_ref().and_then(|r| r.transform(&de, self.ns)) {
            Some(result) => Ok(result),
            None => {
                self.unevaluated.insert(de.clone());
                Ok(de)
            }
        }
    }
}

/// `df/dx`. Parts that no rule covers stay as `D[., x]` calls.
pub fn differentiate(f: &Expr, x: &Expr, ns: &Namespace) -> AlgebraResult<Expr> {
    let mut visitor = Differentiate {
        x,
        ns,
        rules: None,
        unevaluated: HashSet::new(),
    };
    let df = visitor.visit(f)?;
    Ok(visitor.evaluate(&df))
}

impl Expr {
    /// derivative with respect to the variable called `var`
    pub fn diff(&self, var: &str, ns: &Namespace) -> AlgebraResult<Expr> {
        differentiate(self, &Expr::var(var), ns)
    }
}

/// `J[i][j] = d functions[i] / d variables[j]`
pub fn jacobian(
    functions: &[Expr],
    variables: &[Expr],
    ns: &Namespace,
) -> AlgebraResult<Vec<Vec<Expr>>> {
    functions
        .par_iter()
        .map(|f| {
            variables
                .iter()
                .map(|x| differentiate(f, x, ns))
                .collect::<AlgebraResult<Vec<Expr>>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::evaluate::evaluate;

    fn call(ns: &Namespace, name: &str, arg: Expr) -> Expr {
        ns.call(name, vec![arg]).unwrap()
    }

    #[test]
    fn test_sin() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let d = differentiate(&call(&ns, "Sin", x.clone()), &x, &ns).unwrap();
        assert_eq!(d, call(&ns, "Cos", x));
    }

    #[test]
    fn test_polynomial() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = Expr::sum([x.pow(3), x.pow(2) * 5, x.clone(), Expr::integer(7)]);
        let d = differentiate(&f, &x, &ns).unwrap();
        let expected = evaluate(&Expr::sum([x.pow(2) * 3, x * 10, Expr::one()]), &ns);
        assert_eq!(d, expected);
    }

    #[test]
    fn test_chain_rule() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = call(&ns, "Sin", x.pow(2));
        let d = differentiate(&f, &x, &ns).unwrap();
        let expected = evaluate(&(x.clone() * 2 * call(&ns, "Cos", x.pow(2))), &ns);
        assert_eq!(d, expected);

        let g = call(&ns, "Ln", call(&ns, "Exp", x.clone() * 3));
        let dg = differentiate(&g, &x, &ns).unwrap();
        assert_eq!(dg, Expr::integer(3));
    }

    #[test]
    fn test_product_and_quotient() {
        let ns = Namespace::standard();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        let f = x.pow(2) * y.clone();
        assert_eq!(differentiate(&f, &x, &ns).unwrap(), evaluate(&(x.clone() * y.clone() * 2), &ns));
        assert_eq!(differentiate(&f, &y, &ns).unwrap(), evaluate(&x.pow(2), &ns));
        let q = Expr::divide(Expr::one(), x.clone());
        assert_eq!(differentiate(&q, &x, &ns).unwrap(), evaluate(&-x.pow(-2), &ns));
    }

    #[test]
    fn test_variable_exponent() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let exp_like = Expr::integer(2).pow(x.clone());
        let d = differentiate(&exp_like, &x, &ns).unwrap();
        let ln2 = call(&ns, "Ln", Expr::integer(2));
        // Ln[2] evaluates to a constant
        let expected = evaluate(&(exp_like.clone() * ln2), &ns);
        assert_eq!(d, expected);
    }

    #[test]
    fn test_linearity() {
        let ns = Namespace::standard();
        let (x, a, b) = (Expr::var("x"), Expr::var("A"), Expr::var("B"));
        let f = call(&ns, "Sin", x.clone());
        let g = x.pow(3);
        let combined = Expr::sum([a.clone() * f.clone(), b.clone() * g.clone()]);
        let lhs = differentiate(&combined, &x, &ns).unwrap();
        let rhs = Expr::sum([
            a * differentiate(&f, &x, &ns).unwrap(),
            b * differentiate(&g, &x, &ns).unwrap(),
        ]);
        assert_eq!(lhs, evaluate(&rhs, &ns));
    }

    #[test]
    fn test_unknown_function_stays_symbolic() {
        let ns = Namespace::standard();
        let t = Expr::var("t");
        let y = Expr::undefined("y", vec![t.clone()]);
        let d = differentiate(&y, &t, &ns).unwrap();
        assert_eq!(d, ns.call("D", vec![y, t]).unwrap());
    }

    #[test]
    fn test_evaluated_derivative_of_unknown_function() {
        let ns = Namespace::standard();
        let t = Expr::var("t");
        let y = Expr::undefined("y", vec![t.clone()]);
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        assert_eq!(evaluate(&dy, &ns), dy);
        let once = evaluate(&(dy.clone() * 2 + y.clone()), &ns);
        assert_eq!(evaluate(&once, &ns), once);

        // the chain rule keeps the inner derivative
        let sin = call(&ns, "Sin", y.clone());
        let d = evaluate(&ns.call("D", vec![sin, t.clone()]).unwrap(), &ns);
        assert_eq!(d, evaluate(&(call(&ns, "Cos", y) * dy), &ns));
    }

    #[test]
    fn test_integral_rule() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let g = Expr::undefined("g", vec![x.clone()]);
        let integral = ns.call("I", vec![g.clone(), x.clone()]).unwrap();
        assert_eq!(differentiate(&integral, &x, &ns).unwrap(), g);
    }

    #[test]
    fn test_jacobian() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let functions = vec![x.clone() * y.clone(), x.pow(2) + y.clone()];
        let j = jacobian(&functions, &vars, &ns).unwrap();
        assert_eq!(j[0][0], y);
        assert_eq!(j[0][1], x);
        assert_eq!(j[1][0], evaluate(&(x * 2), &ns));
        assert_eq!(j[1][1], Expr::one());
    }
}
