//! # Expand
//!
//! Distribution of products over sums and expansion of rational functions into partial
//! fractions.
//!
//! ## Main Methods
//!
//! - [`expand`] - `expand(f, None)` distributes products and integer powers of sums;
//!   `expand(f, Some(x))` additionally splits quotients with a non-trivial denominator in `x`
//!   into partial fractions
//! - [`partial_fractions`] - `N(x)/D(x)` as a sum of terms `P_j(x)/e(x)^j`, one group for each
//!   factor `e^n` of `D`
//!
//! ## Interesting Code Features
//!
//! 1. The unknown numerators of the partial fractions are polynomials with coefficients
//!    `_A0, _A1, ...`. Their values come from the linear solver, by equating the coefficients
//!    of `N` with those of `D*Σ terms`.
//! 2. Denominator factors are made monic and their leading coefficients are moved into the
//!    numerator, so every term has the shape `c*P(x)/e(x)^j` with the constant outside.
//! 3. Improper fractions are reduced by polynomial long division first.
use crate::symbolic::evaluate::{distribute, evaluate, evaluate_sum};
use crate::symbolic::factor::factor;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::polynomial::Polynomial;
use crate::symbolic::solve::solve;
use crate::symbolic::substitution::bindings_from_arrows;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node};
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use log::debug;

/// Expands `f`. With `x` given, quotients of polynomials in `x` are split into partial
/// fractions. An expression that cannot be expanded is returned structurally unchanged.
pub fn expand(f: &Expr, x: Option<&Expr>, ns: &Namespace) -> AlgebraResult<Expr> {
    match f.node() {
        Node::Product(_) => expand_product(f, x, ns),
        Node::Sum(terms) => {
            let mut expanded = Vec::with_capacity(terms.len());
            for t in terms {
                expanded.extend(expand(t, x, ns)?.terms().iter().cloned());
            }
            Ok(evaluate_sum(expanded))
        }
        Node::Binary(BinaryOp::Power, base, _) => expand_power(f, base, x, ns),
        Node::Binary(op, l, r) => Ok(Expr::binary(*op, expand(l, None, ns)?, expand(r, None, ns)?)),
        Node::Unary(op, operand) => Ok(Expr::from_node(Node::Unary(*op, expand(operand, None, ns)?))),
        _ => Ok(f.clone()),
    }
}

/// partial fractions when they apply, `None` when `n/d` is not a rational function of `x`
fn try_partial_fractions(n: &Expr, d: &Expr, x: &Expr, ns: &Namespace) -> AlgebraResult<Option<Expr>> {
    match partial_fractions(n, d, x, ns) {
        Ok(e) => Ok(Some(e)),
        Err(AlgebraError::InvalidArgument(msg)) => {
            debug!("no partial fractions for ({})/({}): {}", n, d, msg);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn expand_power(f: &Expr, base: &Expr, x: Option<&Expr>, ns: &Namespace) -> AlgebraResult<Expr> {
    let n = f.integral_exponent_of();
    if n < 0 {
        if let Some(x) = x {
            let b = factor(base, Some(x), ns);
            let d = Expr::product(
                b.factors()
                    .iter()
                    .map(|i| {
                        if n == -1 {
                            i.clone()
                        } else {
                            Expr::power(i.clone(), Expr::integer(-n))
                        }
                    })
                    .collect::<Vec<_>>(),
            );
            if let Some(e) = try_partial_fractions(&Expr::one(), &d, x, ns)? {
                return Ok(e);
            }
        }
        return Ok(f.clone());
    }
    if n > 1 && base.is_sum() {
        let mut e = base.clone();
        for _ in 1..n {
            e = distribute(base, &e, ns);
        }
        return Ok(e);
    }
    Ok(f.clone())
}

fn expand_product(f: &Expr, x: Option<&Expr>, ns: &Namespace) -> AlgebraResult<Expr> {
    if let Some(x) = x {
        let d = factor(&f.denominator(), Some(x), ns);
        if d.is_product() {
            if let Some(e) = try_partial_fractions(&f.numerator(), &d, x, ns)? {
                return Ok(e);
            }
        }
    }
    let mut expanded = Vec::with_capacity(f.factors().len());
    for i in f.factors() {
        expanded.push(expand(i, x, ns)?);
    }
    if !expanded.iter().any(|i| i.is_sum()) {
        return Ok(f.clone());
    }
    let mut e = Expr::one();
    for i in expanded {
        e = distribute(&i, &e, ns);
    }
    Ok(e)
}

/// `n/d` in partial fractions of `x`. `d` is taken as a product of powers of polynomials in
/// `x`; `InvalidArgument` when a factor of `d` or `n` is not a polynomial.
pub fn partial_fractions(n: &Expr, d: &Expr, x: &Expr, ns: &Namespace) -> AlgebraResult<Expr> {
    let mut unknowns: Vec<Expr> = Vec::new();
    // unknown numerator and the denominator power it sits over
    let mut terms: Vec<(Expr, Expr)> = Vec::new();
    let mut leads: Vec<Expr> = Vec::new();
    let mut monic_factors: Vec<Expr> = Vec::new();

    for i in d.factors() {
        let multiplicity = i.integral_exponent_of();
        let e = if multiplicity != 1 { i.base_of() } else { i };
        if multiplicity < 1 {
            return Err(AlgebraError::InvalidArgument(format!("{} is not a denominator factor", i)));
        }
        let p = Polynomial::new(e, x, ns)?;
        let lead = p.coefficient(p.degree());
        leads.push(Expr::power(lead.clone(), Expr::integer(multiplicity)));
        if p.degree() == 0 {
            continue;
        }
        let monic = distribute(&Expr::inverse(lead), e, ns);
        for j in 1..=multiplicity {
            let mut numerator = Vec::new();
            for k in 0..p.degree() {
                let a = Expr::var(&format!("_A{}", unknowns.len()));
                numerator.push(match k {
                    0 => a.clone(),
                    1 => Expr::product([a.clone(), x.clone()]),
                    _ => Expr::product([a.clone(), Expr::power(x.clone(), Expr::integer(k))]),
                });
                unknowns.push(a);
            }
            terms.push((Expr::sum(numerator), Expr::power(monic.clone(), Expr::integer(-j))));
        }
        monic_factors.push(Expr::power(monic, Expr::integer(multiplicity)));
    }
    if terms.is_empty() {
        return Err(AlgebraError::InvalidArgument(format!("{} does not depend on {}", d, x)));
    }

    let scaled = Expr::product([n.clone(), Expr::inverse(Expr::product(leads))]);
    let numerator = Polynomial::new(&expand(&evaluate(&scaled, ns), None, ns)?, x, ns)?;
    let monic_d = Expr::product(monic_factors);
    let denominator = Polynomial::new(&expand(&evaluate(&monic_d, ns), None, ns)?, x, ns)?;

    let (quotient, remainder) = if numerator.degree() >= denominator.degree() {
        Polynomial::long_division(&numerator, &denominator, ns)?
    } else {
        (
            Polynomial::from_coefficients(Default::default(), x.clone()),
            numerator,
        )
    };

    // remainder == monic_d * Σ terms, coefficient by coefficient
    let mut combined = Vec::new();
    for (numer, denom) in &terms {
        let t = evaluate(&Expr::product([monic_d.clone(), numer.clone(), denom.clone()]), ns);
        combined.extend(expand(&t, None, ns)?.terms().iter().cloned());
    }
    let right = Polynomial::new(&evaluate_sum(combined), x, ns)?;
    let degree = remainder.degree().max(right.degree());
    let equations: Vec<Expr> = (0..=degree)
        .map(|i| Expr::equal(remainder.coefficient(i), right.coefficient(i)))
        .collect();
    let solution = bindings_from_arrows(&solve(&equations, &unknowns, ns)?);

    let mut result: Vec<Expr> = if quotient.is_zero() {
        Vec::new()
    } else {
        quotient.to_expr().terms().to_vec()
    };
    for (numer, denom) in terms {
        let value = evaluate(&numer.substitute(&solution), ns);
        if !value.equals_zero() {
            result.push(Expr::product([value, denom]));
        }
    }
    Ok(Expr::sum(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_power_of_sum() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let expanded = expand(&(x.clone() + 1).pow(3), None, &ns).unwrap();
        let expected = evaluate(
            &Expr::sum([x.pow(3), x.pow(2) * 3, x.clone() * 3, Expr::one()]),
            &ns,
        );
        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_expand_product() {
        let ns = Namespace::standard();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        let f = Expr::product([x.clone() + 1, y.clone() - 1]);
        let expanded = expand(&f, None, &ns).unwrap();
        let expected = evaluate(&Expr::sum([x.clone() * y.clone(), -x, y, Expr::integer(-1)]), &ns);
        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_unchanged_expression() {
        let ns = Namespace::standard();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        let f = x.clone() * y.clone() + 1;
        assert_eq!(expand(&f, None, &ns).unwrap(), f);
        let g = Expr::inverse(x.clone() + 1);
        assert_eq!(expand(&g, Some(&x), &ns).unwrap(), g);
    }

    #[test]
    fn test_partial_fractions() {
        let ns = Namespace::standard();
        let s = Expr::var("s");
        // 1/(s^3 + s) = 1/s - s/(s^2 + 1)
        let f = Expr::inverse(s.pow(3) + s.clone());
        let expanded = expand(&f, Some(&s), &ns).unwrap();
        let expected = Expr::sum([s.pow(-1), -(s.clone() / (s.pow(2) + 1))]);
        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_partial_fractions_repeated_and_scaled() {
        let ns = Namespace::standard();
        let s = Expr::var("s");
        // 2/((2s + 2)*s^2) = 1/s^2 - 1/s + 1/(s + 1)
        let f = Expr::divide(
            Expr::integer(2),
            Expr::product([s.clone() * 2 + 2, s.pow(2)]),
        );
        let expanded = expand(&f, Some(&s), &ns).unwrap();
        let expected = Expr::sum([
            s.pow(-2),
            -s.pow(-1),
            Expr::inverse(s.clone() + 1),
        ]);
        assert_eq!(expanded, expected);
    }

    #[test]
    fn test_improper_fraction() {
        let ns = Namespace::standard();
        let s = Expr::var("s");
        // s^2/((s + 1)*s) = 1 - 1/(s + 1)
        let f = Expr::divide(s.pow(2), Expr::product([s.clone() + 1, s.clone()]));
        let expanded = partial_fractions(&f.numerator(), &f.denominator(), &s, &ns).unwrap();
        let expected = Expr::sum([Expr::one(), -Expr::inverse(s.clone() + 1)]);
        assert_eq!(expanded, expected);
    }
}
