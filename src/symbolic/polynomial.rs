//! # Polynomial
//!
//! Polynomials of one variable with symbolic coefficients.
//!
//! ## Main Structures and Methods
//!
//! - [`Polynomial::new`] - decomposes a sum into `c*x^n` terms, where `c` does not depend on
//!   `x` and `n` is an integer
//! - [`Polynomial::coefficient`], [`Polynomial::degree`], [`Polynomial::to_expr`]
//! - [`Polynomial::factor`] - pulls out powers of `x`
//! - [`Polynomial::long_division`] - quotient and remainder
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    /// degree -> coefficient, zero coefficients are not stored
    coefficients: BTreeMap<i64, Expr>,
    variable: Expr,
}

impl Polynomial {
    /// Polynomial of `x` described by `f`. Fails with `InvalidArgument` when a term of `f`
    /// is not of the form `c*x^n`.
    pub fn new(f: &Expr, x: &Expr, ns: &Namespace) -> AlgebraResult<Polynomial> {
        let independent = {
            let x = x.clone();
            Expr::pattern("_c", move |e| !e.depends_on(&x))
        };
        let integral = Expr::pattern("_n", |e| e.as_real().is_some_and(|r| r.is_integer()));
        let term = Expr::product([independent.clone(), Expr::power(x.clone(), integral.clone())]);
        let fixed = [Expr::arrow(x.clone(), x.clone())];

        let mut sums: BTreeMap<i64, Vec<Expr>> = BTreeMap::new();
        for t in f.terms() {
            let matched = term.match_with(t, &fixed, ns)?.ok_or_else(|| {
                AlgebraError::InvalidArgument(format!("{} is not a polynomial of {}", f, x))
            })?;
            let n = matched
                .get(&integral)
                .and_then(|n| n.as_real())
                .and_then(|r| r.to_i64())
                .ok_or_else(|| AlgebraError::InvalidArgument(format!("degree of {} is too large", t)))?;
            let c = matched.get(&independent).cloned().unwrap_or_else(Expr::one);
            sums.entry(n).or_default().push(c);
        }
        let coefficients = sums
            .into_iter()
            .map(|(n, cs)| (n, evaluate(&Expr::sum(cs), ns)))
            .collect();
        Ok(Polynomial::from_coefficients(coefficients, x.clone()))
    }

    pub fn from_coefficients(coefficients: BTreeMap<i64, Expr>, variable: Expr) -> Polynomial {
        Polynomial {
            coefficients: coefficients
                .into_iter()
                .filter(|(_, c)| !c.equals_zero())
                .collect(),
            variable,
        }
    }

    pub fn variable(&self) -> &Expr {
        &self.variable
    }

    /// coefficient of `x^d`, `0` if there is no such term
    pub fn coefficient(&self, d: i64) -> Expr {
        self.coefficients.get(&d).cloned().unwrap_or_else(Expr::zero)
    }

    pub fn coefficients(&self) -> impl Iterator<Item = (i64, &Expr)> {
        self.coefficients.iter().map(|(d, c)| (*d, c))
    }

    /// largest degree with a non-zero coefficient, `0` for the zero polynomial
    pub fn degree(&self) -> i64 {
        self.coefficients.keys().next_back().copied().unwrap_or(0).max(0)
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn to_expr(&self) -> Expr {
        Expr::sum(self.coefficients.iter().map(|(d, c)| match d {
            0 => c.clone(),
            1 => Expr::product([c.clone(), self.variable.clone()]),
            _ => Expr::product([
                c.clone(),
                Expr::power(self.variable.clone(), Expr::integer(*d)),
            ]),
        }))
    }

    /// `x^k*P(x)` where `P(0) != 0`. Other factors are not searched for.
    pub fn factor(&self) -> Expr {
        let Some(lowest) = self.coefficients.keys().next().copied() else {
            return Expr::zero();
        };
        if lowest <= 0 {
            return self.to_expr();
        }
        let shifted = Polynomial {
            coefficients: self
                .coefficients
                .iter()
                .map(|(d, c)| (d - lowest, c.clone()))
                .collect(),
            variable: self.variable.clone(),
        };
        let power = if lowest == 1 {
            self.variable.clone()
        } else {
            Expr::power(self.variable.clone(), Expr::integer(lowest))
        };
        Expr::product([power, shifted.to_expr()])
    }

    /// `(q, r)` with `n = q*d + r` and `degree(r) < degree(d)`
    pub fn long_division(
        n: &Polynomial,
        d: &Polynomial,
        ns: &Namespace,
    ) -> AlgebraResult<(Polynomial, Polynomial)> {
        if n.variable != d.variable {
            return Err(AlgebraError::InvalidArgument(format!(
                "dividing polynomials of {} and {}",
                n.variable, d.variable
            )));
        }
        if d.is_zero() {
            return Err(AlgebraError::InvalidArgument("division by the zero polynomial".to_string()));
        }
        let dd = d.degree();
        let lead = d.coefficient(dd);
        let mut q: BTreeMap<i64, Expr> = BTreeMap::new();
        let mut r = n.coefficients.clone();
        while let Some((&rd, rc)) = r.iter().next_back() {
            if rd < dd {
                break;
            }
            let t = evaluate(&Expr::divide(rc.clone(), lead.clone()), ns);
            let td = rd - dd;
            for (i, di) in d.coefficients.iter() {
                let entry = r.entry(i + td).or_insert_with(Expr::zero);
                *entry = evaluate(&Expr::subtract(entry.clone(), Expr::product([di.clone(), t.clone()])), ns);
            }
            // the leading term cancels exactly even when the evaluated coefficient does not
            r.remove(&rd);
            r.retain(|_, c| !c.equals_zero());
            q.insert(td, t);
        }
        Ok((
            Polynomial::from_coefficients(q, n.variable.clone()),
            Polynomial::from_coefficients(r, n.variable.clone()),
        ))
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.to_expr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coefficients() {
        let ns = Namespace::standard();
        let (x, a) = (Expr::var("x"), Expr::var("a"));
        let f = Expr::sum([x.pow(3) * 2, a.clone() * x.clone(), x.clone(), Expr::integer(5)]);
        let p = Polynomial::new(&f, &x, &ns).unwrap();
        assert_eq!(p.degree(), 3);
        assert_eq!(p.coefficient(3), Expr::integer(2));
        assert_eq!(p.coefficient(2), Expr::zero());
        assert_eq!(p.coefficient(1), evaluate(&(a + 1), &ns));
        assert_eq!(p.coefficient(0), Expr::integer(5));
    }

    #[test]
    fn test_not_a_polynomial() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = x.clone() + ns.call("Sin", vec![x.clone()]).unwrap();
        assert!(matches!(
            Polynomial::new(&f, &x, &ns),
            Err(AlgebraError::InvalidArgument(_))
        ));
        let g = x.pow(Expr::ratio(1, 2).unwrap());
        assert!(Polynomial::new(&g, &x, &ns).is_err());
    }

    #[test]
    fn test_factor_pulls_out_powers() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = Expr::sum([x.pow(3), x.pow(2) * 2]);
        let p = Polynomial::new(&f, &x, &ns).unwrap();
        assert_eq!(p.factor(), Expr::product([x.pow(2), x.clone() + 2]));
    }

    #[test]
    fn test_long_division() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        // (x^3 - 1) / (x - 1) = x^2 + x + 1
        let n = Polynomial::new(&(x.pow(3) - 1), &x, &ns).unwrap();
        let d = Polynomial::new(&(x.clone() - 1), &x, &ns).unwrap();
        let (q, r) = Polynomial::long_division(&n, &d, &ns).unwrap();
        assert!(r.is_zero());
        assert_eq!(q.to_expr(), Expr::sum([x.pow(2), x.clone(), Expr::one()]));

        // (x^2 + 1) / (x + 1) = x - 1 remainder 2
        let n = Polynomial::new(&(x.pow(2) + 1), &x, &ns).unwrap();
        let d = Polynomial::new(&(x.clone() + 1), &x, &ns).unwrap();
        let (q, r) = Polynomial::long_division(&n, &d, &ns).unwrap();
        assert_eq!(q.to_expr(), x - 1);
        assert_eq!(r.to_expr(), Expr::integer(2));
    }
}
