//! # Linear combinations
//!
//! An expression written as `A_1*b_1 + ... + A_n*b_n + A_0` for a basis of unknowns `b_i`.
//! This is the row type of the linear solver: every equation `l == r` becomes the linear
//! combination of `l - r` in the unknowns.
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::expand::expand;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::AlgebraResult;
use crate::symbolic::symbolic_visitors::depends_on_any;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct LinearCombination {
    /// `(basis, coefficient)`, the last entry is the constant basis `1`
    terms: Vec<(Expr, Expr)>,
}

impl LinearCombination {
    /// all coefficients zero
    pub fn new(basis: &[Expr]) -> LinearCombination {
        let mut terms: Vec<(Expr, Expr)> = basis.iter().map(|b| (b.clone(), Expr::zero())).collect();
        terms.push((Expr::one(), Expr::zero()));
        LinearCombination { terms }
    }

    /// Coefficients of the expanded `e`. A term goes to the first basis element `b` for which
    /// `term/b` no longer depends on the basis, or to the constant part otherwise.
    pub fn from_expr(basis: &[Expr], e: &Expr, ns: &Namespace) -> AlgebraResult<LinearCombination> {
        let mut lc = LinearCombination::new(basis);
        let expanded = expand(e, None, ns)?;
        for t in expanded.terms() {
            lc.add_term(basis, t, ns);
        }
        Ok(lc)
    }

    fn add_term(&mut self, basis: &[Expr], t: &Expr, ns: &Namespace) {
        if depends_on_any(t, basis) {
            for b in basis {
                let tb = evaluate(&Expr::divide(t.clone(), b.clone()), ns);
                if !depends_on_any(&tb, basis) {
                    let updated = Expr::sum([self.coefficient(b), tb]);
                    self.set_coefficient(b, evaluate(&updated, ns));
                    return;
                }
            }
        }
        let one = Expr::one();
        let updated = Expr::sum([self.coefficient(&one), t.clone()]);
        self.set_coefficient(&one, evaluate(&updated, ns));
    }

    /// basis elements including the constant `1`
    pub fn basis(&self) -> impl Iterator<Item = &Expr> {
        self.terms.iter().map(|(b, _)| b)
    }

    pub fn coefficient(&self, b: &Expr) -> Expr {
        self.terms
            .iter()
            .find(|(i, _)| i == b)
            .map(|(_, a)| a.clone())
            .unwrap_or_else(Expr::zero)
    }

    /// sets the coefficient of `b`, ignored when `b` is not in the basis
    pub fn set_coefficient(&mut self, b: &Expr, value: Expr) {
        if let Some(term) = self.terms.iter_mut().find(|(i, _)| i == b) {
            term.1 = value;
        }
    }

    pub fn to_expr(&self) -> Expr {
        Expr::sum(
            self.terms
                .iter()
                .filter(|(_, a)| !a.equals_zero())
                .map(|(b, a)| Expr::product([a.clone(), b.clone()]))
                .collect::<Vec<_>>(),
        )
    }

    /// the first non-constant basis element with a non-zero coefficient, with its coefficient
    pub fn pivot(&self) -> Option<(&Expr, &Expr)> {
        self.terms
            .iter()
            .find(|(b, a)| !a.equals_zero() && !b.equals_one())
            .map(|(b, a)| (b, a))
    }

    pub fn pivot_variable(&self) -> Option<&Expr> {
        self.pivot().map(|(b, _)| b)
    }

    /// `true` when every coefficient is free of its own basis element
    pub fn is_linear(&self) -> bool {
        self.terms.iter().all(|(b, a)| !a.depends_on(b))
    }

    /// the value of `v` that makes this combination zero
    pub fn solve_for(&self, v: &Expr, ns: &Namespace) -> Expr {
        let rest = Expr::sum(
            self.terms
                .iter()
                .filter(|(b, a)| b != v && !a.equals_zero())
                .map(|(b, a)| Expr::product([a.clone(), b.clone()]))
                .collect::<Vec<_>>(),
        );
        evaluate(&Expr::divide(rest, Expr::negate(self.coefficient(v))), ns)
    }

    pub fn scale(&mut self, r: &Expr, ns: &Namespace) {
        for (_, a) in self.terms.iter_mut() {
            *a = evaluate(&Expr::product([a.clone(), r.clone()]), ns);
        }
    }

    /// `self += m*other`
    pub fn add_scaled(&mut self, m: &Expr, other: &LinearCombination, ns: &Namespace) {
        for (b, a) in self.terms.iter_mut() {
            let scaled = Expr::product([other.coefficient(b), m.clone()]);
            *a = evaluate(&Expr::sum([a.clone(), scaled]), ns);
        }
    }
}

impl fmt::Display for LinearCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_expr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposition() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y, a) = (vars[0].clone(), vars[1].clone(), Expr::var("a"));
        // 2*(x + a*y) + 3 - a
        let e = Expr::sum([
            Expr::product([Expr::integer(2), x.clone() + a.clone() * y.clone()]),
            Expr::integer(3),
            -a.clone(),
        ]);
        let lc = LinearCombination::from_expr(&vars, &e, &ns).unwrap();
        assert_eq!(lc.coefficient(&x), Expr::integer(2));
        assert_eq!(lc.coefficient(&y), evaluate(&(a.clone() * 2), &ns));
        assert_eq!(lc.coefficient(&Expr::one()), evaluate(&(Expr::integer(3) - a), &ns));
        assert_eq!(lc.pivot_variable(), Some(&x));
        assert!(lc.is_linear());
    }

    #[test]
    fn test_add_scaled_and_solve() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let mut r1 = LinearCombination::from_expr(&vars, &(x.clone() + y.clone() - 3), &ns).unwrap();
        let r2 = LinearCombination::from_expr(&vars, &(x.clone() - y.clone() - 1), &ns).unwrap();
        r1.add_scaled(&Expr::integer(-1), &r2, &ns);
        // (x + y - 3) - (x - y - 1) = 2y - 2
        assert_eq!(r1.coefficient(&x), Expr::zero());
        assert_eq!(r1.pivot_variable(), Some(&y));
        assert_eq!(r1.solve_for(&y, &ns), Expr::one());
    }

    #[test]
    fn test_nonlinear_term_goes_to_constant() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x");
        let x = vars[0].clone();
        let lc = LinearCombination::from_expr(&vars, &(x.pow(2) + x.clone()), &ns).unwrap();
        // x^2/x = x still depends on x
        assert_eq!(lc.coefficient(&x), Expr::one());
        assert_eq!(lc.coefficient(&Expr::one()), x.pow(2));
    }
}
