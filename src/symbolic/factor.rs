//! # Factor
//!
//! The inverse of [`expand`](crate::symbolic::expand::expand): pulls common factors out of
//! sums. With a variable given, sums that are polynomials of it are factored as polynomials.
use crate::symbolic::namespace::Namespace;
use crate::symbolic::polynomial::Polynomial;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node};
use log::trace;

/// Factors of `f`. Never fails: what cannot be factored is returned unchanged.
pub fn factor(f: &Expr, x: Option<&Expr>, ns: &Namespace) -> Expr {
    match f.node() {
        Node::Product(factors) => Expr::product(factors.iter().map(|i| factor(i, x, ns)).collect::<Vec<_>>()),
        Node::Binary(BinaryOp::Power, base, exponent) => {
            let factored = factor(base, x, ns);
            Expr::product(
                factored
                    .factors()
                    .iter()
                    .map(|i| Expr::power(i.clone(), exponent.clone()))
                    .collect::<Vec<_>>(),
            )
        }
        Node::Sum(terms) => factor_sum(f, terms, x, ns),
        _ => f.clone(),
    }
}

fn factor_sum(f: &Expr, terms: &[Expr], x: Option<&Expr>, ns: &Namespace) -> Expr {
    if let Some(x) = x {
        match Polynomial::new(f, x, ns) {
            Ok(p) => return p.factor(),
            Err(e) => trace!("factoring {} term by term: {}", f, e),
        }
    }

    let terms: Vec<Expr> = terms.iter().map(|t| factor(t, None, ns)).collect();
    // distinct factors, counted by the number of terms containing them
    let mut candidates: Vec<(Expr, usize)> = Vec::new();
    for t in &terms {
        for i in t.factors() {
            if i.is_constant() || candidates.iter().any(|(c, _)| c == i) {
                continue;
            }
            let count = terms.iter().filter(|j| j.factors().contains(i)).count();
            candidates.push((i.clone(), count));
        }
    }
    let Some((common, count)) = candidates
        .into_iter()
        .fold(None, |best: Option<(Expr, usize)>, (c, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((c, n)),
        })
    else {
        return f.clone();
    };
    if count < 2 {
        return f.clone();
    }

    let (contains, rest): (Vec<Expr>, Vec<Expr>) =
        terms.into_iter().partition(|t| t.factors().contains(&common));
    let quotients: Vec<Expr> = contains
        .iter()
        .map(|t| {
            let mut removed = false;
            Expr::product(
                t.factors()
                    .iter()
                    .filter(|i| {
                        if !removed && **i == common {
                            removed = true;
                            false
                        } else {
                            true
                        }
                    })
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    let pulled = Expr::product([common, Expr::sum(quotients)]);
    let combined = Expr::sum(std::iter::once(pulled).chain(rest).collect::<Vec<_>>());
    if combined.is_sum() {
        factor(&combined, None, ns)
    } else {
        combined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_factor() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = x.pow(2) - x.clone();
        assert_eq!(factor(&f, Some(&x), &ns), Expr::product([x.clone(), x.clone() - 1]));
    }

    #[test]
    fn test_common_factor() {
        let ns = Namespace::standard();
        let (a, b, c) = (Expr::var("a"), Expr::var("b"), Expr::var("c"));
        let f = Expr::sum([a.clone() * b.clone(), a.clone() * c.clone()]);
        assert_eq!(factor(&f, None, &ns), Expr::product([a.clone(), b.clone() + c.clone()]));
        // no factor is shared by two terms
        let g = Expr::sum([a.clone() * b.clone(), c.clone()]);
        assert_eq!(factor(&g, None, &ns), g);
    }

    #[test]
    fn test_common_factor_with_remaining_terms() {
        let ns = Namespace::standard();
        let (a, b, c, d) = (Expr::var("a"), Expr::var("b"), Expr::var("c"), Expr::var("d"));
        // a*b + a*c + d: only the first two terms share a
        let f = Expr::sum([a.clone() * b.clone(), a.clone() * c.clone(), d.clone()]);
        let expected = Expr::sum([Expr::product([a, b + c]), d]);
        assert_eq!(factor(&f, None, &ns), expected);
    }

    #[test]
    fn test_power_distributes_over_factors() {
        let ns = Namespace::standard();
        let (a, b) = (Expr::var("a"), Expr::var("b"));
        let f = Expr::sum([a.clone() * b.clone(), a.clone()]).pow(2);
        assert_eq!(
            factor(&f, None, &ns),
            Expr::product([a.pow(2), (b + 1).pow(2)])
        );
    }
}
