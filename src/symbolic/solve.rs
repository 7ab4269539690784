//! # Solve
//!
//! Symbolic solution of systems of linear equations by Gaussian elimination over
//! [`LinearCombination`] rows.
//!
//! ## Main Methods
//! - [`solve`] - row reduction, back substitution, then each unknown solved from its row
//! - [`partial_solve`] - the same without back substitution; solutions of earlier unknowns may
//!   still contain later ones
//! - [`in_terms_of`], [`row_reduce`], [`back_substitute`] - the individual steps
//!
//! Pivots are chosen among the rows whose first non-zero unknown is the current one,
//! preferring the largest constant coefficient. A row whose coefficients depend on the
//! unknowns is only chosen when there is nothing better.
use crate::symbolic::linear_combination::LinearCombination;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::AlgebraResult;
use log::debug;

/// rows `l - r` of the equations `l == r`; an expression that is not an equation is taken as `e == 0`
pub fn in_terms_of(
    equations: &[Expr],
    unknowns: &[Expr],
    ns: &Namespace,
) -> AlgebraResult<Vec<LinearCombination>> {
    equations
        .iter()
        .map(|eq| {
            let e = match eq.as_equal() {
                Some((l, r)) => Expr::subtract(l.clone(), r.clone()),
                None => eq.clone(),
            };
            LinearCombination::from_expr(unknowns, &e, ns)
        })
        .collect()
}

/// index of the best pivot row for `x`
pub fn find_pivot(system: &[LinearCombination], x: &Expr) -> Option<usize> {
    let score = |row: &LinearCombination| -> f64 {
        match row.pivot() {
            Some((_, c)) if row.is_linear() => c.as_real().map_or(-1.0, |r| r.abs().to_f64()),
            _ => -1.0,
        }
    };
    let mut best: Option<(usize, f64)> = None;
    for (i, row) in system.iter().enumerate() {
        if row.pivot_variable() != Some(x) {
            continue;
        }
        let s = score(row);
        if best.is_none_or(|(_, b)| s > b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}

/// row-echelon form of `system` in the unknowns, in place
pub fn row_reduce(system: &mut [LinearCombination], unknowns: &[Expr], ns: &Namespace) {
    for x in unknowns {
        let Some(p) = find_pivot(system, x) else {
            continue;
        };
        let pivot_row = system[p].clone();
        let scale = Expr::negate(pivot_row.coefficient(x));
        for (i, row) in system.iter_mut().enumerate() {
            if i == p || row.pivot_variable() != Some(x) {
                continue;
            }
            let m = Expr::divide(row.coefficient(x), scale.clone());
            row.add_scaled(&m, &pivot_row, ns);
            // the eliminated coefficient may not evaluate to an exact zero
            row.set_coefficient(x, Expr::zero());
        }
    }
}

/// eliminates every pivot variable from the rows other than its own
pub fn back_substitute(system: &mut [LinearCombination], unknowns: &[Expr], ns: &Namespace) {
    for p in 0..system.len() {
        let Some(pivot) = system[p].pivot_variable().cloned() else {
            continue;
        };
        if !unknowns.contains(&pivot) {
            continue;
        }
        let pivot_row = system[p].clone();
        let scale = Expr::negate(pivot_row.coefficient(&pivot));
        for (i, row) in system.iter_mut().enumerate() {
            let c = row.coefficient(&pivot);
            if i == p || c.equals_zero() {
                continue;
            }
            row.add_scaled(&Expr::divide(c, scale.clone()), &pivot_row, ns);
        }
    }
}

/// `x -> value` arrows, solved in reverse order of the unknowns
fn solve_rows(system: &[LinearCombination], unknowns: &[Expr], ns: &Namespace) -> Vec<Expr> {
    let mut result = Vec::with_capacity(unknowns.len());
    for x in unknowns.iter().rev() {
        let row = find_pivot(system, x)
            .or_else(|| system.iter().position(|r| !r.coefficient(x).equals_zero()));
        match row {
            Some(i) => result.push(Expr::arrow(x.clone(), system[i].solve_for(x, ns))),
            None => debug!("no equation determines {}", x),
        }
    }
    result
}

/// Solves the linear system for `unknowns`. Returns `x -> value` arrows; unknowns that no
/// equation determines are left out.
pub fn solve(equations: &[Expr], unknowns: &[Expr], ns: &Namespace) -> AlgebraResult<Vec<Expr>> {
    let mut system = in_terms_of(equations, unknowns, ns)?;
    row_reduce(&mut system, unknowns, ns);
    back_substitute(&mut system, unknowns, ns);
    Ok(solve_rows(&system, unknowns, ns))
}

/// [`solve`] without back substitution
pub fn partial_solve(
    equations: &[Expr],
    unknowns: &[Expr],
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let mut system = in_terms_of(equations, unknowns, ns)?;
    row_reduce(&mut system, unknowns, ns);
    Ok(solve_rows(&system, unknowns, ns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::evaluate::evaluate;
    use crate::symbolic::substitution::bindings_from_arrows;

    #[test]
    fn test_solve_single_equation() {
        let ns = Namespace::standard();
        let (x, y, a, b) = (Expr::var("x"), Expr::var("y"), Expr::var("A"), Expr::var("B"));
        let eq = Expr::equal(y.clone(), a.clone() * x.clone() + b.clone());
        let result = solve(&[eq], &[x.clone()], &ns).unwrap();
        assert_eq!(result.len(), 1);
        let expected = evaluate(&((y - b) / a), &ns);
        assert_eq!(result[0], Expr::arrow(x, expected));
    }

    #[test]
    fn test_solve_system() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let equations = vec![
            Expr::equal(x.clone() + y.clone(), Expr::integer(3)),
            Expr::equal(x.clone() - y.clone(), Expr::one()),
        ];
        let result = bindings_from_arrows(&solve(&equations, &vars, &ns).unwrap());
        assert_eq!(result.get(&x), Some(&Expr::integer(2)));
        assert_eq!(result.get(&y), Some(&Expr::one()));
    }

    #[test]
    fn test_solution_satisfies_equations() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y, z");
        let (x, y, z) = (vars[0].clone(), vars[1].clone(), vars[2].clone());
        let k = Expr::var("k");
        let equations = vec![
            Expr::equal(x.clone() * 2 + y.clone() - z.clone(), k.clone()),
            Expr::equal(x.clone() - y.clone() * 3 + z.clone() * 2, Expr::integer(4)),
            Expr::equal(x.clone() + y.clone() + z.clone(), Expr::zero()),
        ];
        let result = bindings_from_arrows(&solve(&equations, &vars, &ns).unwrap());
        assert_eq!(result.len(), 3);
        for eq in &equations {
            let (l, r) = eq.as_equal().unwrap();
            let residual = evaluate(&Expr::subtract(l.substitute(&result), r.clone()), &ns);
            let residual = crate::symbolic::expand::expand(&residual, None, &ns).unwrap();
            assert_eq!(evaluate(&residual, &ns), Expr::zero());
        }
    }

    #[test]
    fn test_partial_solve_leaves_later_unknowns() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let equations = vec![
            Expr::equal(x.clone() + y.clone(), Expr::integer(3)),
            Expr::equal(y.clone(), Expr::one()),
        ];
        let result = bindings_from_arrows(&partial_solve(&equations, &vars, &ns).unwrap());
        assert_eq!(result.get(&y), Some(&Expr::one()));
        assert!(result.get(&x).unwrap().depends_on(&y));
    }

    #[test]
    fn test_underdetermined_system() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let equations = vec![Expr::equal(vars[0].clone(), Expr::integer(5))];
        let result = solve(&equations, &vars, &ns).unwrap();
        assert_eq!(result, vec![Expr::arrow(vars[0].clone(), Expr::integer(5))]);
    }
}
