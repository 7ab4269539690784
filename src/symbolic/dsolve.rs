//! # Differential equations
//!
//! ## Main Methods
//!
//! - [`dsolve`] - linear systems of ordinary differential equations with initial conditions,
//!   solved through the Laplace transform: transform, substitute the initial conditions, solve
//!   the algebraic system for `L[y]`, transform back
//! - [`nd_integrate`] - one step of a numerical integration method written as expressions:
//!   the value of `y` at `t0 + h` in terms of its value at `t0`
//! - [`nd_solve`], [`nd_partial_solve`] - the discretized step of a system `f(y, y', t) = 0`,
//!   solved for `y`
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::laplace::{inverse_laplace_transform, laplace_transform};
use crate::symbolic::namespace::Namespace;
use crate::symbolic::solve::{partial_solve, solve};
use crate::symbolic::substitution::bindings_from_arrows;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use crate::symbolic::symbolic_visitors::depends_on_any;
use log::{debug, info};
use strum_macros::{Display, EnumIter, EnumString};

/// Numerical integration schemes for [`nd_integrate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
pub enum IntegrationMethod {
    /// `y[t] = y[t0] + h*f[t0, y[t0]]`
    Euler,
    /// `y[t] = y[t0] + h*f[t, y[t]]`
    BackwardEuler,
    /// `y[t] = y[t0] + (h/2)*(f[t0, y[t0]] + f[t, y[t]])`
    Trapezoid,
}

/// the transform variable used by [`dsolve`]
fn transform_variable() -> Expr {
    Expr::var("_s")
}

fn sides(e: &Expr) -> (Expr, Expr) {
    match e.as_equal() {
        Some((l, r)) => (l.clone(), r.clone()),
        None => (e.clone(), Expr::zero()),
    }
}

/// Solves the linear differential `equations` for the `functions` of `t` (e.g. `y[t]`).
/// `initial_conditions` are arrows such as `y[0] -> 1`. Returns `y[t] -> solution` arrows.
///
/// Fails with `Unimplemented` when an inverse transform is not known.
pub fn dsolve(
    equations: &[Expr],
    functions: &[Expr],
    initial_conditions: &[Expr],
    t: &Expr,
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let s = transform_variable();
    let y0 = bindings_from_arrows(initial_conditions);

    let mut transformed = Vec::with_capacity(equations.len());
    for eq in equations {
        let (l, r) = sides(eq);
        let tl = laplace_transform(&l, t, &s, ns)?;
        let tr = laplace_transform(&r, t, &s, ns)?;
        transformed.push(Expr::equal(
            evaluate(&tl.substitute(&y0), ns),
            evaluate(&tr.substitute(&y0), ns),
        ));
    }
    debug!("transformed system {:?}", transformed);

    let unknowns = functions
        .iter()
        .map(|y| ns.call("L", vec![y.clone(), t.clone(), s.clone()]))
        .collect::<AlgebraResult<Vec<_>>>()?;
    let solved = solve(&transformed, &unknowns, ns)?;

    let mut result = Vec::with_capacity(solved.len());
    for arrow in &solved {
        let Some((l, r)) = arrow.as_arrow() else {
            continue;
        };
        let y = inverse_laplace_transform(l, &s, t, ns)?;
        let value = inverse_laplace_transform(r, &s, t, ns)?;
        if value.depends_on(&s) || y.depends_on(&s) {
            return Err(AlgebraError::Unimplemented(format!(
                "inverse Laplace transform of {}",
                r
            )));
        }
        result.push(Expr::arrow(y, value));
    }
    info!("dsolve found {} of {} functions", result.len(), functions.len());
    Ok(result)
}

/// the function `y` of a derivative `D[y, t]`
fn derivative_of(e: &Expr) -> AlgebraResult<&Expr> {
    match e.as_call() {
        Some((_, args)) if e.call_name() == Some("D") && !args.is_empty() => Ok(&args[0]),
        _ => Err(AlgebraError::InvalidArgument(format!(
            "{} is not a derivative",
            e
        ))),
    }
}

/// Discretizes `dy_dt`, arrows `D[y, t] -> f`, over one step from `t0` to `t = t0 + h`.
/// Returns arrows `y -> update`, implicit in `y` for the implicit methods.
pub fn nd_integrate(
    dy_dt: &[Expr],
    t: &Expr,
    t0: &Expr,
    h: &Expr,
    method: IntegrationMethod,
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let at_t0 = |e: &Expr| evaluate(&e.substitute_one(t, t0), ns);
    dy_dt
        .iter()
        .map(|i| {
            let (d, f) = i.as_arrow().ok_or_else(|| {
                AlgebraError::InvalidArgument(format!("{} is not an arrow D[y, t] -> f", i))
            })?;
            let y = derivative_of(d)?;
            let previous = at_t0(y);
            let step = match method {
                IntegrationMethod::Euler => Expr::product([h.clone(), at_t0(f)]),
                IntegrationMethod::BackwardEuler => Expr::product([h.clone(), f.clone()]),
                IntegrationMethod::Trapezoid => Expr::product([
                    Expr::divide(h.clone(), Expr::integer(2)),
                    Expr::sum([at_t0(f), f.clone()]),
                ]),
            };
            Ok(Expr::arrow(y.clone(), evaluate(&Expr::sum([previous, step]), ns)))
        })
        .collect()
}

/// `D[y, t] -> f` solved from `equations`, rejecting right hand sides that still contain a
/// derivative
fn derivatives(
    equations: &[Expr],
    functions: &[Expr],
    t: &Expr,
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let dy = functions
        .iter()
        .map(|y| ns.call("D", vec![y.clone(), t.clone()]))
        .collect::<AlgebraResult<Vec<_>>>()?;
    let dy_dt = solve(equations, &dy, ns)?;
    if dy_dt.len() < dy.len()
        || dy_dt
            .iter()
            .filter_map(|a| a.as_arrow())
            .any(|(_, f)| depends_on_any(f, &dy))
    {
        return Err(AlgebraError::InvalidArgument(
            "differential equation is singular or not linear".to_string(),
        ));
    }
    Ok(dy_dt)
}

fn discretized_step(
    equations: &[Expr],
    functions: &[Expr],
    t: &Expr,
    t0: &Expr,
    h: &Expr,
    method: IntegrationMethod,
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let dy_dt = derivatives(equations, functions, t, ns)?;
    Ok(nd_integrate(&dy_dt, t, t0, h, method, ns)?
        .iter()
        .filter_map(|a| a.as_arrow())
        .map(|(l, r)| Expr::equal(l.clone(), r.clone()))
        .collect())
}

/// `y -> value at t0 + h` in terms of the values at `t0`
pub fn nd_solve(
    equations: &[Expr],
    functions: &[Expr],
    t: &Expr,
    t0: &Expr,
    h: &Expr,
    method: IntegrationMethod,
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let step = discretized_step(equations, functions, t, t0, h, method, ns)?;
    solve(&step, functions, ns)
}

/// [`nd_solve`] with the step solved by [`partial_solve`]
pub fn nd_partial_solve(
    equations: &[Expr],
    functions: &[Expr],
    t: &Expr,
    t0: &Expr,
    h: &Expr,
    method: IntegrationMethod,
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let step = discretized_step(equations, functions, t, t0, h, method, ns)?;
    partial_solve(&step, functions, ns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::match_context::Bindings;
    use strum::IntoEnumIterator;

    fn setup() -> (Namespace, Expr, Expr) {
        let t = Expr::var("t");
        let y = Expr::undefined("y", vec![t.clone()]);
        (Namespace::standard(), t, y)
    }

    #[test]
    fn test_exponential_decay() {
        let (ns, t, y) = setup();
        // y' = -y, y(0) = 1
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        let eq = Expr::equal(dy, -y.clone());
        let y0 = Expr::arrow(Expr::undefined("y", vec![Expr::zero()]), Expr::one());
        let result = dsolve(&[eq], &[y.clone()], &[y0], &t, &ns).unwrap();
        let exp = ns.call("Exp", vec![-t.clone()]).unwrap();
        assert_eq!(result, vec![Expr::arrow(y, exp)]);
    }

    #[test]
    fn test_constant_rate() {
        let (ns, t, y) = setup();
        // y' = 3, y(0) = 2
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        let eq = Expr::equal(dy, Expr::integer(3));
        let y0 = Expr::arrow(Expr::undefined("y", vec![Expr::zero()]), Expr::integer(2));
        let result = dsolve(&[eq], &[y.clone()], &[y0], &t, &ns).unwrap();
        assert_eq!(result, vec![Expr::arrow(y, evaluate(&(t * 3 + 2), &ns))]);
    }

    /// value of the step for y' = -y at h = 1/10 and y(t0) = 2
    fn decay_step(method: IntegrationMethod) -> Expr {
        let (ns, t, y) = setup();
        let (t0, h) = (Expr::var("t0"), Expr::var("h"));
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        let eq = Expr::equal(dy, -y.clone());
        let result = nd_solve(&[eq], &[y.clone()], &t, &t0, &h, method, &ns).unwrap();
        assert_eq!(result.len(), 1);
        let (l, value) = result[0].as_arrow().unwrap();
        assert_eq!(l, &y);
        let bindings: Bindings = [
            (h, Expr::ratio(1, 10).unwrap()),
            (Expr::undefined("y", vec![t0]), Expr::integer(2)),
        ]
        .into_iter()
        .collect();
        evaluate(&value.substitute(&bindings), &ns)
    }

    #[test]
    fn test_integration_methods() {
        assert_eq!(decay_step(IntegrationMethod::Euler), Expr::ratio(9, 5).unwrap());
        assert_eq!(decay_step(IntegrationMethod::BackwardEuler), Expr::ratio(20, 11).unwrap());
        assert_eq!(decay_step(IntegrationMethod::Trapezoid), Expr::ratio(38, 21).unwrap());
    }

    #[test]
    fn test_nd_integrate_euler_is_explicit() {
        let (ns, t, y) = setup();
        let (t0, h) = (Expr::var("t0"), Expr::var("h"));
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        let arrows = [Expr::arrow(dy, t.clone())];
        let step = nd_integrate(&arrows, &t, &t0, &h, IntegrationMethod::Euler, &ns).unwrap();
        let (_, update) = step[0].as_arrow().unwrap();
        assert!(!update.depends_on(&t));
        let implicit = nd_integrate(&arrows, &t, &t0, &h, IntegrationMethod::BackwardEuler, &ns).unwrap();
        assert!(implicit[0].as_arrow().unwrap().1.depends_on(&t));
    }

    #[test]
    fn test_nonlinear_in_derivative_is_rejected() {
        let (ns, t, y) = setup();
        let dy = ns.call("D", vec![y.clone(), t.clone()]).unwrap();
        // y'^2 = y cannot be solved linearly for y'
        let eq = Expr::equal(dy.pow(2), y.clone());
        for method in IntegrationMethod::iter() {
            assert!(nd_solve(&[eq.clone()], &[y.clone()], &t, &Expr::var("t0"), &Expr::var("h"), method, &ns).is_err());
        }
    }

    #[test]
    fn test_method_names() {
        assert_eq!(IntegrationMethod::BackwardEuler.to_string(), "BackwardEuler");
        assert_eq!("Trapezoid".parse::<IntegrationMethod>(), Ok(IntegrationMethod::Trapezoid));
    }
}
