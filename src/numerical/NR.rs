//! # Newton-Raphson
//!
//! Numerical solution of `F(x) = 0` for a system of symbolic expressions.
//!
//! ## Main Structures and Methods
//!
//! - [`NR`] - the solver: the symbolic Jacobian is computed once by `eq_generate` and compiled
//!   together with the residuals to native closures, so an iteration is only numeric work
//! - [`nsolve`] - homotopy continuation around [`NR`], for guesses far from the root
//!
//! ## Interesting Code Features
//!
//! 1. Each step solves `J dx = -F` with nalgebra: LU for square systems, SVD least squares for
//!    the rest.
//! 2. The homotopy `H(x, s) = F(x) - s*F(x0)` has the same Jacobian as `F`, so every stage of the
//!    continuation reuses the compiled Jacobian and only shifts the residuals.
//! 3. A singular or non-finite step and an exhausted iteration budget are reported as
//!    `AlgebraError::Diverged`; a solver never returns an unconverged point.
use crate::Utils::logger::{init_logger, parse_loglevel};
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::real::Real;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_engine_derivatives::jacobian;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use crate::symbolic::symbolic_lambdify::{CompiledFunction, Library, compile};
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::time::Instant;
use tabled::{builder::Builder, settings::Style};

pub const DEFAULT_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_MAX_ITERATIONS: usize = 64;
/// fraction of the way the homotopy parameter moves per stage
const HOMOTOPY_LERP: f64 = 0.9;
const HOMOTOPY_MIN_STEP: f64 = 1e-6;
const SVD_EPS: f64 = 1e-14;

/// Newton-Raphson solver for a system of residuals.
///
/// # Example
/// ```
/// use RustedCAS::numerical::NR::NR;
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// let ns = Namespace::standard();
/// let vars = Expr::symbols("x, y");
/// let (x, y) = (vars[0].clone(), vars[1].clone());
/// // x^2 + y^2 = 10, x - y = 4
/// let eqs = vec![x.pow(2) + y.pow(2) - 10, x - y - 4];
/// let mut solver = NR::new();
/// solver.set_equation_system(eqs, vars, vec![1.0, 1.0], 1e-8, 100).unwrap();
/// solver.set_solver_params(None, None, Some("off".to_string())).unwrap();
/// let solution = solver.solve(&ns).unwrap();
/// assert!((solution[0] - 3.0).abs() < 1e-6 && (solution[1] + 1.0).abs() < 1e-6);
/// ```
pub struct NR {
    pub eq_system: Vec<Expr>,
    pub unknowns: Vec<Expr>,
    pub initial_guess: Vec<f64>,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub loglevel: Option<String>,

    /// rows of compiled partial derivatives
    jacobian: Vec<Vec<CompiledFunction>>,
    residuals: Vec<CompiledFunction>,
    /// subtracted from the residuals, used by the homotopy
    shift: DVector<f64>,

    pub i: usize,                     // iteration counter
    pub jac: DMatrix<f64>,            // last evaluated jacobian
    pub fun_vector: DVector<f64>,     // last evaluated residuals
    pub result: Option<DVector<f64>>, // converged point
    calc_statistics: HashMap<String, usize>,
}

impl Default for NR {
    fn default() -> Self {
        NR::new()
    }
}

impl NR {
    pub fn new() -> NR {
        NR {
            eq_system: Vec::new(),
            unknowns: Vec::new(),
            initial_guess: Vec::new(),
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            loglevel: Some("info".to_string()),
            jacobian: Vec::new(),
            residuals: Vec::new(),
            shift: DVector::zeros(0),
            i: 0,
            jac: DMatrix::zeros(0, 0),
            fun_vector: DVector::zeros(0),
            result: None,
            calc_statistics: HashMap::new(),
        }
    }
    ////////////////////////////SETTERS///////////////////////////////////////////////////////////////////
    /// Sets the residuals `eq_system` (each implicitly `= 0`), the unknowns and the initial guess.
    pub fn set_equation_system(
        &mut self,
        eq_system: Vec<Expr>,
        unknowns: Vec<Expr>,
        initial_guess: Vec<f64>,
        tolerance: f64,
        max_iterations: usize,
    ) -> AlgebraResult<()> {
        if eq_system.is_empty() || unknowns.is_empty() {
            return Err(AlgebraError::InvalidArgument(
                "equation system and unknowns must not be empty".to_string(),
            ));
        }
        if initial_guess.len() != unknowns.len() {
            return Err(AlgebraError::InvalidArgument(format!(
                "initial guess has {} values for {} unknowns",
                initial_guess.len(),
                unknowns.len()
            )));
        }
        if let Some(bad) = unknowns.iter().find(|u| !u.is_variable()) {
            return Err(AlgebraError::InvalidArgument(format!("{} is not a variable", bad)));
        }
        self.eq_system = eq_system;
        self.unknowns = unknowns;
        self.initial_guess = initial_guess;
        self.shift = DVector::zeros(self.eq_system.len());
        self.set_solver_params(Some(tolerance), Some(max_iterations), None)
    }

    /// `None` keeps the current value
    pub fn set_solver_params(
        &mut self,
        tolerance: Option<f64>,
        max_iterations: Option<usize>,
        loglevel: Option<String>,
    ) -> AlgebraResult<()> {
        if let Some(tolerance) = tolerance {
            if !(tolerance >= 0.0) {
                return Err(AlgebraError::InvalidArgument(
                    "tolerance should be a non-negative number".to_string(),
                ));
            }
            self.tolerance = tolerance;
        }
        if let Some(max_iterations) = max_iterations {
            if max_iterations == 0 {
                return Err(AlgebraError::InvalidArgument(
                    "max iterations should be a positive number".to_string(),
                ));
            }
            self.max_iterations = max_iterations;
        }
        if let Some(level) = loglevel {
            parse_loglevel(Some(&level))?;
            self.loglevel = Some(level);
        }
        Ok(())
    }

    /// Computes the symbolic Jacobian and compiles it together with the residuals.
    pub fn eq_generate(&mut self, ns: &Namespace) -> AlgebraResult<()> {
        let symbolic = jacobian(&self.eq_system, &self.unknowns, ns)?;
        let libraries = [Library::standard()];
        self.jacobian = symbolic
            .iter()
            .map(|row| {
                row.iter()
                    .map(|d| compile(d, &self.unknowns, &libraries))
                    .collect::<AlgebraResult<Vec<_>>>()
            })
            .collect::<AlgebraResult<Vec<_>>>()?;
        self.residuals = self
            .eq_system
            .iter()
            .map(|f| compile(&evaluate(f, ns), &self.unknowns, &libraries))
            .collect::<AlgebraResult<Vec<_>>>()?;
        debug!("jacobian {:?}", symbolic);
        Ok(())
    }

    /// residuals `F(x) - shift`
    pub fn residual(&self, x: &DVector<f64>) -> DVector<f64> {
        let xs = x.as_slice();
        DVector::from_iterator(
            self.residuals.len(),
            self.residuals
                .iter()
                .zip(self.shift.iter())
                .map(|(f, s)| f.eval(xs) - s),
        )
    }

    fn set_shift(&mut self, shift: DVector<f64>) {
        self.shift = shift;
    }
    /////////////////////////////////////////////////////////////////////////////////////////////
    //                ITERATIONS
    /////////////////////////////////////////////////////////////////////////////////////////////
    /// evaluates `jac` and `fun_vector` at `x` and returns `Σ F²`
    fn evaluate_at(&mut self, x: &DVector<f64>) -> f64 {
        let xs = x.as_slice();
        let (m, n) = (self.residuals.len(), self.unknowns.len());
        self.jac = DMatrix::from_fn(m, n, |i, j| self.jacobian[i][j].eval(xs));
        self.fun_vector = self.residual(x);
        self.fun_vector.norm_squared()
    }

    fn diverged(&self, residual: f64) -> AlgebraError {
        AlgebraError::Diverged {
            iterations: self.i,
            residual,
        }
    }

    /// Newton step from `x`, using the Jacobian and residuals evaluated at `x`
    pub fn iteration(&mut self, x: &DVector<f64>) -> AlgebraResult<DVector<f64>> {
        let rhs = -&self.fun_vector;
        let dx = if self.jac.is_square() {
            self.jac.clone().lu().solve(&rhs)
        } else {
            self.jac.clone().svd(true, true).solve(&rhs, SVD_EPS).ok()
        };
        match dx {
            Some(dx) if dx.iter().all(|v| v.is_finite()) => Ok(x + dx),
            _ => {
                warn!("singular or non-finite step at iteration {}", self.i);
                Err(self.diverged(self.fun_vector.norm()))
            }
        }
    }

    /// Iterates from `x0` until `Σ F² < tolerance²·N`.
    fn iterate_from(&mut self, x0: DVector<f64>) -> AlgebraResult<DVector<f64>> {
        let epsilon = self.tolerance * self.tolerance * self.unknowns.len() as f64;
        let mut x = x0;
        self.i = 0;
        while self.i < self.max_iterations {
            let error = self.evaluate_at(&x);
            if !error.is_finite() {
                return Err(self.diverged(error));
            }
            if error < epsilon {
                self.result = Some(x.clone());
                return Ok(x);
            }
            x = self.iteration(&x)?;
            self.i += 1;
            debug!("iteration = {}, error = {}", self.i, error.sqrt());
        }
        let error = self.evaluate_at(&x);
        if error < epsilon {
            self.result = Some(x.clone());
            return Ok(x);
        }
        Err(self.diverged(error.sqrt()))
    }

    /// Newton iterations from the initial guess. `eq_generate` must have been called.
    pub fn main_loop(&mut self) -> AlgebraResult<DVector<f64>> {
        if self.residuals.is_empty() {
            return Err(AlgebraError::InvalidArgument(
                "eq_generate must be called before main_loop".to_string(),
            ));
        }
        let x0 = DVector::from_vec(self.initial_guess.clone());
        self.iterate_from(x0)
    }
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    //                                       main functions to start the solver and caclulate statistics
    ////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
    /// `eq_generate` and `main_loop` with logging and statistics
    pub fn solve(&mut self, ns: &Namespace) -> AlgebraResult<DVector<f64>> {
        init_logger(self.loglevel.as_deref())?;
        let begin = Instant::now();
        self.eq_generate(ns)?;
        let symbolic_time = begin.elapsed();
        let res = self.main_loop();
        let total = begin.elapsed();
        info!(
            "symbolic operations {:?}, total {:?}",
            symbolic_time, total
        );
        self.calc_statistics
            .insert("time elapsed, ms".to_string(), total.as_millis() as usize);
        self.calc_statistics();
        res
    }

    pub fn get_result(&self) -> Option<DVector<f64>> {
        self.result.clone()
    }

    fn calc_statistics(&self) {
        let mut stats = self.calc_statistics.clone();
        let (rows, cols) = self.jac.shape();
        stats.insert("number of jacobian elements".to_string(), rows * cols);
        stats.insert("length of y vector".to_string(), self.unknowns.len());
        stats.insert("number of iterations".to_string(), self.i);
        let mut table = Builder::from(stats).build();
        table.with(Style::modern_rounded());
        info!("\n \n CALC STATISTICS \n \n {}", table);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              NSOLVE
////////////////////////////////////////////////////////////////////////////////////////////
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// `l - r` for `l == r`, the expression itself otherwise
fn equal_to_zero(e: &Expr) -> Expr {
    match e.as_equal() {
        Some((l, r)) => Expr::subtract(l.clone(), r.clone()),
        None => e.clone(),
    }
}

/// Solves `equations` numerically. `guesses` are arrows `x -> x0`; the result holds an arrow
/// `x -> value` per unknown.
///
/// Newton's method is run on `H = F - s*F(x0)`, starting at `s = 0`. When it fails, `s` moves
/// toward the last `s` that succeeded, when it succeeds `s` moves toward `0`; the last stage is a
/// solve of `F` itself from the point reached.
pub fn nsolve(
    equations: &[Expr],
    guesses: &[Expr],
    tolerance: f64,
    max_iterations: usize,
    ns: &Namespace,
) -> AlgebraResult<Vec<Expr>> {
    let mut unknowns = Vec::with_capacity(guesses.len());
    let mut x0 = Vec::with_capacity(guesses.len());
    for g in guesses {
        let (x, v) = g
            .as_arrow()
            .ok_or_else(|| AlgebraError::InvalidArgument(format!("{} is not a guess x -> x0", g)))?;
        let value = evaluate(v, ns);
        let value = value
            .as_real()
            .ok_or_else(|| AlgebraError::InvalidArgument(format!("guess {} is not a number", v)))?;
        unknowns.push(x.clone());
        x0.push(value.to_f64());
    }
    let residuals: Vec<Expr> = equations.iter().map(equal_to_zero).collect();

    let mut solver = NR::new();
    solver.set_equation_system(residuals, unknowns.clone(), x0, tolerance, max_iterations)?;
    solver.eq_generate(ns)?;

    let mut x = DVector::from_vec(solver.initial_guess.clone());
    let f0 = solver.residual(&x);
    // last success / current attempt
    let mut s1 = 1.0;
    let mut s0 = 0.0;
    loop {
        solver.set_shift(&f0 * s0);
        match solver.iterate_from(x.clone()) {
            Ok(solution) => {
                debug!("homotopy stage s = {} converged", s0);
                x = solution;
                s1 = s0;
                s0 = lerp(s0, 0.0, HOMOTOPY_LERP);
            }
            Err(AlgebraError::Diverged { .. }) => {
                debug!("homotopy stage s = {} diverged", s0);
                s0 = lerp(s0, s1, HOMOTOPY_LERP);
            }
            Err(e) => return Err(e),
        }
        if s0 <= HOMOTOPY_MIN_STEP || s1 < s0 + HOMOTOPY_MIN_STEP {
            break;
        }
    }
    if s1 != 0.0 {
        solver.set_shift(DVector::zeros(f0.len()));
        x = solver.iterate_from(x)?;
    }
    info!("nsolve converged in {} iterations", solver.i);

    unknowns
        .into_iter()
        .zip(x.iter())
        .map(|(u, v)| {
            let value = Real::from_f64(*v).ok_or_else(|| AlgebraError::Diverged {
                iterations: solver.i,
                residual: f64::NAN,
            })?;
            Ok(Expr::arrow(u, Expr::constant(value)))
        })
        .collect()
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////
//                                     TESTS
////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn value(arrow: &Expr) -> f64 {
        arrow.as_arrow().unwrap().1.as_real().unwrap().to_f64()
    }

    #[test]
    fn test_NR_set_equation_system() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let eqs = vec![x.pow(2) + y.pow(2) - 10, x - y - 4];
        let mut solver = NR::new();
        solver
            .set_equation_system(eqs, vars, vec![1.0, 1.0], 1e-8, 100)
            .unwrap();
        solver.eq_generate(&ns).unwrap();
        let solution = solver.main_loop().unwrap();
        assert_relative_eq!(solution[0], 3.0, epsilon = 1e-6);
        assert_relative_eq!(solution[1], -1.0, epsilon = 1e-6);
        assert_eq!(solver.get_result(), Some(solution));
    }

    #[test]
    fn test_NR_invalid_setup() {
        let vars = Expr::symbols("x, y");
        let mut solver = NR::new();
        let eqs = vec![vars[0].clone()];
        assert!(solver.set_equation_system(eqs.clone(), vars.clone(), vec![1.0], 1e-6, 10).is_err());
        assert!(solver.set_equation_system(eqs, vars, vec![1.0, 1.0], 1e-6, 0).is_err());
        assert!(solver.set_solver_params(Some(-1.0), None, None).is_err());
        assert!(solver.set_solver_params(None, None, Some("loud".to_string())).is_err());
        assert!(matches!(solver.main_loop(), Err(AlgebraError::InvalidArgument(_))));
    }

    #[test]
    fn test_NR_singular_jacobian_diverges() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        // x^2 + 1 has no real root, the step at x = 0 is singular
        let mut solver = NR::new();
        solver
            .set_equation_system(vec![x.pow(2) + 1], vec![x], vec![0.0], 1e-8, 20)
            .unwrap();
        solver.eq_generate(&ns).unwrap();
        assert!(matches!(solver.main_loop(), Err(AlgebraError::Diverged { .. })));
    }

    #[test]
    fn test_NR_overdetermined_least_squares() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        // three consistent equations in two unknowns
        let eqs = vec![x.clone() + y.clone() - 3, x.clone() - y.clone() - 1, x.clone() * 2 - 4];
        let mut solver = NR::new();
        solver
            .set_equation_system(eqs, vars, vec![0.0, 0.0], 1e-9, 20)
            .unwrap();
        solver.eq_generate(&ns).unwrap();
        let solution = solver.main_loop().unwrap();
        assert_relative_eq!(solution[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(solution[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_nsolve_fixed_point_of_cos() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let eq = Expr::equal(x.clone(), ns.call("Cos", vec![x.clone()]).unwrap());
        let guess = Expr::arrow(x.clone(), Expr::ratio(1, 2).unwrap());
        let result = nsolve(&[eq], &[guess], DEFAULT_TOLERANCE, DEFAULT_MAX_ITERATIONS, &ns).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].as_arrow().unwrap().0, &x);
        assert_relative_eq!(value(&result[0]), 0.739085, epsilon = 1e-3);
    }

    #[test]
    fn test_nsolve_far_guess_uses_continuation() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        // ArcTan has a tiny slope far from the root; plain Newton from 5 overshoots
        let f = ns.call("ArcTan", vec![x.clone() - 1]).unwrap();
        let guess = Expr::arrow(x.clone(), Expr::integer(5));
        let result = nsolve(&[f], &[guess], 1e-10, 20, &ns).unwrap();
        assert_relative_eq!(value(&result[0]), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nsolve_rejects_symbolic_guess() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let guess = Expr::arrow(x.clone(), Expr::var("a"));
        assert!(matches!(
            nsolve(&[x.clone()], &[guess], 1e-6, 10, &ns),
            Err(AlgebraError::InvalidArgument(_))
        ));
        assert!(nsolve(&[x.clone()], &[x], 1e-6, 10, &ns).is_err());
    }
}
