//! # Native code compiler
//!
//! Turns an expression into a tree of composed closures over a slice of `f64` argument slots.
//! The compiled function is evaluated many times (Newton iterations, quadrature, sampling),
//! so everything that can be decided once is decided at compile time: constants are folded,
//! function calls are resolved and powers with small constant exponents get their own closures.
//!
//! ## Main Structures and Methods
//!
//! - [`Library`] - native `f64` routines addressed by `(name, arity)`; [`Library::standard`]
//!   holds the standard math functions
//! - [`CompiledFunction`] - the result, `eval(&[f64]) -> f64`
//! - [`compile`] - compiles an expression; the position of a variable in `variables` is its slot
//! - [`compile_function`] - compiles a function with its own parameters as slots
//!
//! ## Interesting Code Features
//!
//! 1. Calls are resolved in order: a library routine, `If` as a select that only evaluates the
//!    taken branch, a lookup table as interpolation, and finally the body of a user function
//!    compiled with its parameters bound to the compiled arguments (inlining).
//! 2. Relations and logical operators compile to `1.0` / `0.0`.
use crate::symbolic::evaluate::APPROX_EQUAL_TOLERANCE;
use crate::symbolic::real::Real;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node, UnaryOp};
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use crate::symbolic::symbolic_functions::{Callable, Function, interpolate};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type Compiled = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

////////////////////////////////////////////////////////////////////////////////////////////
//                              LIBRARY
////////////////////////////////////////////////////////////////////////////////////////////
/// A set of native routines that calls are compiled to.
#[derive(Clone, Default)]
pub struct Library {
    routines: HashMap<(String, usize), Compiled>,
}

fn unary(f: fn(f64) -> f64) -> impl Fn(&[f64]) -> f64 + Send + Sync + 'static {
    move |a| f(a[0])
}

/// 170! is the largest factorial below `f64::MAX`
fn factorial(x: f64) -> f64 {
    if x < 0.0 || x.fract() != 0.0 {
        return f64::NAN;
    }
    if x > 170.0 {
        return f64::INFINITY;
    }
    (2..=x as u64).map(|k| k as f64).product()
}

fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

impl Library {
    pub fn new() -> Library {
        Library::default()
    }

    pub fn add(&mut self, name: &str, arity: usize, f: impl Fn(&[f64]) -> f64 + Send + Sync + 'static) {
        self.routines.insert((name.to_string(), arity), Arc::new(f));
    }

    pub fn get(&self, name: &str, arity: usize) -> Option<&Compiled> {
        self.routines.get(&(name.to_string(), arity))
    }

    pub fn len(&self) -> usize {
        self.routines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routines.is_empty()
    }

    /// the numeric functions of the standard namespace
    pub fn standard() -> Library {
        let mut lib = Library::new();
        let table: [(&str, fn(f64) -> f64); 31] = [
            ("Abs", f64::abs),
            ("Sign", sign),
            ("Sin", f64::sin),
            ("Cos", f64::cos),
            ("Tan", f64::tan),
            ("Sec", |x| 1.0 / x.cos()),
            ("Csc", |x| 1.0 / x.sin()),
            ("Cot", |x| 1.0 / x.tan()),
            ("ArcSin", f64::asin),
            ("ArcCos", f64::acos),
            ("ArcTan", f64::atan),
            ("ArcSec", |x| (1.0 / x).acos()),
            ("ArcCsc", |x| (1.0 / x).asin()),
            ("ArcCot", |x| (1.0 / x).atan()),
            ("Sinh", f64::sinh),
            ("Cosh", f64::cosh),
            ("Tanh", f64::tanh),
            ("Sech", |x| 1.0 / x.cosh()),
            ("Csch", |x| 1.0 / x.sinh()),
            ("Coth", |x| 1.0 / x.tanh()),
            ("ArcSinh", f64::asinh),
            ("ArcCosh", f64::acosh),
            ("ArcTanh", f64::atanh),
            ("ArcSech", |x| (1.0 / x).acosh()),
            ("ArcCsch", |x| (1.0 / x).asinh()),
            ("ArcCoth", |x| (1.0 / x).atanh()),
            ("Sqrt", f64::sqrt),
            ("Exp", f64::exp),
            ("Ln", f64::ln),
            ("Floor", f64::floor),
            ("Ceiling", f64::ceil),
        ];
        for (name, f) in table {
            lib.add(name, 1, unary(f));
        }
        lib.add("Round", 1, unary(f64::round));
        lib.add("Factorial", 1, unary(factorial));
        lib.add("Log", 2, |a| a[0].ln() / a[1].ln());
        lib.add("Min", 2, |a| a[0].min(a[1]));
        lib.add("Max", 2, |a| a[0].max(a[1]));
        lib.add("If", 3, |a| if a[0] != 0.0 { a[1] } else { a[2] });
        lib
    }
}

impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .routines
            .keys()
            .map(|(n, a)| format!("{}/{}", n, a))
            .collect();
        names.sort();
        write!(f, "Library[{}]", names.join(", "))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              COMPILED FUNCTION
////////////////////////////////////////////////////////////////////////////////////////////
#[derive(Clone)]
pub struct CompiledFunction {
    arity: usize,
    f: Compiled,
}

impl CompiledFunction {
    /// number of argument slots
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Evaluates at `x`. `x` must hold at least `arity()` values.
    #[inline]
    pub fn eval(&self, x: &[f64]) -> f64 {
        (self.f)(x)
    }

    pub fn closure(&self) -> Compiled {
        self.f.clone()
    }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompiledFunction(arity {})", self.arity)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              COMPILER
////////////////////////////////////////////////////////////////////////////////////////////
struct Compiler<'a> {
    libraries: &'a [Library],
}

fn constant(v: f64) -> Compiled {
    Arc::new(move |_: &[f64]| v)
}

fn truth(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

impl Compiler<'_> {
    fn compile(&self, e: &Expr, env: &HashMap<Expr, Compiled>) -> AlgebraResult<Compiled> {
        match e.node() {
            Node::Constant(r) => Ok(constant(r.to_f64())),
            Node::Variable(v) => env
                .get(e)
                .cloned()
                .ok_or_else(|| AlgebraError::UnresolvedName(v.name().to_string())),
            Node::Sum(terms) => {
                let parts = self.compile_all(terms, env)?;
                if let [a, b] = parts.as_slice() {
                    let (a, b) = (a.clone(), b.clone());
                    return Ok(Arc::new(move |x: &[f64]| a(x) + b(x)));
                }
                Ok(Arc::new(move |x: &[f64]| parts.iter().map(|p| p(x)).sum()))
            }
            Node::Product(factors) => {
                let parts = self.compile_all(factors, env)?;
                if let [a, b] = parts.as_slice() {
                    let (a, b) = (a.clone(), b.clone());
                    return Ok(Arc::new(move |x: &[f64]| a(x) * b(x)));
                }
                Ok(Arc::new(move |x: &[f64]| parts.iter().map(|p| p(x)).product()))
            }
            Node::Binary(BinaryOp::Power, base, exponent) => self.compile_power(base, exponent, env),
            Node::Binary(op, l, r) => self.compile_binary(e, *op, l, r, env),
            Node::Unary(UnaryOp::Not, operand) => {
                let o = self.compile(operand, env)?;
                Ok(Arc::new(move |x: &[f64]| truth(o(x) == 0.0)))
            }
            Node::Call(function, args) => self.compile_call(e, function, args, env),
            Node::Set(_) => Err(AlgebraError::CompilationFailure(format!("set {}", e))),
        }
    }

    fn compile_all(&self, es: &[Expr], env: &HashMap<Expr, Compiled>) -> AlgebraResult<Vec<Compiled>> {
        es.iter().map(|i| self.compile(i, env)).collect()
    }

    fn compile_power(&self, base: &Expr, exponent: &Expr, env: &HashMap<Expr, Compiled>) -> AlgebraResult<Compiled> {
        let b = self.compile(base, env)?;
        let Some(n) = exponent.as_real() else {
            let p = self.compile(exponent, env)?;
            return Ok(Arc::new(move |x: &[f64]| b(x).powf(p(x))));
        };
        let half = Real::ratio(1, 2);
        if half.as_ref() == Some(n) {
            return Ok(Arc::new(move |x: &[f64]| b(x).sqrt()));
        }
        let f: Compiled = match n.to_i64() {
            Some(2) => Arc::new(move |x: &[f64]| {
                let v = b(x);
                v * v
            }),
            Some(-1) => Arc::new(move |x: &[f64]| 1.0 / b(x)),
            Some(-2) => Arc::new(move |x: &[f64]| {
                let v = b(x);
                1.0 / (v * v)
            }),
            Some(k) if n.is_integer() && i32::try_from(k).is_ok() => {
                let k = k as i32;
                Arc::new(move |x: &[f64]| b(x).powi(k))
            }
            _ => {
                let p = n.to_f64();
                Arc::new(move |x: &[f64]| b(x).powf(p))
            }
        };
        Ok(f)
    }

    fn compile_binary(
        &self,
        e: &Expr,
        op: BinaryOp,
        l: &Expr,
        r: &Expr,
        env: &HashMap<Expr, Compiled>,
    ) -> AlgebraResult<Compiled> {
        if matches!(op, BinaryOp::Arrow | BinaryOp::Substitute) {
            return Err(AlgebraError::CompilationFailure(format!("{}", e)));
        }
        let (a, b) = (self.compile(l, env)?, self.compile(r, env)?);
        let f: Compiled = match op {
            BinaryOp::And => Arc::new(move |x: &[f64]| truth(a(x) != 0.0 && b(x) != 0.0)),
            BinaryOp::Or => Arc::new(move |x: &[f64]| truth(a(x) != 0.0 || b(x) != 0.0)),
            BinaryOp::Equal => Arc::new(move |x: &[f64]| truth(a(x) == b(x))),
            BinaryOp::NotEqual => Arc::new(move |x: &[f64]| truth(a(x) != b(x))),
            BinaryOp::Greater => Arc::new(move |x: &[f64]| truth(a(x) > b(x))),
            BinaryOp::Less => Arc::new(move |x: &[f64]| truth(a(x) < b(x))),
            BinaryOp::GreaterEqual => Arc::new(move |x: &[f64]| truth(a(x) >= b(x))),
            BinaryOp::LessEqual => Arc::new(move |x: &[f64]| truth(a(x) <= b(x))),
            BinaryOp::ApproxEqual => Arc::new(move |x: &[f64]| {
                let (u, v) = (a(x), b(x));
                truth(u == v || (u - v).abs() < APPROX_EQUAL_TOLERANCE * u.abs().max(v.abs()))
            }),
            BinaryOp::Power => Arc::new(move |x: &[f64]| a(x).powf(b(x))),
            BinaryOp::Arrow | BinaryOp::Substitute => {
                return Err(AlgebraError::CompilationFailure(format!("{}", e)));
            }
        };
        Ok(f)
    }

    fn compile_call(
        &self,
        e: &Expr,
        function: &Arc<Function>,
        args: &[Expr],
        env: &HashMap<Expr, Compiled>,
    ) -> AlgebraResult<Compiled> {
        let name = function.name();
        if let Some(routine) = self.libraries.iter().find_map(|l| l.get(name, args.len())) {
            let routine = routine.clone();
            let compiled = self.compile_all(args, env)?;
            if let [a] = compiled.as_slice() {
                let a = a.clone();
                return Ok(Arc::new(move |x: &[f64]| routine(&[a(x)])));
            }
            if let [a, b] = compiled.as_slice() {
                let (a, b) = (a.clone(), b.clone());
                return Ok(Arc::new(move |x: &[f64]| routine(&[a(x), b(x)])));
            }
            return Ok(Arc::new(move |x: &[f64]| {
                let values: Vec<f64> = compiled.iter().map(|c| c(x)).collect();
                routine(&values)
            }));
        }
        if function.is_if() {
            let [c, t, f] = args else {
                return Err(AlgebraError::CompilationFailure(format!("{}", e)));
            };
            let (c, t, f) = (self.compile(c, env)?, self.compile(t, env)?, self.compile(f, env)?);
            return Ok(Arc::new(move |x: &[f64]| if c(x) != 0.0 { t(x) } else { f(x) }));
        }
        if let Some(lut) = function.as_lut() {
            let [a] = args else {
                return Err(AlgebraError::CompilationFailure(format!("{}", e)));
            };
            let a = self.compile(a, env)?;
            let points = lut.points().to_vec();
            return Ok(Arc::new(move |x: &[f64]| interpolate(&points, a(x))));
        }
        if let Some(body) = function.body() {
            debug!("inlining {}", name);
            let compiled = self.compile_all(args, env)?;
            let inner: HashMap<Expr, Compiled> = function.parameters().into_iter().zip(compiled).collect();
            return self.compile(body, &inner);
        }
        Err(AlgebraError::CompilationFailure(format!(
            "no native routine for {}/{}",
            name,
            args.len()
        )))
    }
}

/// Compiles `expr` into a function of `variables`. Fails with `UnresolvedName` for a variable
/// that is not in `variables` and with `CompilationFailure` for a call that cannot be resolved.
pub fn compile(expr: &Expr, variables: &[Expr], libraries: &[Library]) -> AlgebraResult<CompiledFunction> {
    let env: HashMap<Expr, Compiled> = variables
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let slot: Compiled = Arc::new(move |x: &[f64]| x[i]);
            (v.clone(), slot)
        })
        .collect();
    let f = Compiler { libraries }.compile(expr, &env)?;
    debug!("compiled {} with {} slots", expr, variables.len());
    Ok(CompiledFunction {
        arity: variables.len(),
        f,
    })
}

/// compiles `function` called on its own parameters
pub fn compile_function(function: &Arc<Function>, libraries: &[Library]) -> AlgebraResult<CompiledFunction> {
    let params = function.parameters();
    let call = Expr::call(function.clone(), params.clone());
    compile(&call, &params, libraries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::evaluate::evaluate;
    use crate::symbolic::namespace::Namespace;
    use crate::symbolic::match_context::Bindings;
    use approx::assert_relative_eq;
    use rand::Rng;

    fn lib() -> Vec<Library> {
        vec![Library::standard()]
    }

    #[test]
    fn test_polynomial() {
        let x = Expr::var("x");
        let f = Expr::sum([x.pow(2) * 3, x.clone() * -2, Expr::integer(1)]);
        let c = compile(&f, std::slice::from_ref(&x), &lib()).unwrap();
        assert_eq!(c.arity(), 1);
        assert_relative_eq!(c.eval(&[2.0]), 9.0);
    }

    #[test]
    fn test_compiled_factorial() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let f = ns.call("Factorial", vec![x.clone()]).unwrap();
        let c = compile(&f, std::slice::from_ref(&x), &lib()).unwrap();
        assert_eq!(c.eval(&[5.0]), 120.0);
        assert!(c.eval(&[170.0]).is_finite());
        assert_eq!(c.eval(&[171.0]), f64::INFINITY);
        assert_eq!(c.eval(&[1e9]), f64::INFINITY);
        assert!(c.eval(&[2.5]).is_nan());
    }

    #[test]
    fn test_power_fast_paths() {
        let x = Expr::var("x");
        let vars = [x.clone()];
        for (e, expected) in [
            (x.pow(2), 6.25),
            (x.pow(-1), 0.4),
            (x.pow(-2), 0.16),
            (x.pow(Expr::ratio(1, 2).unwrap()), 2.5f64.sqrt()),
            (x.pow(5), 2.5f64.powi(5)),
            (x.pow(Expr::ratio(3, 2).unwrap()), 2.5f64.powf(1.5)),
        ] {
            assert_relative_eq!(compile(&e, &vars, &lib()).unwrap().eval(&[2.5]), expected, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_calls_and_relations() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let sin = ns.call("Sin", vec![x.clone()]).unwrap();
        let c = compile(&Expr::product([sin, y.clone()]), &vars, &lib()).unwrap();
        assert_relative_eq!(c.eval(&[0.5, 2.0]), 2.0 * 0.5f64.sin());

        let rel = Expr::binary(BinaryOp::Greater, x.clone(), y.clone());
        let c = compile(&rel, &vars, &lib()).unwrap();
        assert_eq!(c.eval(&[2.0, 1.0]), 1.0);
        assert_eq!(c.eval(&[1.0, 2.0]), 0.0);
        let c = compile(&Expr::not(rel), &vars, &lib()).unwrap();
        assert_eq!(c.eval(&[1.0, 2.0]), 1.0);
    }

    #[test]
    fn test_if_without_library_routine() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let cond = Expr::binary(BinaryOp::Less, x.clone(), Expr::zero());
        let f = ns.call("If", vec![cond, -x.clone(), x.clone()]).unwrap();
        // empty library: `If` is compiled as a select
        let c = compile(&f, std::slice::from_ref(&x), &[]).unwrap();
        assert_eq!(c.eval(&[-3.0]), 3.0);
        assert_eq!(c.eval(&[4.0]), 4.0);
    }

    #[test]
    fn test_lut_and_user_function() {
        let mut ns = Namespace::standard();
        let x = Expr::var("x");
        let table = ns.add_table("T", vec![(0.0, 0.0), (1.0, 10.0)]).unwrap();
        let square = ns.define("Sq", vec![Expr::var("u")], Expr::var("u").pow(2));
        let f = Expr::sum([
            Expr::call(table, vec![x.clone()]),
            Expr::call(square.clone(), vec![x.clone() + 1]),
        ]);
        let c = compile(&f, std::slice::from_ref(&x), &lib()).unwrap();
        assert_relative_eq!(c.eval(&[0.5]), 5.0 + 2.25);

        let sq = compile_function(&square, &lib()).unwrap();
        assert_relative_eq!(sq.eval(&[3.0]), 9.0);
    }

    #[test]
    fn test_failures() {
        let ns = Namespace::standard();
        let (x, y) = (Expr::var("x"), Expr::var("y"));
        assert!(matches!(
            compile(&(x.clone() + y.clone()), std::slice::from_ref(&x), &lib()),
            Err(AlgebraError::UnresolvedName(_))
        ));
        let unknown = Expr::undefined("g", vec![x.clone()]);
        assert!(matches!(
            compile(&unknown, std::slice::from_ref(&x), &lib()),
            Err(AlgebraError::CompilationFailure(_))
        ));
        assert!(matches!(
            compile(&Expr::arrow(x.clone(), y), std::slice::from_ref(&x), &lib()),
            Err(AlgebraError::CompilationFailure(_))
        ));
        let sin = ns.call("Sin", vec![x.clone()]).unwrap();
        assert!(compile(&sin, std::slice::from_ref(&x), &[]).is_err());
    }

    #[test]
    fn test_compiled_matches_evaluated() {
        let ns = Namespace::standard();
        let vars = Expr::symbols("x, y");
        let (x, y) = (vars[0].clone(), vars[1].clone());
        let f = Expr::sum([
            Expr::product([ns.call("Sin", vec![x.clone()]).unwrap(), y.pow(2)]),
            Expr::divide(
                ns.call("Exp", vec![-x.clone()]).unwrap(),
                y.pow(2) + 1,
            ),
            Expr::product([Expr::integer(3), x.pow(Expr::ratio(1, 2).unwrap())]),
        ]);
        let c = compile(&f, &vars, &lib()).unwrap();
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let (xv, yv) = (rng.random_range(0.1..2.0), rng.random_range(-2.0..2.0));
            let bindings: Bindings = [
                (x.clone(), Expr::constant(Real::from_f64(xv).unwrap())),
                (y.clone(), Expr::constant(Real::from_f64(yv).unwrap())),
            ]
            .into_iter()
            .collect();
            let symbolic = evaluate(&f.substitute(&bindings), &ns);
            let expected = symbolic.as_real().unwrap().to_f64();
            assert_relative_eq!(c.eval(&[xv, yv]), expected, max_relative = 1e-9);
        }
    }
}
