//! # Built-in functions
//!
//! The registration table of the standard namespace: numeric functions that apply to
//! constant arguments, the symbolic operations exposed as functions (`D`, `I`, `Solve`, ...),
//! the constants `Pi`, `e`, `True`, `False` and the `If` function.
//!
//! Numeric functions that have no finite real value at a given argument (`Ln[0]`,
//! `ArcSin[2]`) are not applicable there, so the call stays symbolic.
use crate::numerical::NR::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, nsolve};
use crate::symbolic::dsolve::dsolve;
use crate::symbolic::expand::expand;
use crate::symbolic::factor::factor;
use crate::symbolic::laplace::{inverse_laplace_transform, laplace_transform};
use crate::symbolic::namespace::Namespace;
use crate::symbolic::real::Real;
use crate::symbolic::solve::solve;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_engine_derivatives::differentiate;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use crate::symbolic::symbolic_functions::{Function, IfFunction, NativeFn, NativeFunction, Param};
use crate::symbolic::symbolic_integration::integrate;
use crate::symbolic::symbolic_simplify::{expand_log, simplify};
use std::f64::consts::{E, PI};

const X: &[Param] = &[Param::constant("x")];
const XY: &[Param] = &[Param::constant("x"), Param::constant("y")];

fn native(ns: &mut Namespace, name: &str, params: &[Param], f: NativeFn) {
    ns.add_function(Function::NativeFunction(NativeFunction::new(
        name,
        params.to_vec(),
        f,
    )));
}

fn real_arg<'a>(args: &'a [Expr], i: usize) -> AlgebraResult<&'a Real> {
    args.get(i)
        .and_then(|a| a.as_real())
        .ok_or_else(|| AlgebraError::InvalidArgument(format!("argument {} is not a constant", i)))
}

fn real_fn(args: &[Expr], f: impl Fn(&Real) -> Option<Real>) -> AlgebraResult<Option<Expr>> {
    Ok(f(real_arg(args, 0)?).map(Expr::constant))
}

fn float_fn(args: &[Expr], f: fn(f64) -> f64) -> AlgebraResult<Option<Expr>> {
    real_fn(args, |x| x.map_f64(f))
}

fn arg(args: &[Expr], i: usize) -> AlgebraResult<&Expr> {
    args.get(i)
        .ok_or_else(|| AlgebraError::InvalidArgument(format!("missing argument {}", i)))
}

/// a set when the input was a set or there is not exactly one result, the result otherwise
fn collect_results(input: &Expr, mut results: Vec<Expr>) -> Expr {
    if input.is_set() || results.len() != 1 {
        Expr::set(results)
    } else {
        results.remove(0)
    }
}

fn register_numeric(ns: &mut Namespace) {
    native(ns, "Abs", X, |a, _| real_fn(a, |x| Some(x.abs())));
    native(ns, "Sign", X, |a, _| {
        real_fn(a, |x| Some(Real::from_integer(x.signum() as i64)))
    });
    native(ns, "Min", XY, |a, _| {
        Ok(Some(Expr::constant(real_arg(a, 0)?.min(real_arg(a, 1)?).clone())))
    });
    native(ns, "Max", XY, |a, _| {
        Ok(Some(Expr::constant(real_arg(a, 0)?.max(real_arg(a, 1)?).clone())))
    });

    native(ns, "Sin", X, |a, _| float_fn(a, f64::sin));
    native(ns, "Cos", X, |a, _| float_fn(a, f64::cos));
    native(ns, "Tan", X, |a, _| float_fn(a, f64::tan));
    native(ns, "Sec", X, |a, _| float_fn(a, |x| 1.0 / x.cos()));
    native(ns, "Csc", X, |a, _| float_fn(a, |x| 1.0 / x.sin()));
    native(ns, "Cot", X, |a, _| float_fn(a, |x| 1.0 / x.tan()));

    native(ns, "ArcSin", X, |a, _| float_fn(a, f64::asin));
    native(ns, "ArcCos", X, |a, _| float_fn(a, f64::acos));
    native(ns, "ArcTan", X, |a, _| float_fn(a, f64::atan));
    native(ns, "ArcSec", X, |a, _| float_fn(a, |x| (1.0 / x).acos()));
    native(ns, "ArcCsc", X, |a, _| float_fn(a, |x| (1.0 / x).asin()));
    native(ns, "ArcCot", X, |a, _| float_fn(a, |x| (1.0 / x).atan()));

    native(ns, "Sinh", X, |a, _| float_fn(a, f64::sinh));
    native(ns, "Cosh", X, |a, _| float_fn(a, f64::cosh));
    native(ns, "Tanh", X, |a, _| float_fn(a, f64::tanh));
    native(ns, "Sech", X, |a, _| float_fn(a, |x| 1.0 / x.cosh()));
    native(ns, "Csch", X, |a, _| float_fn(a, |x| 1.0 / x.sinh()));
    native(ns, "Coth", X, |a, _| float_fn(a, |x| 1.0 / x.tanh()));

    native(ns, "ArcSinh", X, |a, _| float_fn(a, f64::asinh));
    native(ns, "ArcCosh", X, |a, _| float_fn(a, f64::acosh));
    native(ns, "ArcTanh", X, |a, _| float_fn(a, f64::atanh));
    native(ns, "ArcSech", X, |a, _| float_fn(a, |x| (1.0 / x).acosh()));
    native(ns, "ArcCsch", X, |a, _| float_fn(a, |x| (1.0 / x).asinh()));
    native(ns, "ArcCoth", X, |a, _| float_fn(a, |x| (1.0 / x).atanh()));

    native(ns, "Sqrt", X, |a, _| real_fn(a, Real::sqrt));
    native(ns, "Exp", X, |a, _| float_fn(a, f64::exp));
    native(ns, "Ln", X, |a, _| float_fn(a, f64::ln));
    native(ns, "Log", &[Param::constant("x"), Param::constant("b")], |a, _| {
        let (x, b) = (real_arg(a, 0)?.to_f64(), real_arg(a, 1)?.to_f64());
        Ok(Real::from_f64(x.ln() / b.ln()).map(Expr::constant))
    });

    native(ns, "Floor", X, |a, _| real_fn(a, |x| Some(x.floor())));
    native(ns, "Ceiling", X, |a, _| real_fn(a, |x| Some(x.ceil())));
    native(ns, "Round", X, |a, _| real_fn(a, |x| Some(x.round())));
    native(ns, "Factorial", X, |a, _| {
        let x = real_arg(a, 0)?;
        if let Some(f) = x.factorial() {
            return Ok(Some(Expr::constant(f)));
        }
        if x.is_integer() && !x.is_negative() {
            // too large to compute exactly
            return Ok(None);
        }
        Err(AlgebraError::InvalidArgument(format!("Factorial is not defined for {}", x)))
    });

    native(ns, "IsConstant", &[Param::any("x")], |a, _| {
        Ok(Some(Expr::boolean(arg(a, 0)?.is_constant())))
    });
    native(ns, "IsInteger", X, |a, _| {
        Ok(Some(Expr::boolean(real_arg(a, 0)?.is_integer())))
    });
    native(ns, "IsNatural", X, |a, _| {
        Ok(Some(Expr::boolean(real_arg(a, 0)?.is_natural())))
    });
}

fn register_symbolic(ns: &mut Namespace) {
    native(ns, "IsFunctionOf", &[Param::any("f"), Param::any("x")], |a, _| {
        Ok(Some(Expr::boolean(arg(a, 0)?.depends_on(arg(a, 1)?))))
    });
    native(ns, "Simplify", &[Param::any("x")], |a, ns| {
        Ok(Some(simplify(arg(a, 0)?, ns)))
    });
    native(ns, "Factor", &[Param::any("f")], |a, ns| {
        Ok(Some(factor(arg(a, 0)?, None, ns)))
    });
    native(ns, "Factor", &[Param::any("f"), Param::any("x")], |a, ns| {
        Ok(Some(factor(arg(a, 0)?, Some(arg(a, 1)?), ns)))
    });
    native(ns, "Expand", &[Param::any("f")], |a, ns| {
        expand(arg(a, 0)?, None, ns).map(Some)
    });
    native(ns, "Expand", &[Param::any("f"), Param::any("x")], |a, ns| {
        expand(arg(a, 0)?, Some(arg(a, 1)?), ns).map(Some)
    });
    native(ns, "ExpandLog", &[Param::any("f")], |a, ns| {
        Ok(Some(expand_log(arg(a, 0)?, ns)))
    });

    native(ns, "Solve", &[Param::any("f"), Param::any("x")], |a, ns| {
        let f = arg(a, 0)?;
        let result = solve(f.members(), arg(a, 1)?.members(), ns)?;
        Ok(Some(collect_results(f, result)))
    });
    native(ns, "NSolve", &[Param::any("f"), Param::any("x")], |a, ns| {
        let f = arg(a, 0)?;
        let result = nsolve(
            f.members(),
            arg(a, 1)?.members(),
            DEFAULT_TOLERANCE,
            DEFAULT_MAX_ITERATIONS,
            ns,
        )?;
        Ok(Some(collect_results(f, result)))
    });
    native(
        ns,
        "NSolve",
        &[
            Param::any("f"),
            Param::any("x"),
            Param::constant("e"),
            Param::constant("n"),
        ],
        |a, ns| {
            let f = arg(a, 0)?;
            let tolerance = real_arg(a, 2)?.to_f64();
            let iterations = real_arg(a, 3)?
                .to_i64()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    AlgebraError::InvalidArgument("iteration count must be a positive integer".to_string())
                })?;
            let result = nsolve(f.members(), arg(a, 1)?.members(), tolerance, iterations as usize, ns)?;
            Ok(Some(collect_results(f, result)))
        },
    );
    native(
        ns,
        "DSolve",
        &[Param::any("f"), Param::any("y"), Param::any("y0"), Param::any("t")],
        |a, ns| {
            let f = arg(a, 0)?;
            let result = dsolve(f.members(), arg(a, 1)?.members(), arg(a, 2)?.members(), arg(a, 3)?, ns)?;
            Ok(Some(collect_results(f, result)))
        },
    );

    native(ns, "D", &[Param::any("f"), Param::deferred("x")], |a, ns| {
        differentiate(arg(a, 0)?, arg(a, 1)?, ns).map(Some)
    });
    native(ns, "I", &[Param::any("f"), Param::deferred("x")], |a, ns| {
        integrate(arg(a, 0)?, arg(a, 1)?, ns).map(Some)
    });
    native(
        ns,
        "L",
        &[Param::any("f"), Param::deferred("t"), Param::any("s")],
        |a, ns| laplace_transform(arg(a, 0)?, arg(a, 1)?, arg(a, 2)?, ns).map(Some),
    );
    native(
        ns,
        "IL",
        &[Param::any("f"), Param::deferred("s"), Param::any("t")],
        |a, ns| inverse_laplace_transform(arg(a, 0)?, arg(a, 1)?, arg(a, 2)?, ns).map(Some),
    );
}

/// fills `ns` with the standard functions and constants
pub fn register(ns: &mut Namespace) {
    for (name, value) in [("Pi", PI), ("e", E)] {
        if let Some(r) = Real::from_f64(value) {
            ns.add_value(name, Expr::constant(r));
        }
    }
    ns.add_value("False", Expr::boolean(false));
    ns.add_value("True", Expr::boolean(true));
    ns.add_function(Function::IfFunction(IfFunction));
    register_numeric(ns);
    register_symbolic(ns);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::evaluate::evaluate;
    use approx::assert_relative_eq;

    fn eval(ns: &Namespace, name: &str, args: Vec<Expr>) -> Expr {
        evaluate(&ns.call(name, args).unwrap(), ns)
    }

    fn value(e: &Expr) -> f64 {
        e.as_real().unwrap().to_f64()
    }

    #[test]
    fn test_numeric_functions() {
        let ns = Namespace::standard();
        let half = Expr::ratio(1, 2).unwrap();
        assert_relative_eq!(value(&eval(&ns, "Sin", vec![half.clone()])), 0.5f64.sin());
        assert_relative_eq!(value(&eval(&ns, "ArcCoth", vec![Expr::integer(2)])), 0.5f64.atanh());
        assert_relative_eq!(
            value(&eval(&ns, "Log", vec![Expr::integer(8), Expr::integer(2)])),
            3.0,
            epsilon = 1e-12
        );
        assert_eq!(eval(&ns, "Abs", vec![Expr::integer(-3)]), Expr::integer(3));
        assert_eq!(eval(&ns, "Sign", vec![Expr::integer(-3)]), Expr::integer(-1));
        assert_eq!(eval(&ns, "Max", vec![Expr::integer(2), half.clone()]), Expr::integer(2));
        assert_eq!(eval(&ns, "Floor", vec![half.clone()]), Expr::zero());
        assert_eq!(eval(&ns, "Factorial", vec![Expr::integer(4)]), Expr::integer(24));
        assert_eq!(eval(&ns, "Sqrt", vec![Expr::integer(16)]), Expr::integer(4));
    }

    #[test]
    fn test_not_applicable_stays_symbolic() {
        let ns = Namespace::standard();
        let ln0 = ns.call("Ln", vec![Expr::zero()]).unwrap();
        assert_eq!(evaluate(&ln0, &ns), ln0);
        let sin_x = ns.call("Sin", vec![Expr::var("x")]).unwrap();
        assert_eq!(evaluate(&sin_x, &ns), sin_x);
        let fractional = ns.call("Factorial", vec![Expr::ratio(1, 2).unwrap()]).unwrap();
        assert_eq!(evaluate(&fractional, &ns), fractional);
        let huge = ns.call("Factorial", vec![Expr::integer(1_000_000_000)]).unwrap();
        assert_eq!(evaluate(&huge, &ns), huge);
    }

    #[test]
    fn test_predicates() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        assert!(eval(&ns, "IsConstant", vec![Expr::integer(3)]).is_true());
        assert!(eval(&ns, "IsConstant", vec![x.clone()]).is_false());
        assert!(eval(&ns, "IsInteger", vec![Expr::integer(3)]).is_true());
        assert!(eval(&ns, "IsNatural", vec![Expr::zero()]).is_false());
        assert!(eval(&ns, "IsNatural", vec![Expr::integer(2)]).is_true());
        assert!(eval(&ns, "IsFunctionOf", vec![x.pow(2), x.clone()]).is_true());
        assert!(eval(&ns, "IsFunctionOf", vec![Expr::var("y"), x]).is_false());
    }

    #[test]
    fn test_non_substitutable_parameters() {
        let ns = Namespace::standard();
        let d = ns.resolve_function("D", &[Expr::var("f"), Expr::var("x")]).unwrap();
        assert!(!crate::symbolic::symbolic_functions::Callable::is_deferred(d.as_ref(), 0));
        assert!(crate::symbolic::symbolic_functions::Callable::is_deferred(d.as_ref(), 1));
    }
}
