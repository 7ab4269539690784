// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]

use crate::symbolic::dsolve::{IntegrationMethod, dsolve, nd_solve};
use crate::symbolic::evaluate::evaluate_at;
use crate::symbolic::expand::expand;
use crate::symbolic::factor::factor;
use crate::symbolic::laplace::{inverse_laplace_transform, laplace_transform};
use crate::symbolic::namespace::Namespace;
use crate::symbolic::solve::solve;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_engine_derivatives::{differentiate, jacobian};
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use crate::symbolic::symbolic_integration::{definite_integrate, integrate, quad};
use crate::symbolic::symbolic_lambdify::{Library, compile};
use crate::symbolic::symbolic_matrix::ExprMatrix;
use crate::symbolic::symbolic_simplify::{expand_log, simplify};
use strum::IntoEnumIterator;

pub fn sym_examples(example: usize) -> AlgebraResult<()> {
    let ns = Namespace::standard();
    match example {
        0 => {
            // CANONICAL FORMS AND EVALUATION
            let vars = Expr::symbols("x, y");
            let (x, y) = (vars[0].clone(), vars[1].clone());
            // like terms are collected when the sum is built
            let f = x.clone() * 2 + y.clone() + x.clone() * 3;
            println!("2*x + y + 3*x = {}", f);
            // substitution and evaluation to an exact rational
            let at = [
                Expr::arrow(x.clone(), Expr::integer(1)),
                Expr::arrow(y.clone(), Expr::ratio(1, 3).unwrap_or_else(Expr::one)),
            ];
            println!("at x = 1, y = 1/3: {}", evaluate_at(&f, &at, &ns));
            let sin = ns.call("Sin", vec![x.clone()])?;
            let cos = ns.call("Cos", vec![x.clone()])?;
            let g = sin.pow(2) + cos.pow(2) + y.clone();
            println!("Simplify[{}] = {}", g, simplify(&g, &ns));
            let h = ns.call("Ln", vec![x.clone() * y.pow(2)])?;
            println!("ExpandLog[{}] = {}", h, expand_log(&h, &ns));
        }
        1 => {
            // DERIVATIVES AND JACOBIAN
            let vars = Expr::symbols("x, y");
            let (x, y) = (vars[0].clone(), vars[1].clone());
            let f = ns.call("Exp", vec![x.clone() * y.clone()])? + x.pow(3) / y.clone();
            let df_dx = differentiate(&f, &x, &ns)?;
            let df_dy = differentiate(&f, &y, &ns)?;
            println!("f = {}\n df/dx = {}\n df/dy = {}", f, df_dx, df_dy);
            let system = vec![x.pow(2) + y.pow(2) - 10, x.clone() - y.clone() - 4];
            let jac = jacobian(&system, &vars, &ns)?;
            for (i, row) in jac.iter().enumerate() {
                let row: Vec<String> = row.iter().map(|e| e.to_string()).collect();
                println!("J[{}] = [{}]", i, row.join(", "));
            }
            // the same Jacobian as a matrix, inverted at a point
            let at = [
                Expr::arrow(x.clone(), Expr::integer(3)),
                Expr::arrow(y.clone(), Expr::integer(-1)),
            ];
            let j = ExprMatrix::new(jac).evaluate_at(&at, &ns);
            println!("J(3, -1) = {}\nJ(3, -1)^-1 = {}", j, j.pow(-1, &ns)?);
        }
        2 => {
            // INTEGRALS
            let x = Expr::var("x");
            let f = x.pow(2) + ns.call("Cos", vec![x.clone()])?;
            println!("I[{}, x] = {}", f, integrate(&f, &x, &ns)?);
            let exact = definite_integrate(&f, &x, &Expr::zero(), &Expr::one(), &ns)?;
            let numeric = quad(&f, &x, 0.0, 1.0, 8)?;
            println!("from 0 to 1: {} ~ {}", exact, numeric);
        }
        3 => {
            // EXPAND, FACTOR, SOLVE
            let x = Expr::var("x");
            let cube = (x.clone() + 1).pow(3);
            println!("Expand[{}] = {}", cube, expand(&cube, None, &ns)?);
            let q = x.pow(2) - x.clone();
            println!("Factor[{}, x] = {}", q, factor(&q, Some(&x), &ns));
            let s = Expr::var("s");
            let rational = Expr::inverse(s.pow(3) + s.clone());
            println!("partial fractions of {} = {}", rational, expand(&rational, Some(&s), &ns)?);

            let vars = Expr::symbols("x, y, z");
            let equations = vec![
                Expr::equal(vars[0].clone() + vars[1].clone() + vars[2].clone(), Expr::integer(6)),
                Expr::equal(vars[0].clone() - vars[1].clone(), Expr::zero()),
                Expr::equal(vars[2].clone() * 2, vars[0].clone() + 4),
            ];
            for arrow in solve(&equations, &vars, &ns)? {
                println!("{}", arrow);
            }
        }
        4 => {
            // LAPLACE TRANSFORMS AND DIFFERENTIAL EQUATIONS
            let (t, s) = (Expr::var("t"), Expr::var("s"));
            let f = ns.call("Sin", vec![t.clone() * 2])? + t.pow(2);
            let transformed = laplace_transform(&f, &t, &s, &ns)?;
            println!("L[{}] = {}", f, transformed);
            println!("IL[{}] = {}", transformed, inverse_laplace_transform(&transformed, &s, &t, &ns)?);

            let y = Expr::undefined("y", vec![t.clone()]);
            let dy = ns.call("D", vec![y.clone(), t.clone()])?;
            let eq = Expr::equal(dy, -y.clone());
            let y0 = Expr::arrow(Expr::undefined("y", vec![Expr::zero()]), Expr::one());
            for arrow in dsolve(std::slice::from_ref(&eq), std::slice::from_ref(&y), &[y0], &t, &ns)? {
                println!("DSolve: {}", arrow);
            }
            let (t0, h) = (Expr::var("t0"), Expr::var("h"));
            for method in IntegrationMethod::iter() {
                let step = nd_solve(std::slice::from_ref(&eq), std::slice::from_ref(&y), &t, &t0, &h, method, &ns)?;
                for arrow in step {
                    println!("{}: {}", method, arrow);
                }
            }
        }
        5 => {
            // COMPILATION
            let vars = Expr::symbols("x, y");
            let (x, y) = (vars[0].clone(), vars[1].clone());
            let f = ns.call("Sqrt", vec![x.pow(2) + y.pow(2)])? * ns.call("Exp", vec![-x.clone()])?;
            let compiled = compile(&f, &vars, &[Library::standard()])?;
            for point in [[0.0, 1.0], [1.0, 1.0], [3.0, 4.0]] {
                println!("f({:?}) = {}", point, compiled.eval(&point));
            }
        }
        _ => {
            return Err(AlgebraError::InvalidArgument(format!(
                "no symbolic example {}",
                example
            )));
        }
    }
    Ok(())
}
