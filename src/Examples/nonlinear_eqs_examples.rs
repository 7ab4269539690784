// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]

use crate::numerical::NR::{DEFAULT_MAX_ITERATIONS, NR, nsolve};
use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};

pub fn nonlinear_examples(example: usize) -> AlgebraResult<()> {
    let ns = Namespace::standard();
    match example {
        0 => {
            // NEWTON-RAPHSON ON A SQUARE SYSTEM
            let vars = Expr::symbols("x, y");
            let (x, y) = (vars[0].clone(), vars[1].clone());
            let eq_system = vec![x.pow(2) + y.pow(2) - 10, x - y - 4];
            let mut NR_instanse = NR::new();
            NR_instanse.set_equation_system(eq_system, vars, vec![1.0, 1.0], 1e-8, 100)?;
            NR_instanse.set_solver_params(None, None, Some("info".to_string()))?;
            let result = NR_instanse.solve(&ns)?;
            println!("result = {:?} \n", result);
        }
        1 => {
            // NSOLVE WITH HOMOTOPY CONTINUATION FROM A FAR GUESS
            let x = Expr::var("x");
            let atan = ns.call("ArcTan", vec![x.clone() - 1])?;
            let guess = Expr::arrow(x.clone(), Expr::integer(5));
            let result = nsolve(&[atan], &[guess], 1e-10, DEFAULT_MAX_ITERATIONS, &ns)?;
            println!("ArcTan[x - 1] = 0: {:?}", result.iter().map(|e| e.to_string()).collect::<Vec<_>>());

            let cos = ns.call("Cos", vec![x.clone()])?;
            let eq = Expr::equal(x.clone(), cos);
            let guess = Expr::arrow(x, Expr::ratio(1, 2).unwrap_or_else(Expr::zero));
            for arrow in nsolve(&[eq], &[guess], 1e-10, DEFAULT_MAX_ITERATIONS, &ns)? {
                println!("x == Cos[x]: {}", arrow);
            }
        }
        2 => {
            // OVERDETERMINED SYSTEM, LEAST SQUARES STEPS
            let vars = Expr::symbols("a, b");
            let (a, b) = (vars[0].clone(), vars[1].clone());
            // the line a*t + b through three collinear points
            let eq_system = vec![
                b.clone() - 1,
                a.clone() + b.clone() - 3,
                a * 2 + b - 5,
            ];
            let mut NR_instanse = NR::new();
            NR_instanse.set_equation_system(eq_system, vars, vec![0.0, 0.0], 1e-8, 50)?;
            NR_instanse.set_solver_params(None, None, Some("off".to_string()))?;
            println!("a, b = {:?}", NR_instanse.solve(&ns)?);
        }
        _ => {
            return Err(AlgebraError::InvalidArgument(format!(
                "no nonlinear example {}",
                example
            )));
        }
    }
    Ok(())
}
