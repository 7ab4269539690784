///  Example#1
/// ```
/// use RustedCAS::numerical::NR::NR;
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// // first define system of equations and initial guess
/// let ns = Namespace::standard();
/// let vars = Expr::symbols("x, y");
/// let (x, y) = (vars[0].clone(), vars[1].clone());
/// let mut NR_instanse = NR::new();
/// let eq_system = vec![x.pow(2) + y.pow(2) - 10, x - y - 4];
/// NR_instanse.set_equation_system(eq_system, vars, vec![1.0, 1.0], 1e-6, 100).unwrap();
/// NR_instanse.set_solver_params(None, None, Some("off".to_string())).unwrap();
/// // solve
/// NR_instanse.solve(&ns).unwrap();
/// println!("result = {:?} \n", NR_instanse.get_result().unwrap());
/// ```
/// Example#2
/// ```
/// // homotopy continuation from a guess far from the root
/// use RustedCAS::numerical::NR::{nsolve, DEFAULT_MAX_ITERATIONS};
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// let ns = Namespace::standard();
/// let x = Expr::var("x");
/// let f = ns.call("ArcTan", vec![x.clone() - 1]).unwrap();
/// let result = nsolve(&[f], &[Expr::arrow(x, Expr::integer(5))], 1e-10, DEFAULT_MAX_ITERATIONS, &ns).unwrap();
/// println!("{}", result[0]);
/// ```
pub mod NR;
