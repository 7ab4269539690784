#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// canonical expression trees: constants are exact rationals, sums and products are flattened,
/// folded and sorted on construction, so structural equality stands in for algebraic equality
///# Example#
/// ```
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// let vars = Expr::symbols("x, y");
/// let (x, y) = (vars[0].clone(), vars[1].clone());
/// // the same canonical form whatever the order of construction
/// assert_eq!(x.clone() * y.clone() + 1, Expr::one() + y * x);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod real;
pub mod symbolic_engine;
pub mod symbolic_errors;
/// visitors, memoization and the cost measure
pub mod symbolic_visitors;
///________________________________________________________________________________________________________________________________________________
///
/// functions, namespaces and the registration table of the built-in functions
/// Example#
/// ```
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// use RustedCAS::symbolic::evaluate::evaluate;
/// let mut ns = Namespace::standard();
/// let x = Expr::var("x");
/// // user function Sq[x] = x^2
/// ns.define("Sq", vec![x.clone()], x.pow(2));
/// let call = ns.call("Sq", vec![Expr::integer(3)]).unwrap();
/// assert_eq!(evaluate(&call, &ns), Expr::integer(9));
/// ```
pub mod builtins;
pub mod namespace;
pub mod symbolic_functions;
///________________________________________________________________________________________________________________________________________________
/// pattern matching, substitution and rewrite rules
pub mod match_context;
pub mod pattern_matching;
pub mod substitution;
pub mod transforms;
///________________________________________________________________________________________________________________________________________________
/// evaluation, simplification, expansion and factorization
/// Example#
/// ```
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// use RustedCAS::symbolic::expand::expand;
/// use RustedCAS::symbolic::factor::factor;
/// let ns = Namespace::standard();
/// let x = Expr::var("x");
/// let cube = expand(&(x.clone() + 1).pow(3), None, &ns).unwrap();
/// println!("(x + 1)^3 = {}", cube);
/// let f = factor(&(x.pow(2) - x.clone()), Some(&x), &ns);
/// assert_eq!(f, Expr::product([x.clone(), x - 1]));
/// ```
pub mod evaluate;
pub mod expand;
pub mod factor;
pub mod polynomial;
pub mod symbolic_simplify;
///________________________________________________________________________________________________________________________________________________
/// calculus: derivatives, jacobians, integrals and Laplace transforms
/// Example#
/// ```
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// use RustedCAS::symbolic::symbolic_engine_derivatives::differentiate;
/// let ns = Namespace::standard();
/// let x = Expr::var("x");
/// let sin = ns.call("Sin", vec![x.clone()]).unwrap();
/// let cos = ns.call("Cos", vec![x.clone()]).unwrap();
/// assert_eq!(differentiate(&sin, &x, &ns).unwrap(), cos);
/// ```
pub mod laplace;
pub mod symbolic_engine_derivatives;
pub mod symbolic_integration;
///________________________________________________________________________________________________________________________________________________
/// linear systems and differential equations
/// Example#
/// ```
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// use RustedCAS::symbolic::solve::solve;
/// let ns = Namespace::standard();
/// let vars = Expr::symbols("x, y");
/// let equations = vec![
///     Expr::equal(vars[0].clone() + vars[1].clone(), Expr::integer(3)),
///     Expr::equal(vars[0].clone() - vars[1].clone(), Expr::one()),
/// ];
/// // x -> 2, y -> 1
/// let solution = solve(&equations, &vars, &ns).unwrap();
/// println!("{:?}", solution);
/// ```
pub mod dsolve;
pub mod linear_combination;
pub mod solve;
///______________________________________________________________________________________________________________________________________________
/// compilation of expressions into native closures
/// Example#
/// ```
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// use RustedCAS::symbolic::symbolic_lambdify::{compile, Library};
/// let vars = Expr::symbols("x, y");
/// let f = vars[0].pow(2) + vars[1].clone() * 3;
/// let compiled = compile(&f, &vars, &[Library::standard()]).unwrap();
/// assert_eq!(compiled.eval(&[2.0, 1.0]), 7.0);
/// ```
pub mod symbolic_lambdify;
///______________________________________________________________________________________________________________________________________________
/// matrices of expressions
/// Example#
/// ```
/// use RustedCAS::symbolic::namespace::Namespace;
/// use RustedCAS::symbolic::symbolic_engine::Expr;
/// use RustedCAS::symbolic::symbolic_matrix::ExprMatrix;
/// let ns = Namespace::standard();
/// let k = Expr::var("k");
/// let m = ExprMatrix::identity(2) * k;
/// let inverse = m.pow(-1, &ns).unwrap();
/// assert_eq!((m * inverse).evaluate(&ns), ExprMatrix::identity(2));
/// ```
pub mod symbolic_matrix;
