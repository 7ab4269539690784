//! # Functions
//!
//! The closed set of callable things that can appear in a `Call` node.
//!
//! ## Main Structures and Methods
//!
//! - [`Callable`] - the common interface, dispatched with `enum_dispatch`
//! - [`NativeFunction`] - a native routine with parameter descriptors ([`Param`]); a parameter
//!   can require constant arguments and can be marked as non-substitutable (substitutions
//!   into it are deferred, see `substitution`)
//! - [`ExprFunction`] - a user function defined by an expression body; without a body it is an
//!   undefined function such as `y[t]` that stays symbolic
//! - [`IfFunction`] - `If[c, t, f]`
//! - [`LutFunction`] - a lookup table with linear interpolation
//!
//! Calling returns `Ok(None)` when the function does not apply to the given arguments
//! (e.g. `Sin[x]` with symbolic `x`); evaluation then keeps the call as it is.
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::real::Real;
use crate::symbolic::substitution::substitute;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use enum_dispatch::enum_dispatch;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub type NativeFn = fn(&[Expr], &Namespace) -> AlgebraResult<Option<Expr>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// the routine only applies to constant arguments
    Constant,
    Any,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    /// bindings for this argument are deferred instead of substituted
    pub no_substitute: bool,
}

impl Param {
    pub const fn constant(name: &'static str) -> Param {
        Param {
            name,
            kind: ParamKind::Constant,
            no_substitute: false,
        }
    }
    pub const fn any(name: &'static str) -> Param {
        Param {
            name,
            kind: ParamKind::Any,
            no_substitute: false,
        }
    }
    pub const fn deferred(name: &'static str) -> Param {
        Param {
            name,
            kind: ParamKind::Any,
            no_substitute: true,
        }
    }
}

#[enum_dispatch]
pub trait Callable {
    fn name(&self) -> &str;
    /// parameter variables in declaration order
    fn parameters(&self) -> Vec<Expr>;
    fn arity(&self) -> usize;
    fn can_call(&self, args: &[Expr]) -> bool {
        args.len() == self.arity()
    }
    fn call(&self, args: &[Expr], ns: &Namespace) -> AlgebraResult<Option<Expr>>;
    /// `true` when substitutions into argument `index` must be deferred
    fn is_deferred(&self, _index: usize) -> bool {
        false
    }
    fn body(&self) -> Option<&Expr> {
        None
    }
}

#[enum_dispatch(Callable)]
#[derive(Clone, Debug)]
pub enum Function {
    NativeFunction,
    ExprFunction,
    IfFunction,
    LutFunction,
}

impl Function {
    fn kind_rank(&self) -> u8 {
        match self {
            Function::NativeFunction(_) => 0,
            Function::ExprFunction(_) => 1,
            Function::IfFunction(_) => 2,
            Function::LutFunction(_) => 3,
        }
    }
    pub fn as_lut(&self) -> Option<&LutFunction> {
        match self {
            Function::LutFunction(l) => Some(l),
            _ => None,
        }
    }
    pub fn is_if(&self) -> bool {
        matches!(self, Function::IfFunction(_))
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Function) -> bool {
        self.kind_rank() == other.kind_rank()
            && self.name() == other.name()
            && self.arity() == other.arity()
    }
}
impl Eq for Function {}
impl Hash for Function {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        self.arity().hash(state);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              NATIVE
////////////////////////////////////////////////////////////////////////////////////////////
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    params: Vec<Param>,
    native: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &str, params: Vec<Param>, native: NativeFn) -> NativeFunction {
        NativeFunction {
            name: name.to_string(),
            params,
            native,
        }
    }
    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.params.iter().map(|p| p.name).collect();
        write!(f, "{}[{}]", self.name, names.join(", "))
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }
    fn parameters(&self) -> Vec<Expr> {
        self.params.iter().map(|p| Expr::var(p.name)).collect()
    }
    fn arity(&self) -> usize {
        self.params.len()
    }
    fn call(&self, args: &[Expr], ns: &Namespace) -> AlgebraResult<Option<Expr>> {
        if args.len() != self.params.len() {
            return Err(AlgebraError::InvalidArgument(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.params.len(),
                args.len()
            )));
        }
        let applicable = self
            .params
            .iter()
            .zip(args)
            .all(|(p, a)| p.kind == ParamKind::Any || a.is_constant());
        if !applicable {
            return Ok(None);
        }
        (self.native)(args, ns)
    }
    fn is_deferred(&self, index: usize) -> bool {
        self.params.get(index).is_some_and(|p| p.no_substitute)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              USER DEFINED
////////////////////////////////////////////////////////////////////////////////////////////
#[derive(Clone, Debug)]
pub struct ExprFunction {
    name: String,
    params: Vec<Expr>,
    body: Option<Expr>,
}

impl ExprFunction {
    /// `name[params] = body`
    pub fn new(name: &str, params: Vec<Expr>, body: Expr) -> ExprFunction {
        ExprFunction {
            name: name.to_string(),
            params,
            body: Some(body),
        }
    }
    /// a function known only by name, e.g. the unknown `y` of a differential equation
    pub fn undefined(name: &str, arity: usize) -> ExprFunction {
        ExprFunction {
            name: name.to_string(),
            params: (0..arity).map(|i| Expr::var(&format!("_x{}", i))).collect(),
            body: None,
        }
    }
}

impl Callable for ExprFunction {
    fn name(&self) -> &str {
        &self.name
    }
    fn parameters(&self) -> Vec<Expr> {
        self.params.clone()
    }
    fn arity(&self) -> usize {
        self.params.len()
    }
    fn can_call(&self, args: &[Expr]) -> bool {
        self.body.is_some() && args.len() == self.params.len()
    }
    fn call(&self, args: &[Expr], ns: &Namespace) -> AlgebraResult<Option<Expr>> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| AlgebraError::UnresolvedName(self.name.clone()))?;
        let bindings: HashMap<Expr, Expr> = self
            .params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        Ok(Some(evaluate(&substitute(body, &bindings, false), ns)))
    }
    fn body(&self) -> Option<&Expr> {
        self.body.as_ref()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              IF
////////////////////////////////////////////////////////////////////////////////////////////
#[derive(Clone, Debug, Default)]
pub struct IfFunction;

impl Callable for IfFunction {
    fn name(&self) -> &str {
        "If"
    }
    fn parameters(&self) -> Vec<Expr> {
        Expr::symbols("c, t, f")
    }
    fn arity(&self) -> usize {
        3
    }
    fn call(&self, args: &[Expr], _ns: &Namespace) -> AlgebraResult<Option<Expr>> {
        let [c, t, f] = args else {
            return Err(AlgebraError::InvalidArgument(
                "If expects 3 arguments".to_string(),
            ));
        };
        if t == f {
            Ok(Some(t.clone()))
        } else if c.is_true() {
            Ok(Some(t.clone()))
        } else if c.is_false() {
            Ok(Some(f.clone()))
        } else {
            Err(AlgebraError::MatchFailure(format!(
                "condition {} is not a constant",
                c
            )))
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              LOOKUP TABLE
////////////////////////////////////////////////////////////////////////////////////////////
/// Piecewise linear function through a table of points, constant outside the table.
#[derive(Clone, Debug)]
pub struct LutFunction {
    name: String,
    points: Vec<(f64, f64)>,
}

impl LutFunction {
    pub fn new(name: &str, mut points: Vec<(f64, f64)>) -> AlgebraResult<LutFunction> {
        if points.is_empty() {
            return Err(AlgebraError::InvalidArgument(format!(
                "lookup table {} has no points",
                name
            )));
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(AlgebraError::InvalidArgument(format!(
                "lookup table {} has non-finite points",
                name
            )));
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(LutFunction {
            name: name.to_string(),
            points,
        })
    }
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }
    pub fn interpolate(&self, x: f64) -> f64 {
        interpolate(&self.points, x)
    }
}

/// linear interpolation in sorted `points`, clamped at both ends
pub fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let Some(first) = points.first() else {
        return f64::NAN;
    };
    if x <= first.0 {
        return first.1;
    }
    let upper = points.partition_point(|p| p.0 < x);
    if upper >= points.len() {
        return points[points.len() - 1].1;
    }
    let (x1, y1) = points[upper];
    let (x0, y0) = points[upper - 1];
    if x1 == x0 {
        return y1;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

impl Callable for LutFunction {
    fn name(&self) -> &str {
        &self.name
    }
    fn parameters(&self) -> Vec<Expr> {
        vec![Expr::var("x1")]
    }
    fn arity(&self) -> usize {
        1
    }
    fn call(&self, args: &[Expr], _ns: &Namespace) -> AlgebraResult<Option<Expr>> {
        match args {
            [x] => Ok(x
                .as_real()
                .and_then(|r| Real::from_f64(self.interpolate(r.to_f64())))
                .map(Expr::constant)),
            _ => Err(AlgebraError::InvalidArgument(format!(
                "{} expects 1 argument",
                self.name
            ))),
        }
    }
}

impl Expr {
    /// call of an undefined function, e.g. `y[t]`
    pub fn undefined(name: &str, args: Vec<Expr>) -> Expr {
        let f = ExprFunction::undefined(name, args.len());
        Expr::call(Arc::new(Function::ExprFunction(f)), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lut_interpolation() {
        let lut = LutFunction::new("T", vec![(1.0, 10.0), (0.0, 0.0), (2.0, 30.0)]).unwrap();
        assert_relative_eq!(lut.interpolate(0.5), 5.0);
        assert_relative_eq!(lut.interpolate(1.5), 20.0);
        assert_relative_eq!(lut.interpolate(-1.0), 0.0);
        assert_relative_eq!(lut.interpolate(5.0), 30.0);
        assert!(LutFunction::new("E", vec![]).is_err());
    }

    #[test]
    fn test_lut_call() {
        let ns = Namespace::new();
        let lut = LutFunction::new("T", vec![(0.0, 0.0), (2.0, 4.0)]).unwrap();
        let r = lut.call(&[Expr::integer(1)], &ns).unwrap();
        assert_eq!(r, Some(Expr::integer(2)));
        let symbolic = lut.call(&[Expr::var("x")], &ns).unwrap();
        assert_eq!(symbolic, None);
    }

    #[test]
    fn test_if_function() {
        let ns = Namespace::new();
        let (a, b) = (Expr::var("a"), Expr::var("b"));
        let f = IfFunction;
        assert_eq!(f.call(&[Expr::one(), a.clone(), b.clone()], &ns).unwrap(), Some(a.clone()));
        assert_eq!(f.call(&[Expr::zero(), a.clone(), b.clone()], &ns).unwrap(), Some(b.clone()));
        assert_eq!(f.call(&[Expr::var("c"), a.clone(), a.clone()], &ns).unwrap(), Some(a.clone()));
        assert!(matches!(
            f.call(&[Expr::var("c"), a, b], &ns),
            Err(AlgebraError::MatchFailure(_))
        ));
    }

    #[test]
    fn test_expr_function() {
        let ns = Namespace::standard();
        let x = Expr::var("x");
        let square = ExprFunction::new("Square", vec![x.clone()], x.pow(2));
        let r = square.call(&[Expr::integer(3)], &ns).unwrap();
        assert_eq!(r, Some(Expr::integer(9)));

        let y = ExprFunction::undefined("y", 1);
        assert!(!y.can_call(&[x.clone()]));
        assert!(matches!(
            y.call(&[x], &ns),
            Err(AlgebraError::UnresolvedName(_))
        ));
    }

    #[test]
    fn test_function_identity() {
        let a = Function::ExprFunction(ExprFunction::undefined("y", 1));
        let b = Function::ExprFunction(ExprFunction::undefined("y", 1));
        let c = Function::ExprFunction(ExprFunction::undefined("y", 2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
