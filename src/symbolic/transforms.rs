//! # Transforms
//!
//! Rewrite rules and rule sets used by differentiation, integration, Laplace transforms and
//! simplification.
//!
//! ## Main Structures and Methods
//!
//! - [`Transform`] - `transform(e) -> Option<Expr>`, `None` when the transform does not apply
//! - [`SubstituteTransform`] - a pattern, a result template and preconditions; the result is
//!   `evaluate(substitute(result, bindings))` with substitution in transform mode
//! - [`TransformSet`] - rules indexed by the shape of their patterns: a pattern `D[Sin[u], x]`
//!   is filed under the split pattern `D[_1, _2]`, so an expression that is not a call of `D`
//!   is rejected by one match instead of one match per rule
//! - [`CachedTransform`] - memo over another transform
//! - [`LinearTransform`] / [`linear_visit`] - splitting of sums and constant factors for
//!   operators that are linear in a variable
use crate::symbolic::evaluate::evaluate;
use crate::symbolic::factor::factor;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::substitution::substitute;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node};
use crate::symbolic::symbolic_errors::AlgebraResult;
use std::cell::RefCell;
use std::collections::HashMap;

pub trait Transform {
    /// the transformed expression, `None` when the transform does not apply to `e`
    fn transform(&self, e: &Expr, ns: &Namespace) -> Option<Expr>;
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              SUBSTITUTE TRANSFORM
////////////////////////////////////////////////////////////////////////////////////////////
#[derive(Clone, Debug)]
pub struct SubstituteTransform {
    pattern: Expr,
    result: Expr,
    conditions: Vec<Expr>,
}

impl SubstituteTransform {
    pub fn new(pattern: Expr, result: Expr, conditions: Vec<Expr>) -> SubstituteTransform {
        SubstituteTransform {
            pattern,
            result,
            conditions,
        }
    }
    pub fn pattern(&self) -> &Expr {
        &self.pattern
    }

    pub fn try_apply(&self, e: &Expr, ns: &Namespace) -> Option<Expr> {
        let matched = self.pattern.match_expr(e, ns)?;
        let bindings = matched.bindings();
        let accepted = self
            .conditions
            .iter()
            .all(|c| evaluate(&substitute(c, bindings, true), ns).is_true());
        if !accepted {
            return None;
        }
        Some(evaluate(&substitute(&self.result, bindings, true), ns))
    }
}

impl Transform for SubstituteTransform {
    fn transform(&self, e: &Expr, ns: &Namespace) -> Option<Expr> {
        self.try_apply(e, ns)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              TRANSFORM SET
////////////////////////////////////////////////////////////////////////////////////////////
/// shape of `p` with every child replaced by a fresh variable `_1.._n`
fn split(p: &Expr) -> Option<Expr> {
    let mut unique = 0;
    let mut fresh = || {
        unique += 1;
        Expr::var(&format!("_{}", unique))
    };
    match p.node() {
        Node::Sum(terms) => Some(Expr::sum(terms.iter().map(|_| fresh()).collect::<Vec<_>>())),
        Node::Product(factors) => Some(Expr::product(
            factors.iter().map(|_| fresh()).collect::<Vec<_>>(),
        )),
        Node::Binary(op, _, _) => {
            let (l, r) = (fresh(), fresh());
            Some(Expr::binary(*op, l, r))
        }
        Node::Unary(op, _) => Some(Expr::from_node(Node::Unary(*op, fresh()))),
        Node::Call(f, args) => Some(Expr::call(
            f.clone(),
            args.iter().map(|_| fresh()).collect(),
        )),
        _ => None,
    }
}

/// Tree of rules. A node with a pattern only holds rules whose patterns match it.
#[derive(Clone, Debug, Default)]
pub struct TransformSet {
    pattern: Option<Expr>,
    children: Vec<TransformSet>,
    transforms: Vec<SubstituteTransform>,
}

impl TransformSet {
    pub fn new() -> TransformSet {
        TransformSet::default()
    }

    pub fn from_rules(rules: Vec<SubstituteTransform>, ns: &Namespace) -> TransformSet {
        let mut set = TransformSet::new();
        for rule in rules {
            set.add(rule, ns);
        }
        set
    }

    fn is_child(&self, p: &Expr, ns: &Namespace) -> bool {
        self.pattern
            .as_ref()
            .is_none_or(|own| own.match_expr(p, ns).is_some())
    }

    pub fn add(&mut self, rule: SubstituteTransform, ns: &Namespace) {
        for child in self.children.iter_mut() {
            if child.is_child(rule.pattern(), ns) {
                child.add(rule, ns);
                return;
            }
        }
        match split(rule.pattern()) {
            Some(parent) if self.pattern.as_ref() != Some(&parent) => {
                let mut child = TransformSet {
                    pattern: Some(parent),
                    ..TransformSet::default()
                };
                child.add(rule, ns);
                self.children.push(child);
            }
            _ => self.transforms.push(rule),
        }
    }

    pub fn len(&self) -> usize {
        self.transforms.len() + self.children.iter().map(|c| c.len()).sum::<usize>()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// first result of a rule that applies to `e` and passes `validate`
    pub fn transform_with(
        &self,
        e: &Expr,
        validate: &dyn Fn(&Expr) -> bool,
        ns: &Namespace,
    ) -> Option<Expr> {
        if let Some(p) = &self.pattern {
            p.match_expr(e, ns)?;
        }
        for child in &self.children {
            if let Some(r) = child.transform_with(e, validate, ns) {
                return Some(r);
            }
        }
        self.transforms
            .iter()
            .filter_map(|t| t.try_apply(e, ns))
            .find(|r| r != e && validate(r))
    }
}

impl Transform for TransformSet {
    fn transform(&self, e: &Expr, ns: &Namespace) -> Option<Expr> {
        self.transform_with(e, &|_: &Expr| true, ns)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              CACHED TRANSFORM
////////////////////////////////////////////////////////////////////////////////////////////
/// Memoizes the results of another transform. Not shareable between threads.
pub struct CachedTransform<T: Transform> {
    inner: T,
    cache: RefCell<HashMap<Expr, Option<Expr>>>,
}

impl<T: Transform> CachedTransform<T> {
    pub fn new(inner: T) -> CachedTransform<T> {
        CachedTransform {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }
    pub fn cached(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<T: Transform> Transform for CachedTransform<T> {
    fn transform(&self, e: &Expr, ns: &Namespace) -> Option<Expr> {
        if let Some(hit) = self.cache.borrow().get(e) {
            return hit.clone();
        }
        let result = self.inner.transform(e, ns);
        self.cache.borrow_mut().insert(e.clone(), result.clone());
        result
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              LINEAR TRANSFORM
////////////////////////////////////////////////////////////////////////////////////////////
/// An operator `V` that is linear over expressions constant for it.
pub trait LinearTransform {
    fn ns(&self) -> &Namespace;
    /// `true` when `e` is a constant for this operator
    fn is_constant(&self, e: &Expr) -> bool;
    /// entry point of the operator; implementations usually end with [`linear_visit`]
    fn visit(&mut self, e: &Expr) -> AlgebraResult<Expr>;
    /// `V(e)` for an expression that linearity does not reduce
    fn visit_leaf(&mut self, e: &Expr) -> AlgebraResult<Expr>;
}

/// - `V(x + y) = V(x) + V(y)`
/// - `V(A*x) = A*V(x)`
/// - `V((A*x)^n) = A^n*V(x^n)`
///
/// Everything else goes to [`LinearTransform::visit_leaf`].
pub fn linear_visit<T: LinearTransform + ?Sized>(t: &mut T, e: &Expr) -> AlgebraResult<Expr> {
    match e.node() {
        Node::Sum(terms) => {
            let mut visited = Vec::with_capacity(terms.len());
            for term in terms {
                visited.push(t.visit(term)?);
            }
            Ok(Expr::sum(visited))
        }
        Node::Product(factors) => {
            let (constant, rest): (Vec<Expr>, Vec<Expr>) =
                factors.iter().cloned().partition(|f| t.is_constant(f));
            if constant.is_empty() {
                return t.visit_leaf(e);
            }
            let inner = t.visit(&Expr::product(rest))?;
            Ok(Expr::product(constant.into_iter().chain(std::iter::once(inner))))
        }
        Node::Binary(BinaryOp::Power, base, n) if t.is_constant(n) => {
            let factored = factor(base, None, t.ns());
            let (constant, rest): (Vec<Expr>, Vec<Expr>) =
                factored.factors().iter().cloned().partition(|f| t.is_constant(f));
            if constant.is_empty() {
                return t.visit_leaf(e);
            }
            let inner = t.visit(&Expr::power(Expr::product(rest), n.clone()))?;
            Ok(Expr::product([
                Expr::power(Expr::product(constant), n.clone()),
                inner,
            ]))
        }
        _ => t.visit_leaf(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(ns: &Namespace, name: &str, result: Expr) -> SubstituteTransform {
        let u = Expr::var("u");
        SubstituteTransform::new(ns.call(name, vec![u]).unwrap(), result, vec![])
    }

    #[test]
    fn test_substitute_transform_with_condition() {
        let ns = Namespace::standard();
        let (x, n) = (Expr::var("x"), Expr::var("n"));
        let is_integer = ns.call("IsInteger", vec![n.clone()]).unwrap();
        let t = SubstituteTransform::new(x.pow(n.clone()), n.clone() * x.pow(n - 1), vec![is_integer]);
        let y = Expr::var("y");
        assert_eq!(t.try_apply(&y.pow(3), &ns), Some(y.pow(2) * 3));
        assert_eq!(t.try_apply(&y.pow(Expr::ratio(1, 2).unwrap()), &ns), None);
    }

    #[test]
    fn test_transform_set_indexes_by_shape() {
        let ns = Namespace::standard();
        let u = Expr::var("u");
        let mut set = TransformSet::new();
        set.add(rule(&ns, "Sin", ns.call("Cos", vec![u.clone()]).unwrap()), &ns);
        set.add(rule(&ns, "Cos", -ns.call("Sin", vec![u.clone()]).unwrap()), &ns);
        set.add(rule(&ns, "Exp", u.clone()), &ns);
        assert_eq!(set.len(), 3);
        // one child per function
        assert_eq!(set.children.len(), 3);

        let y = Expr::var("y");
        let sin = ns.call("Sin", vec![y.clone()]).unwrap();
        assert_eq!(set.transform(&sin, &ns), Some(ns.call("Cos", vec![y.clone()]).unwrap()));
        assert_eq!(set.transform(&y, &ns), None);
        let only_constants = |r: &Expr| r.is_constant();
        assert_eq!(set.transform_with(&sin, &only_constants, &ns), None);
    }

    #[test]
    fn test_cached_transform() {
        let ns = Namespace::standard();
        let u = Expr::var("u");
        let cached = CachedTransform::new(rule(&ns, "Exp", u));
        let e = ns.call("Exp", vec![Expr::var("y")]).unwrap();
        assert_eq!(cached.transform(&e, &ns), Some(Expr::var("y")));
        assert_eq!(cached.transform(&e, &ns), Some(Expr::var("y")));
        assert_eq!(cached.cached(), 1);
    }

    /// `V(f) = W[f]` for anything that depends on `x`, with linearity in `x`
    struct Wrap<'a> {
        ns: &'a Namespace,
        x: Expr,
    }

    impl LinearTransform for Wrap<'_> {
        fn ns(&self) -> &Namespace {
            self.ns
        }
        fn is_constant(&self, e: &Expr) -> bool {
            !e.depends_on(&self.x)
        }
        fn visit(&mut self, e: &Expr) -> AlgebraResult<Expr> {
            linear_visit(self, e)
        }
        fn visit_leaf(&mut self, e: &Expr) -> AlgebraResult<Expr> {
            Ok(Expr::undefined("W", vec![e.clone()]))
        }
    }

    #[test]
    fn test_linear_visit() {
        let ns = Namespace::standard();
        let (x, a) = (Expr::var("x"), Expr::var("a"));
        let mut w = Wrap { ns: &ns, x: x.clone() };
        let f = Expr::sum([a.clone() * x.pow(2), x.clone()]);
        let expected = Expr::sum([
            a.clone() * Expr::undefined("W", vec![x.pow(2)]),
            Expr::undefined("W", vec![x.clone()]),
        ]);
        assert_eq!(w.visit(&f).unwrap(), expected);

        // (a*x)^2 = a^2 * W[x^2]
        let scaled = (a.clone() * x.clone()).pow(2);
        let r = evaluate(&w.visit(&scaled).unwrap(), &ns);
        assert_eq!(r, evaluate(&(a.pow(2) * Expr::undefined("W", vec![x.pow(2)])), &ns));
    }
}
