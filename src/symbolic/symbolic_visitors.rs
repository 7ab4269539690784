//! # Visitors
//!
//! Double dispatch over [`Node`] variants for the passes of the kernel.
//!
//! ## Main Structures and Methods
//!
//! - [`ExprVisitor`] - one method per variant; every method defaults to `visit_unknown`,
//!   `visit_power` defaults to `visit_binary`
//! - [`Outcome`] - result type of rewriting visitors: `Expr` (infallible), `Option<Expr>`
//!   (search, `None` propagates) or `Result<Expr, AlgebraError>`
//! - [`walk`] - identity preserving recursive rebuild; a node is rebuilt only when one of its
//!   children changed, otherwise the original `Arc` is returned
//! - [`CachedVisitor`] / [`visit_cached`] - memoization with an in-flight sentinel; a revisit of
//!   an in-flight node is routed to [`CachedVisitor::revisit`]
//! - [`depends_on`], [`cost`] - visitors used throughout the rule passes
use crate::symbolic::real::Real;
use crate::symbolic::symbolic_engine::{BinaryOp, Expr, Node, UnaryOp, Variable};
use crate::symbolic::symbolic_errors::AlgebraError;
use crate::symbolic::symbolic_functions::Function;
use std::collections::HashMap;
use std::sync::Arc;

pub trait ExprVisitor {
    type Output;

    fn visit(&mut self, e: &Expr) -> Self::Output {
        dispatch(self, e)
    }
    fn visit_unknown(&mut self, e: &Expr) -> Self::Output;

    fn visit_constant(&mut self, e: &Expr, _value: &Real) -> Self::Output {
        self.visit_unknown(e)
    }
    fn visit_variable(&mut self, e: &Expr, _variable: &Variable) -> Self::Output {
        self.visit_unknown(e)
    }
    fn visit_sum(&mut self, e: &Expr, _terms: &[Expr]) -> Self::Output {
        self.visit_unknown(e)
    }
    fn visit_product(&mut self, e: &Expr, _factors: &[Expr]) -> Self::Output {
        self.visit_unknown(e)
    }
    fn visit_power(&mut self, e: &Expr, base: &Expr, exponent: &Expr) -> Self::Output {
        self.visit_binary(e, BinaryOp::Power, base, exponent)
    }
    fn visit_binary(
        &mut self,
        e: &Expr,
        _op: BinaryOp,
        _left: &Expr,
        _right: &Expr,
    ) -> Self::Output {
        self.visit_unknown(e)
    }
    fn visit_unary(&mut self, e: &Expr, _op: UnaryOp, _operand: &Expr) -> Self::Output {
        self.visit_unknown(e)
    }
    fn visit_call(&mut self, e: &Expr, _function: &Arc<Function>, _args: &[Expr]) -> Self::Output {
        self.visit_unknown(e)
    }
    fn visit_set(&mut self, e: &Expr, _members: &[Expr]) -> Self::Output {
        self.visit_unknown(e)
    }
}

/// routes `e` to the visitor method of its variant
pub fn dispatch<V: ExprVisitor + ?Sized>(v: &mut V, e: &Expr) -> V::Output {
    match e.node() {
        Node::Constant(r) => v.visit_constant(e, r),
        Node::Variable(x) => v.visit_variable(e, x),
        Node::Sum(terms) => v.visit_sum(e, terms),
        Node::Product(factors) => v.visit_product(e, factors),
        Node::Binary(BinaryOp::Power, b, x) => v.visit_power(e, b, x),
        Node::Binary(op, l, r) => v.visit_binary(e, *op, l, r),
        Node::Unary(op, o) => v.visit_unary(e, *op, o),
        Node::Call(f, args) => v.visit_call(e, f, args),
        Node::Set(members) => v.visit_set(e, members),
    }
}

/// Result of a rewriting visit. `into_result` splits it into the rewritten expression
/// or an abort value that must be propagated unchanged.
pub trait Outcome: Sized {
    fn from_expr(e: Expr) -> Self;
    fn into_result(self) -> Result<Expr, Self>;
}

impl Outcome for Expr {
    fn from_expr(e: Expr) -> Self {
        e
    }
    fn into_result(self) -> Result<Expr, Self> {
        Ok(self)
    }
}

impl Outcome for Option<Expr> {
    fn from_expr(e: Expr) -> Self {
        Some(e)
    }
    fn into_result(self) -> Result<Expr, Self> {
        self.ok_or(None)
    }
}

impl Outcome for Result<Expr, AlgebraError> {
    fn from_expr(e: Expr) -> Self {
        Ok(e)
    }
    fn into_result(self) -> Result<Expr, Self> {
        match self {
            Ok(e) => Ok(e),
            Err(err) => Err(Err(err)),
        }
    }
}

fn visit_list<V>(v: &mut V, list: &[Expr]) -> Result<Option<Vec<Expr>>, V::Output>
where
    V: ExprVisitor + ?Sized,
    V::Output: Outcome,
{
    let mut rebuilt: Option<Vec<Expr>> = None;
    for (i, item) in list.iter().enumerate() {
        let visited = v.visit(item).into_result()?;
        if rebuilt.is_none() && !Expr::ptr_eq(&visited, item) {
            rebuilt = Some(list[..i].to_vec());
        }
        if let Some(r) = rebuilt.as_mut() {
            r.push(visited);
        }
    }
    Ok(rebuilt)
}

fn rebuild<V>(v: &mut V, e: &Expr) -> Result<Expr, V::Output>
where
    V: ExprVisitor + ?Sized,
    V::Output: Outcome,
{
    let rebuilt = match e.node() {
        Node::Sum(terms) => visit_list(v, terms)?.map(Expr::sum),
        Node::Product(factors) => visit_list(v, factors)?.map(Expr::product),
        Node::Set(members) => visit_list(v, members)?.map(Expr::set),
        Node::Call(f, args) => visit_list(v, args)?.map(|a| Expr::call(f.clone(), a)),
        Node::Binary(op, l, r) => {
            let nl = v.visit(l).into_result()?;
            let nr = v.visit(r).into_result()?;
            if Expr::ptr_eq(&nl, l) && Expr::ptr_eq(&nr, r) {
                None
            } else {
                Some(Expr::binary(*op, nl, nr))
            }
        }
        Node::Unary(op, o) => {
            let no = v.visit(o).into_result()?;
            if Expr::ptr_eq(&no, o) {
                None
            } else {
                Some(Expr::from_node(Node::Unary(*op, no)))
            }
        }
        Node::Constant(_) | Node::Variable(_) => None,
    };
    Ok(rebuilt.unwrap_or_else(|| e.clone()))
}

/// Visits the children of `e` and rebuilds it. Returns `e` itself when no child changed.
pub fn walk<V>(v: &mut V, e: &Expr) -> V::Output
where
    V: ExprVisitor + ?Sized,
    V::Output: Outcome,
{
    match rebuild(v, e) {
        Ok(x) => V::Output::from_expr(x),
        Err(abort) => abort,
    }
}

/// Memo of a cached visitor. `None` marks a node whose visit is in progress.
#[derive(Default, Debug)]
pub struct VisitCache {
    entries: HashMap<Expr, Option<Expr>>,
}

impl VisitCache {
    pub fn new() -> VisitCache {
        VisitCache::default()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub trait CachedVisitor: ExprVisitor {
    fn cache(&mut self) -> &mut VisitCache;
    /// called when `e` is reached again while its own visit is still running
    fn revisit(&mut self, e: &Expr) -> Self::Output;
}

/// the usual `revisit` for fallible passes
pub fn cycle_error(e: &Expr) -> Result<Expr, AlgebraError> {
    Err(AlgebraError::Cycle(e.to_string()))
}

/// Memoizing visit: returns the cached result, reports a revisit of an in-flight node, or
/// dispatches and stores the result. Aborted visits leave no cache entry.
pub fn visit_cached<V>(v: &mut V, e: &Expr) -> V::Output
where
    V: CachedVisitor + ?Sized,
    V::Output: Outcome,
{
    let cached = v.cache().entries.get(e).cloned();
    match cached {
        Some(Some(done)) => return V::Output::from_expr(done),
        Some(None) => return v.revisit(e),
        None => {}
    }
    v.cache().entries.insert(e.clone(), None);
    match dispatch(v, e).into_result() {
        Ok(result) => {
            v.cache().entries.insert(e.clone(), Some(result.clone()));
            V::Output::from_expr(result)
        }
        Err(abort) => {
            v.cache().entries.remove(e);
            abort
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              DEPENDS ON
////////////////////////////////////////////////////////////////////////////////////////////
struct DependsOnVisitor<'a> {
    targets: &'a [Expr],
}

impl ExprVisitor for DependsOnVisitor<'_> {
    type Output = Option<Expr>;
    fn visit(&mut self, e: &Expr) -> Option<Expr> {
        if self.targets.contains(e) {
            None
        } else {
            dispatch(self, e)
        }
    }
    fn visit_unknown(&mut self, e: &Expr) -> Option<Expr> {
        walk(self, e)
    }
}

/// `true` when `x` (or any member of `x` when it is a set) occurs in `f`
pub fn depends_on(f: &Expr, x: &Expr) -> bool {
    depends_on_any(f, x.members())
}

pub fn depends_on_any(f: &Expr, xs: &[Expr]) -> bool {
    if xs.is_empty() {
        return false;
    }
    DependsOnVisitor { targets: xs }.visit(f).is_none()
}

impl Expr {
    pub fn depends_on(&self, x: &Expr) -> bool {
        depends_on(self, x)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              COST
////////////////////////////////////////////////////////////////////////////////////////////
/// Complexity measure used to rank equivalent forms.
pub struct CostVisitor;

impl ExprVisitor for CostVisitor {
    type Output = usize;
    fn visit_unknown(&mut self, _e: &Expr) -> usize {
        1
    }
    fn visit_sum(&mut self, _e: &Expr, terms: &[Expr]) -> usize {
        terms.iter().map(|t| self.visit(t) + 1).sum::<usize>() - 1
    }
    fn visit_product(&mut self, _e: &Expr, factors: &[Expr]) -> usize {
        factors.iter().map(|t| self.visit(t) + 1).sum::<usize>() - 1
    }
    fn visit_binary(&mut self, _e: &Expr, _op: BinaryOp, l: &Expr, r: &Expr) -> usize {
        self.visit(l) + self.visit(r) + 1
    }
    fn visit_unary(&mut self, _e: &Expr, _op: UnaryOp, o: &Expr) -> usize {
        self.visit(o) + 1
    }
    fn visit_call(&mut self, _e: &Expr, _f: &Arc<Function>, args: &[Expr]) -> usize {
        args.iter().map(|a| self.visit(a)).sum::<usize>() + 5
    }
    fn visit_set(&mut self, _e: &Expr, members: &[Expr]) -> usize {
        members.iter().map(|m| self.visit(m)).sum()
    }
}

pub fn cost(e: &Expr) -> usize {
    CostVisitor.visit(e)
}
