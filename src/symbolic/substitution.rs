//! # Substitution
//!
//! Simultaneous replacement of subexpressions. A node that is a key of the bindings is
//! replaced and the replacement is not visited again, so `x -> x + 1` is applied once.
//!
//! Functions may mark parameters as non-substitutable (`D[f, x]` must not see `x -> 0`
//! before differentiating). Outside of transform mode, a binding whose key is such an
//! argument is held back and the call is wrapped as `call : bindings`; evaluating that node
//! applies the held bindings after the call has been evaluated.
use crate::symbolic::match_context::Bindings;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_functions::{Callable, Function};
use crate::symbolic::symbolic_visitors::{ExprVisitor, walk};
use std::collections::HashMap;
use std::sync::Arc;

struct SubstituteVisitor<'a> {
    bindings: &'a Bindings,
    transform: bool,
}

impl ExprVisitor for SubstituteVisitor<'_> {
    type Output = Expr;
    fn visit(&mut self, e: &Expr) -> Expr {
        match self.bindings.get(e) {
            Some(value) => value.clone(),
            None => crate::symbolic::symbolic_visitors::dispatch(self, e),
        }
    }
    fn visit_unknown(&mut self, e: &Expr) -> Expr {
        walk(self, e)
    }
    fn visit_call(&mut self, e: &Expr, f: &Arc<Function>, args: &[Expr]) -> Expr {
        if self.transform {
            return walk(self, e);
        }
        let mut late: Vec<Expr> = Vec::new();
        let mut now = self.bindings.clone();
        for (i, a) in args.iter().enumerate() {
            if f.is_deferred(i) {
                if let Some(value) = now.remove(a) {
                    late.push(Expr::arrow(a.clone(), value));
                }
            }
        }
        if late.is_empty() {
            return walk(self, e);
        }
        let rebuilt = substitute(e, &now, false);
        let held = if late.len() == 1 {
            late.remove(0)
        } else {
            Expr::set(late)
        };
        Expr::substitute_later(rebuilt, held)
    }
}

/// Replaces every key of `bindings` found in `f`. In transform mode substitutions are never
/// deferred.
pub fn substitute(f: &Expr, bindings: &Bindings, transform: bool) -> Expr {
    if bindings.is_empty() {
        return f.clone();
    }
    SubstituteVisitor {
        bindings,
        transform,
    }
    .visit(f)
}

/// bindings from `left -> right` arrows, other expressions are ignored
pub fn bindings_from_arrows(arrows: &[Expr]) -> Bindings {
    arrows
        .iter()
        .filter_map(|a| a.as_arrow())
        .map(|(l, r)| (l.clone(), r.clone()))
        .collect::<HashMap<Expr, Expr>>()
}

impl Expr {
    pub fn substitute(&self, bindings: &Bindings) -> Expr {
        substitute(self, bindings, false)
    }
    pub fn substitute_one(&self, x: &Expr, value: &Expr) -> Expr {
        let bindings: Bindings = HashMap::from([(x.clone(), value.clone())]);
        substitute(self, &bindings, false)
    }
}
