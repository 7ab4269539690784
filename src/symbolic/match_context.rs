use crate::symbolic::namespace::Namespace;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use std::collections::HashMap;

pub type Bindings = HashMap<Expr, Expr>;

/// Bindings of pattern variables collected while matching, with rollback.
///
/// Every binding is also recorded in a history list; [`MatchContext::try_match`] remembers
/// the history length and removes everything bound after it when the attempt fails.
pub struct MatchContext<'a> {
    bindings: Bindings,
    history: Vec<Expr>,
    ns: &'a Namespace,
}

impl<'a> MatchContext<'a> {
    pub fn new(ns: &'a Namespace) -> MatchContext<'a> {
        MatchContext {
            bindings: HashMap::new(),
            history: Vec::new(),
            ns,
        }
    }

    /// context with `left -> right` arrows already bound
    pub fn with_prematch(prematch: &[Expr], ns: &'a Namespace) -> AlgebraResult<MatchContext<'a>> {
        let mut ctx = MatchContext::new(ns);
        for arrow in prematch {
            let (l, r) = arrow.as_arrow().ok_or_else(|| {
                AlgebraError::InvalidArgument(format!("{} is not an arrow", arrow))
            })?;
            if !ctx.matches(l, r) {
                return Err(AlgebraError::InvalidArgument(format!(
                    "conflicting pre-match for {}",
                    l
                )));
            }
        }
        Ok(ctx)
    }

    pub fn ns(&self) -> &'a Namespace {
        self.ns
    }

    /// Binds `key` to `value`, or checks that an existing binding equals `value`.
    pub fn matches(&mut self, key: &Expr, value: &Expr) -> bool {
        match self.bindings.get(key) {
            Some(bound) => bound == value,
            None => {
                self.bindings.insert(key.clone(), value.clone());
                self.history.push(key.clone());
                true
            }
        }
    }

    /// Runs `attempt`, rolling back every binding it made when it returns `false`.
    pub fn try_match(&mut self, attempt: impl FnOnce(&mut MatchContext<'a>) -> bool) -> bool {
        let mark = self.history.len();
        if attempt(self) {
            return true;
        }
        for key in self.history.drain(mark..) {
            self.bindings.remove(&key);
        }
        false
    }

    pub fn get(&self, key: &Expr) -> Option<&Expr> {
        self.bindings.get(key)
    }
    pub fn contains(&self, key: &Expr) -> bool {
        self.bindings.contains_key(key)
    }
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }
    pub fn into_bindings(self) -> Bindings {
        self.bindings
    }
}
