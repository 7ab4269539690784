//! # Namespace
//!
//! Name resolution for values and functions. A name may be overloaded; resolution succeeds
//! only when exactly one candidate fits. Every operation of the kernel receives its
//! namespace explicitly; [`Namespace::global`] is a read-only default built once.
use crate::symbolic::builtins;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use crate::symbolic::symbolic_functions::{Callable, ExprFunction, Function, LutFunction};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

#[derive(Clone, Debug)]
pub enum Member {
    Value(Expr),
    Function(Arc<Function>),
}

#[derive(Clone, Debug, Default)]
pub struct Namespace {
    members: HashMap<String, Vec<Member>>,
}

static GLOBAL: OnceLock<Namespace> = OnceLock::new();

impl Namespace {
    /// empty namespace
    pub fn new() -> Namespace {
        Namespace::default()
    }

    /// namespace with the built-in functions and constants
    pub fn standard() -> Namespace {
        let mut ns = Namespace::new();
        builtins::register(&mut ns);
        ns
    }

    /// process-wide standard namespace
    pub fn global() -> &'static Namespace {
        GLOBAL.get_or_init(Namespace::standard)
    }

    pub fn add_value(&mut self, name: &str, value: Expr) {
        self.members
            .entry(name.to_string())
            .or_default()
            .push(Member::Value(value));
    }

    /// registers a function under its own name and returns the shared handle
    pub fn add_function(&mut self, f: Function) -> Arc<Function> {
        let f = Arc::new(f);
        self.members
            .entry(f.name().to_string())
            .or_default()
            .push(Member::Function(f.clone()));
        f
    }

    /// `name[params] = body`
    pub fn define(&mut self, name: &str, params: Vec<Expr>, body: Expr) -> Arc<Function> {
        self.add_function(Function::ExprFunction(ExprFunction::new(name, params, body)))
    }

    pub fn add_table(&mut self, name: &str, points: Vec<(f64, f64)>) -> AlgebraResult<Arc<Function>> {
        Ok(self.add_function(Function::LutFunction(LutFunction::new(name, points)?)))
    }

    pub fn lookup(&self, name: &str) -> &[Member] {
        self.members.get(name).map(|m| m.as_slice()).unwrap_or(&[])
    }

    /// the single member called `name`
    pub fn resolve(&self, name: &str) -> AlgebraResult<&Member> {
        match self.lookup(name) {
            [single] => Ok(single),
            [] => Err(AlgebraError::UnresolvedName(name.to_string())),
            many => Err(AlgebraError::UnresolvedName(format!(
                "{} is ambiguous ({} candidates)",
                name,
                many.len()
            ))),
        }
    }

    pub fn resolve_value(&self, name: &str) -> AlgebraResult<Expr> {
        match self.resolve(name)? {
            Member::Value(v) => Ok(v.clone()),
            Member::Function(_) => Err(AlgebraError::UnresolvedName(format!(
                "{} is a function",
                name
            ))),
        }
    }

    /// the single function called `name` that accepts `args`
    pub fn resolve_function(&self, name: &str, args: &[Expr]) -> AlgebraResult<Arc<Function>> {
        let candidates: Vec<&Arc<Function>> = self
            .lookup(name)
            .iter()
            .filter_map(|m| match m {
                Member::Function(f) if f.can_call(args) => Some(f),
                _ => None,
            })
            .collect();
        match candidates.as_slice() {
            [single] => Ok((*single).clone()),
            other => {
                debug!(
                    "cannot resolve {}/{}: {} candidates",
                    name,
                    args.len(),
                    other.len()
                );
                Err(AlgebraError::UnresolvedName(format!("{}/{}", name, args.len())))
            }
        }
    }

    /// `name[args]`, unevaluated
    pub fn call(&self, name: &str, args: Vec<Expr>) -> AlgebraResult<Expr> {
        let f = self.resolve_function(name, &args)?;
        Ok(Expr::call(f, args))
    }
}
