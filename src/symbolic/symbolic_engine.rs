//! # Symbolic Engine Module
//!
//! Core expression type of the algebra kernel. Every expression is an immutable,
//! reference counted node that caches its structural hash, so cloning is cheap and
//! equal subtrees compare fast.
//!
//! ## Purpose
//!
//! - build expressions in canonical form (flattened, constant folded, sorted sums and products)
//! - provide a total order on expressions that defines the canonical term order
//! - give uniform access to terms, factors, set members, bases and exponents
//! - render expressions in the bracket call notation (`Sin[x]`, `{a, b}`, `x -> y`)
//!
//! ## Main Structures and Methods
//!
//! ### `Expr`
//! A cheap handle (`Arc`) to a [`Node`]:
//! - **Constant**: arbitrary precision [`Real`]
//! - **Variable**: a named symbol, optionally carrying a pattern condition
//! - **Sum / Product**: canonical n-ary nodes
//! - **Binary**: power, relations, logic, arrows (`x -> y`) and deferred substitution (`f : x -> y`)
//! - **Unary**: logical not
//! - **Call**: a resolved [`Function`] applied to arguments
//! - **Set**: sorted collection
//!
//! ### Key Methods
//! - `Expr::sum`, `Expr::product` - canonical constructors
//! - `Expr::power`, `Expr::call`, `Expr::binary`, `Expr::set` - raw constructors
//! - `terms()`, `factors()`, `members()` - uniform child access
//! - `compare()` - the canonical total order
//!
//! ## Interesting Code Features
//!
//! 1. **Hash consing lite**: the hash of a node is computed once from the cached hashes of its
//!    children, so hashing a deep tree is O(number of children).
//! 2. **Pointer fast path**: equality checks `Arc::ptr_eq` before any structural walk, which lets
//!    rewriting passes detect "nothing changed" in O(1).
//! 3. **Operator Overloading**: `std::ops` traits build canonical but unevaluated nodes,
//!    e.g. `a - b` is `a + (-1)*b` and `a / b` is `a * b^-1`.
use crate::symbolic::real::Real;
use crate::symbolic::symbolic_functions::{Callable, Function};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// predicate restricting what a pattern variable may bind to
pub type Condition = Arc<dyn Fn(&Expr) -> bool + Send + Sync>;

/// A named symbol. Two variables are the same symbol when their names are equal.
#[derive(Clone)]
pub struct Variable {
    name: Arc<str>,
    condition: Option<Condition>,
}

impl Variable {
    pub fn new(name: &str) -> Variable {
        Variable {
            name: Arc::from(name),
            condition: None,
        }
    }
    /// a pattern variable that only matches expressions accepted by `condition`
    pub fn with_condition(name: &str, condition: Condition) -> Variable {
        Variable {
            name: Arc::from(name),
            condition: Some(condition),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
    pub fn accepts(&self, e: &Expr) -> bool {
        self.condition.as_ref().is_none_or(|c| c(e))
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Variable) -> bool {
        self.name == other.name
    }
}
impl Eq for Variable {}
impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.condition.is_some() {
            write!(f, "{}?", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Binary operators. The declaration order is part of the canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOp {
    Power,
    And,
    Or,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    ApproxEqual,
    /// binding `x -> y`
    Arrow,
    /// deferred substitution `f : bindings`
    Substitute,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Power => "^",
            BinaryOp::And => " & ",
            BinaryOp::Or => " | ",
            BinaryOp::Equal => " == ",
            BinaryOp::NotEqual => " != ",
            BinaryOp::Greater => " > ",
            BinaryOp::Less => " < ",
            BinaryOp::GreaterEqual => " >= ",
            BinaryOp::LessEqual => " <= ",
            BinaryOp::ApproxEqual => " ~= ",
            BinaryOp::Arrow => " -> ",
            BinaryOp::Substitute => " : ",
        }
    }
    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Arrow | BinaryOp::Substitute => 1,
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Power => 9,
            _ => 4,
        }
    }
    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::Greater
                | BinaryOp::Less
                | BinaryOp::GreaterEqual
                | BinaryOp::LessEqual
                | BinaryOp::ApproxEqual
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnaryOp {
    Not,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    Constant(Real),
    Variable(Variable),
    Sum(Vec<Expr>),
    Product(Vec<Expr>),
    Binary(BinaryOp, Expr, Expr),
    Unary(UnaryOp, Expr),
    Call(Arc<Function>, Vec<Expr>),
    Set(Vec<Expr>),
}

struct Inner {
    node: Node,
    hash: u64,
}

/// Immutable, shared expression handle.
#[derive(Clone)]
pub struct Expr(Arc<Inner>);

impl Expr {
    pub fn from_node(node: Node) -> Expr {
        let mut hasher = DefaultHasher::new();
        node.hash(&mut hasher);
        Expr(Arc::new(Inner {
            hash: hasher.finish(),
            node,
        }))
    }
    pub fn node(&self) -> &Node {
        &self.0.node
    }
    /// `true` when both handles point to the same node
    pub fn ptr_eq(a: &Expr, b: &Expr) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    ////////////////////////////////////////////////////////////////////////////////////////
    //                              ATOMS
    ////////////////////////////////////////////////////////////////////////////////////////
    pub fn constant(value: Real) -> Expr {
        Expr::from_node(Node::Constant(value))
    }
    pub fn integer(i: i64) -> Expr {
        Expr::constant(Real::from_integer(i))
    }
    pub fn zero() -> Expr {
        Expr::integer(0)
    }
    pub fn one() -> Expr {
        Expr::integer(1)
    }
    /// exact rational constant, `None` for a zero denominator
    pub fn ratio(numer: i64, denom: i64) -> Option<Expr> {
        Real::ratio(numer, denom).map(Expr::constant)
    }
    /// boolean as the constants `1`/`0`
    pub fn boolean(b: bool) -> Expr {
        if b { Expr::one() } else { Expr::zero() }
    }
    pub fn var(name: &str) -> Expr {
        Expr::from_node(Node::Variable(Variable::new(name)))
    }
    /// pattern variable restricted by a condition
    pub fn pattern(name: &str, condition: impl Fn(&Expr) -> bool + Send + Sync + 'static) -> Expr {
        Expr::from_node(Node::Variable(Variable::with_condition(
            name,
            Arc::new(condition),
        )))
    }
    /// creates a vector of variables from a comma separated list of names
    pub fn symbols(symbols: &str) -> Vec<Expr> {
        symbols
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(Expr::var)
            .collect()
    }

    ////////////////////////////////////////////////////////////////////////////////////////
    //                              CANONICAL CONSTRUCTORS
    ////////////////////////////////////////////////////////////////////////////////////////
    /// Canonical sum: flattens nested sums, folds constants into one term, drops zero,
    /// sorts the terms and collapses empty and single-term sums.
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
        let mut flat = Vec::new();
        let mut constant = Real::zero();
        for t in terms {
            match t.node() {
                Node::Sum(inner) => {
                    for i in inner {
                        match i.as_real() {
                            Some(r) => constant = &constant + r,
                            None => flat.push(i.clone()),
                        }
                    }
                }
                Node::Constant(r) => constant = &constant + r,
                _ => flat.push(t),
            }
        }
        if !constant.is_zero() {
            flat.push(Expr::constant(constant));
        }
        flat.sort();
        match flat.len() {
            0 => Expr::zero(),
            1 => flat.pop().unwrap_or_else(Expr::zero),
            _ => Expr::from_node(Node::Sum(flat)),
        }
    }

    /// Canonical product: flattens nested products, multiplies constants together,
    /// returns `0` when a zero constant is present, drops `1` and sorts the factors.
    pub fn product<I: IntoIterator<Item = Expr>>(factors: I) -> Expr {
        let mut flat = Vec::new();
        let mut constant = Real::one();
        for t in factors {
            match t.node() {
                Node::Product(inner) => {
                    for i in inner {
                        match i.as_real() {
                            Some(r) => constant = &constant * r,
                            None => flat.push(i.clone()),
                        }
                    }
                }
                Node::Constant(r) => constant = &constant * r,
                _ => flat.push(t),
            }
        }
        if constant.is_zero() {
            return Expr::zero();
        }
        if !constant.is_one() {
            flat.push(Expr::constant(constant));
        }
        flat.sort();
        match flat.len() {
            0 => Expr::one(),
            1 => flat.pop().unwrap_or_else(Expr::one),
            _ => Expr::from_node(Node::Product(flat)),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::from_node(Node::Binary(op, left, right))
    }
    pub fn power(base: Expr, exponent: Expr) -> Expr {
        Expr::binary(BinaryOp::Power, base, exponent)
    }
    pub fn arrow(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Arrow, left, right)
    }
    pub fn equal(left: Expr, right: Expr) -> Expr {
        Expr::binary(BinaryOp::Equal, left, right)
    }
    /// `f : bindings`, substitution that is applied when the node is evaluated
    pub fn substitute_later(f: Expr, bindings: Expr) -> Expr {
        Expr::binary(BinaryOp::Substitute, f, bindings)
    }
    pub fn not(operand: Expr) -> Expr {
        Expr::from_node(Node::Unary(UnaryOp::Not, operand))
    }
    pub fn call(function: Arc<Function>, args: Vec<Expr>) -> Expr {
        Expr::from_node(Node::Call(function, args))
    }
    /// set with members in canonical order, duplicates removed
    pub fn set<I: IntoIterator<Item = Expr>>(members: I) -> Expr {
        let mut members: Vec<Expr> = members.into_iter().collect();
        members.sort();
        members.dedup();
        Expr::from_node(Node::Set(members))
    }

    pub fn negate(x: Expr) -> Expr {
        Expr::product([Expr::integer(-1), x])
    }
    pub fn inverse(x: Expr) -> Expr {
        Expr::power(x, Expr::integer(-1))
    }
    pub fn subtract(a: Expr, b: Expr) -> Expr {
        Expr::sum([a, Expr::negate(b)])
    }
    pub fn divide(a: Expr, b: Expr) -> Expr {
        Expr::product([a, Expr::inverse(b)])
    }
    pub fn pow(&self, exponent: impl Into<Expr>) -> Expr {
        Expr::power(self.clone(), exponent.into())
    }

    ////////////////////////////////////////////////////////////////////////////////////////
    //                              ACCESSORS
    ////////////////////////////////////////////////////////////////////////////////////////
    pub fn as_real(&self) -> Option<&Real> {
        match self.node() {
            Node::Constant(r) => Some(r),
            _ => None,
        }
    }
    pub fn as_variable(&self) -> Option<&Variable> {
        match self.node() {
            Node::Variable(v) => Some(v),
            _ => None,
        }
    }
    pub fn as_binary(&self) -> Option<(BinaryOp, &Expr, &Expr)> {
        match self.node() {
            Node::Binary(op, l, r) => Some((*op, l, r)),
            _ => None,
        }
    }
    fn as_op(&self, wanted: BinaryOp) -> Option<(&Expr, &Expr)> {
        match self.node() {
            Node::Binary(op, l, r) if *op == wanted => Some((l, r)),
            _ => None,
        }
    }
    pub fn as_power(&self) -> Option<(&Expr, &Expr)> {
        self.as_op(BinaryOp::Power)
    }
    pub fn as_arrow(&self) -> Option<(&Expr, &Expr)> {
        self.as_op(BinaryOp::Arrow)
    }
    pub fn as_equal(&self) -> Option<(&Expr, &Expr)> {
        self.as_op(BinaryOp::Equal)
    }
    pub fn as_call(&self) -> Option<(&Arc<Function>, &[Expr])> {
        match self.node() {
            Node::Call(f, args) => Some((f, args.as_slice())),
            _ => None,
        }
    }
    /// name of the called function, if this is a call
    pub fn call_name(&self) -> Option<&str> {
        self.as_call().map(|(f, _)| f.name())
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.node(), Node::Constant(_))
    }
    pub fn is_variable(&self) -> bool {
        matches!(self.node(), Node::Variable(_))
    }
    pub fn is_sum(&self) -> bool {
        matches!(self.node(), Node::Sum(_))
    }
    pub fn is_product(&self) -> bool {
        matches!(self.node(), Node::Product(_))
    }
    pub fn is_power(&self) -> bool {
        self.as_power().is_some()
    }
    pub fn is_call(&self) -> bool {
        matches!(self.node(), Node::Call(..))
    }
    pub fn is_set(&self) -> bool {
        matches!(self.node(), Node::Set(_))
    }
    pub fn equals_zero(&self) -> bool {
        self.as_real().is_some_and(|r| r.is_zero())
    }
    pub fn equals_one(&self) -> bool {
        self.as_real().is_some_and(|r| r.is_one())
    }
    /// a constant other than zero
    pub fn is_true(&self) -> bool {
        self.as_real().is_some_and(|r| !r.is_zero())
    }
    pub fn is_false(&self) -> bool {
        self.equals_zero()
    }

    /// terms of a sum, or the expression itself
    pub fn terms(&self) -> &[Expr] {
        match self.node() {
            Node::Sum(t) => t,
            _ => std::slice::from_ref(self),
        }
    }
    /// factors of a product, or the expression itself
    pub fn factors(&self) -> &[Expr] {
        match self.node() {
            Node::Product(f) => f,
            _ => std::slice::from_ref(self),
        }
    }
    /// members of a set, or the expression itself
    pub fn members(&self) -> &[Expr] {
        match self.node() {
            Node::Set(m) => m,
            _ => std::slice::from_ref(self),
        }
    }

    /// base of a power, or the expression itself
    pub fn base_of(&self) -> &Expr {
        self.as_power().map(|(b, _)| b).unwrap_or(self)
    }
    /// exponent of a power, or `1`
    pub fn exponent_of(&self) -> Expr {
        self.as_power()
            .map(|(_, e)| e.clone())
            .unwrap_or_else(Expr::one)
    }
    /// integer exponent of a power, `1` for non-powers and non-integral exponents
    pub fn integral_exponent_of(&self) -> i64 {
        match self.as_power() {
            Some((_, e)) => e.as_real().and_then(|r| r.to_i64()).unwrap_or(1),
            None => 1,
        }
    }
    fn has_negative_exponent(&self) -> bool {
        self.as_power()
            .and_then(|(_, e)| e.as_real())
            .is_some_and(|r| r.is_negative())
    }
    /// product of the factors that are not powers with a negative constant exponent
    pub fn numerator(&self) -> Expr {
        Expr::product(
            self.factors()
                .iter()
                .filter(|f| !f.has_negative_exponent())
                .cloned(),
        )
    }
    /// product of the reciprocals of the factors with a negative constant exponent
    pub fn denominator(&self) -> Expr {
        Expr::product(self.factors().iter().filter_map(|f| {
            let (b, e) = f.as_power()?;
            let r = e.as_real()?;
            if !r.is_negative() {
                return None;
            }
            let flipped = -r;
            Some(if flipped.is_one() {
                b.clone()
            } else {
                Expr::power(b.clone(), Expr::constant(flipped))
            })
        }))
    }

    ////////////////////////////////////////////////////////////////////////////////////////
    //                              ORDERING
    ////////////////////////////////////////////////////////////////////////////////////////
    fn kind_rank(&self) -> u8 {
        match self.node() {
            Node::Constant(_) => 0,
            Node::Variable(_) => 1,
            Node::Call(..) => 2,
            Node::Binary(..) => 3,
            Node::Unary(..) => 4,
            Node::Set(_) => 5,
            Node::Sum(_) => 6,
            Node::Product(_) => 7,
        }
    }

    /// The canonical total order.
    pub fn compare(a: &Expr, b: &Expr) -> Ordering {
        if Expr::ptr_eq(a, b) {
            return Ordering::Equal;
        }
        if a.is_sum() || b.is_sum() {
            return compare_lists(a.terms(), b.terms());
        }
        if a.is_product() || b.is_product() {
            return compare_lists(a.factors(), b.factors());
        }
        if a.is_power() || b.is_power() {
            let (ea, eb) = (a.exponent_of(), b.exponent_of());
            return Expr::compare(a.base_of(), b.base_of())
                .then_with(|| Expr::compare(&ea, &eb))
                .then_with(|| a.is_power().cmp(&b.is_power()));
        }
        let by_kind = a.kind_rank().cmp(&b.kind_rank());
        if by_kind != Ordering::Equal {
            return by_kind;
        }
        match (a.node(), b.node()) {
            (Node::Constant(x), Node::Constant(y)) => y.abs().cmp(&x.abs()).then_with(|| x.cmp(y)),
            (Node::Variable(x), Node::Variable(y)) => x.name().cmp(y.name()),
            (Node::Call(f, fa), Node::Call(g, ga)) => f
                .name()
                .cmp(g.name())
                .then_with(|| f.arity().cmp(&g.arity()))
                .then_with(|| compare_lists(fa, ga)),
            (Node::Binary(o1, l1, r1), Node::Binary(o2, l2, r2)) => o1
                .cmp(o2)
                .then_with(|| Expr::compare(l1, l2))
                .then_with(|| Expr::compare(r1, r2)),
            (Node::Unary(o1, x), Node::Unary(o2, y)) => {
                o1.cmp(o2).then_with(|| Expr::compare(x, y))
            }
            (Node::Set(x), Node::Set(y)) => compare_lists(x, y),
            _ => Ordering::Equal,
        }
    }
}

fn compare_lists(a: &[Expr], b: &[Expr]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let c = Expr::compare(x, y);
        if c != Ordering::Equal {
            return c;
        }
    }
    a.len().cmp(&b.len())
}

impl PartialEq for Expr {
    fn eq(&self, other: &Expr) -> bool {
        Expr::ptr_eq(self, other) || (self.0.hash == other.0.hash && self.0.node == other.0.node)
    }
}
impl Eq for Expr {}
impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}
impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Expr) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Expr {
    fn cmp(&self, other: &Expr) -> Ordering {
        Expr::compare(self, other)
    }
}

impl From<i64> for Expr {
    fn from(i: i64) -> Expr {
        Expr::integer(i)
    }
}
impl From<i32> for Expr {
    fn from(i: i32) -> Expr {
        Expr::integer(i as i64)
    }
}
impl From<Real> for Expr {
    fn from(r: Real) -> Expr {
        Expr::constant(r)
    }
}
impl TryFrom<f64> for Expr {
    type Error = crate::symbolic::symbolic_errors::AlgebraError;
    fn try_from(x: f64) -> Result<Expr, Self::Error> {
        Real::from_f64(x).map(Expr::constant).ok_or_else(|| {
            crate::symbolic::symbolic_errors::AlgebraError::InvalidArgument(format!(
                "{} is not a finite number",
                x
            ))
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              OPERATORS
////////////////////////////////////////////////////////////////////////////////////////////
impl std::ops::Add for Expr {
    type Output = Expr;
    fn add(self, rhs: Expr) -> Expr {
        Expr::sum([self, rhs])
    }
}
impl std::ops::Add for &Expr {
    type Output = Expr;
    fn add(self, rhs: &Expr) -> Expr {
        Expr::sum([self.clone(), rhs.clone()])
    }
}
impl std::ops::Add<i64> for Expr {
    type Output = Expr;
    fn add(self, rhs: i64) -> Expr {
        Expr::sum([self, Expr::integer(rhs)])
    }
}
impl std::ops::Sub for Expr {
    type Output = Expr;
    fn sub(self, rhs: Expr) -> Expr {
        Expr::subtract(self, rhs)
    }
}
impl std::ops::Sub for &Expr {
    type Output = Expr;
    fn sub(self, rhs: &Expr) -> Expr {
        Expr::subtract(self.clone(), rhs.clone())
    }
}
impl std::ops::Sub<i64> for Expr {
    type Output = Expr;
    fn sub(self, rhs: i64) -> Expr {
        Expr::sum([self, Expr::integer(-rhs)])
    }
}
impl std::ops::Mul for Expr {
    type Output = Expr;
    fn mul(self, rhs: Expr) -> Expr {
        Expr::product([self, rhs])
    }
}
impl std::ops::Mul for &Expr {
    type Output = Expr;
    fn mul(self, rhs: &Expr) -> Expr {
        Expr::product([self.clone(), rhs.clone()])
    }
}
impl std::ops::Mul<i64> for Expr {
    type Output = Expr;
    fn mul(self, rhs: i64) -> Expr {
        Expr::product([self, Expr::integer(rhs)])
    }
}
impl std::ops::Div for Expr {
    type Output = Expr;
    fn div(self, rhs: Expr) -> Expr {
        Expr::divide(self, rhs)
    }
}
impl std::ops::Div for &Expr {
    type Output = Expr;
    fn div(self, rhs: &Expr) -> Expr {
        Expr::divide(self.clone(), rhs.clone())
    }
}
impl std::ops::Div<i64> for Expr {
    type Output = Expr;
    fn div(self, rhs: i64) -> Expr {
        Expr::divide(self, Expr::integer(rhs))
    }
}
impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::negate(self)
    }
}
impl std::ops::Neg for &Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::negate(self.clone())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////
//                              DISPLAY
////////////////////////////////////////////////////////////////////////////////////////////
const ATOM: u8 = 10;

fn precedence(e: &Expr) -> u8 {
    match e.node() {
        Node::Binary(op, ..) => op.precedence(),
        Node::Sum(_) => 5,
        Node::Product(_) => 6,
        Node::Unary(..) => 7,
        Node::Constant(r) if r.is_negative() || !r.is_integer() => 6,
        _ => ATOM,
    }
}

fn write_child(f: &mut fmt::Formatter<'_>, child: &Expr, min: u8) -> fmt::Result {
    if precedence(child) < min {
        write!(f, "({})", child)
    } else {
        write!(f, "{}", child)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// term that prints with a leading minus
fn is_negative_term(t: &Expr) -> bool {
    t.factors()
        .iter()
        .any(|f| f.as_real().is_some_and(|r| r.is_negative()))
}

fn write_product(f: &mut fmt::Formatter<'_>, factors: &[Expr]) -> fmt::Result {
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    let mut negative = false;
    for factor in factors {
        if let Some(r) = factor.as_real() {
            if r.is_negative() {
                negative = !negative;
                let magnitude = r.abs();
                if !magnitude.is_one() {
                    numerator.push(Expr::constant(magnitude));
                }
                continue;
            }
        }
        if factor.has_negative_exponent() {
            denominator.push(factor.clone());
        } else {
            numerator.push(factor.clone());
        }
    }
    let denominator = Expr::product(denominator).denominator();
    if negative {
        write!(f, "-")?;
    }
    if numerator.is_empty() {
        write!(f, "1")?;
    }
    for (i, n) in numerator.iter().enumerate() {
        if i > 0 {
            write!(f, "*")?;
        }
        write_child(f, n, 7)?;
    }
    if !denominator.equals_one() {
        write!(f, "/")?;
        write_child(f, &denominator, 7)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Constant(r) => write!(f, "{}", r),
            Node::Variable(v) => write!(f, "{}", v.name()),
            Node::Sum(terms) => {
                for (i, t) in terms.iter().enumerate() {
                    if i == 0 {
                        write_child(f, t, 6)?;
                    } else if is_negative_term(t) {
                        write!(f, " - ")?;
                        write_child(f, &Expr::negate(t.clone()), 6)?;
                    } else {
                        write!(f, " + ")?;
                        write_child(f, t, 6)?;
                    }
                }
                Ok(())
            }
            Node::Product(factors) => write_product(f, factors),
            Node::Binary(op, l, r) => {
                let p = op.precedence();
                if *op == BinaryOp::Power {
                    write_child(f, l, ATOM)?;
                    write!(f, "^")?;
                    write_child(f, r, ATOM)
                } else {
                    write_child(f, l, p)?;
                    write!(f, "{}", op.symbol())?;
                    write_child(f, r, p + 1)
                }
            }
            Node::Unary(UnaryOp::Not, o) => {
                write!(f, "!")?;
                write_child(f, o, 7)
            }
            Node::Call(func, args) => {
                write!(f, "{}[", func.name())?;
                write_list(f, args)?;
                write!(f, "]")
            }
            Node::Set(members) => {
                write!(f, "{{")?;
                write_list(f, members)?;
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
