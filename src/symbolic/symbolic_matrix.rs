//! # Symbolic matrices
//!
//! `M x N` matrices of expressions with the usual algebra: sums, differences and products of
//! matrices, the same with a scalar expression on either side, negation, the identity and
//! integer powers. Negative powers go through the inverse, computed by Gauss-Jordan
//! elimination with every intermediate entry evaluated.
//!
//! The operators build canonical expressions but do not evaluate them; call
//! [`ExprMatrix::evaluate`] to collect like terms. Mismatched dimensions in an operator are a
//! programming error and panic, as in nalgebra.
use crate::symbolic::evaluate::{evaluate, evaluate_all};
use crate::symbolic::match_context::Bindings;
use crate::symbolic::namespace::Namespace;
use crate::symbolic::substitution::bindings_from_arrows;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_engine_derivatives::jacobian;
use crate::symbolic::symbolic_errors::{AlgebraError, AlgebraResult};
use log::debug;
use std::fmt;
use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};

#[derive(Clone, Debug, PartialEq)]
pub struct ExprMatrix {
    pub data: Vec<Vec<Expr>>,
    pub nrows: usize,
    pub ncols: usize,
}

impl ExprMatrix {
    /// Matrix from its rows, which must all have the same length.
    pub fn new(data: Vec<Vec<Expr>>) -> Self {
        let nrows = data.len();
        let ncols = data.first().map_or(0, |r| r.len());
        for row in &data {
            assert_eq!(row.len(), ncols, "All rows must have the same length");
        }
        Self { data, nrows, ncols }
    }

    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![vec![Expr::zero(); ncols]; nrows],
            nrows,
            ncols,
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = ExprMatrix::zeros(size, size);
        for i in 0..size {
            m.data[i][i] = Expr::one();
        }
        m
    }

    /// `J[i][j] = d functions[i] / d variables[j]`
    pub fn jacobian(functions: &[Expr], variables: &[Expr], ns: &Namespace) -> AlgebraResult<Self> {
        Ok(ExprMatrix::new(jacobian(functions, variables, ns)?))
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// row `i` as a `1 x N` matrix
    pub fn row(&self, i: usize) -> ExprMatrix {
        assert!(i < self.nrows, "Row index out of bounds");
        ExprMatrix::new(vec![self.data[i].clone()])
    }

    /// column `j` as an `M x 1` matrix
    pub fn column(&self, j: usize) -> ExprMatrix {
        assert!(j < self.ncols, "Column index out of bounds");
        ExprMatrix::new(self.data.iter().map(|r| vec![r[j].clone()]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = ExprMatrix> + '_ {
        (0..self.nrows).map(|i| self.row(i))
    }
    pub fn columns(&self) -> impl Iterator<Item = ExprMatrix> + '_ {
        (0..self.ncols).map(|j| self.column(j))
    }

    /// element `i` of a row or column vector
    pub fn element(&self, i: usize) -> AlgebraResult<&Expr> {
        let e = if self.nrows == 1 {
            self.data[0].get(i)
        } else if self.ncols == 1 {
            self.data.get(i).map(|r| &r[0])
        } else {
            return Err(AlgebraError::InvalidArgument(format!(
                "a {}x{} matrix is not a vector",
                self.nrows, self.ncols
            )));
        };
        e.ok_or_else(|| AlgebraError::InvalidArgument(format!("vector index {} out of bounds", i)))
    }

    pub fn map<F>(&self, f: F) -> ExprMatrix
    where
        F: Fn(&Expr) -> Expr,
    {
        ExprMatrix::new(self.data.iter().map(|row| row.iter().map(&f).collect()).collect())
    }

    pub fn evaluate(&self, ns: &Namespace) -> ExprMatrix {
        self.evaluate_with(&Bindings::new(), ns)
    }

    /// every entry evaluated after substituting the `x -> value` arrows
    pub fn evaluate_at(&self, arrows: &[Expr], ns: &Namespace) -> ExprMatrix {
        self.evaluate_with(&bindings_from_arrows(arrows), ns)
    }

    fn evaluate_with(&self, bindings: &Bindings, ns: &Namespace) -> ExprMatrix {
        let data = self
            .data
            .iter()
            .map(|row| evaluate_all(row, bindings, ns))
            .collect();
        ExprMatrix::new(data)
    }

    fn scale_row(&mut self, i: usize, s: &Expr, ns: &Namespace) {
        for e in self.data[i].iter_mut() {
            *e = evaluate(&(e.clone() * s.clone()), ns);
        }
    }

    /// `row[target] += s * row[source]`
    fn scale_add_row(&mut self, source: usize, s: &Expr, target: usize, ns: &Namespace) {
        for j in 0..self.ncols {
            let added = self.data[target][j].clone() + self.data[source][j].clone() * s.clone();
            self.data[target][j] = evaluate(&added, ns);
        }
    }

    /// Inverse by Gauss-Jordan elimination, `[A I] ~ [I A^-1]`. A pivot is taken as nonzero
    /// unless it evaluates to the constant `0`.
    pub fn inverse(&self, ns: &Namespace) -> AlgebraResult<ExprMatrix> {
        if !self.is_square() {
            return Err(AlgebraError::InvalidArgument(format!(
                "cannot invert a {}x{} matrix",
                self.nrows, self.ncols
            )));
        }
        let n = self.nrows;
        let mut a = self.evaluate(ns);
        let mut inv = ExprMatrix::identity(n);
        for i in 0..n {
            let p = (i..n)
                .find(|&p| !a.data[p][i].equals_zero())
                .ok_or_else(|| AlgebraError::InvalidArgument("singular matrix".to_string()))?;
            a.data.swap(i, p);
            inv.data.swap(i, p);

            let s = evaluate(&Expr::inverse(a.data[i][i].clone()), ns);
            a.scale_row(i, &s, ns);
            inv.scale_row(i, &s, ns);

            for p in (0..n).filter(|&p| p != i) {
                let f = evaluate(&-a.data[p][i].clone(), ns);
                a.scale_add_row(i, &f, p, ns);
                inv.scale_add_row(i, &f, p, ns);
            }
        }
        debug!("inverted a {}x{} matrix", n, n);
        Ok(inv)
    }

    /// `A^n` for any integer `n`; `A^0` is the identity and negative powers invert `A`
    pub fn pow(&self, n: i32, ns: &Namespace) -> AlgebraResult<ExprMatrix> {
        if !self.is_square() {
            return Err(AlgebraError::InvalidArgument(format!(
                "power of a non-square {}x{} matrix",
                self.nrows, self.ncols
            )));
        }
        let base = if n < 0 { self.inverse(ns)? } else { self.evaluate(ns) };
        let mut result = ExprMatrix::identity(self.nrows);
        for _ in 0..n.unsigned_abs() {
            result = (result * base.clone()).evaluate(ns);
        }
        Ok(result)
    }
}

impl Index<(usize, usize)> for ExprMatrix {
    type Output = Expr;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        &self.data[i][j]
    }
}

impl IndexMut<(usize, usize)> for ExprMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        &mut self.data[i][j]
    }
}

impl fmt::Display for ExprMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for row in &self.data {
            let row: Vec<String> = row.iter().map(|e| e.to_string()).collect();
            write!(f, "[{}]", row.join(", "))?;
        }
        write!(f, "]")
    }
}

fn zip_with(a: ExprMatrix, b: ExprMatrix, f: fn(Expr, Expr) -> Expr) -> ExprMatrix {
    assert_eq!(a.shape(), b.shape(), "Matrix dimensions must match");
    let data = a
        .data
        .into_iter()
        .zip(b.data)
        .map(|(ra, rb)| ra.into_iter().zip(rb).map(|(x, y)| f(x, y)).collect())
        .collect();
    ExprMatrix::new(data)
}

impl Add for ExprMatrix {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        zip_with(self, other, |x, y| x + y)
    }
}

impl Sub for ExprMatrix {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        zip_with(self, other, |x, y| x - y)
    }
}

impl Mul for ExprMatrix {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        assert_eq!(
            self.ncols, other.nrows,
            "Matrix dimensions incompatible for multiplication"
        );
        let data = (0..self.nrows)
            .map(|i| {
                (0..other.ncols)
                    .map(|j| {
                        Expr::sum(
                            (0..self.ncols)
                                .map(|k| &self.data[i][k] * &other.data[k][j])
                                .collect::<Vec<_>>(),
                        )
                    })
                    .collect()
            })
            .collect();
        ExprMatrix::new(data)
    }
}

impl Neg for ExprMatrix {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.map(|e| -e.clone())
    }
}

// scalar on the right
impl Add<Expr> for ExprMatrix {
    type Output = Self;

    fn add(self, scalar: Expr) -> Self::Output {
        self.map(|e| e + &scalar)
    }
}

impl Sub<Expr> for ExprMatrix {
    type Output = Self;

    fn sub(self, scalar: Expr) -> Self::Output {
        self.map(|e| e - &scalar)
    }
}

impl Mul<Expr> for ExprMatrix {
    type Output = Self;

    fn mul(self, scalar: Expr) -> Self::Output {
        self.map(|e| e * &scalar)
    }
}

// scalar on the left
impl Add<ExprMatrix> for Expr {
    type Output = ExprMatrix;

    fn add(self, matrix: ExprMatrix) -> Self::Output {
        matrix.map(|e| &self + e)
    }
}

impl Sub<ExprMatrix> for Expr {
    type Output = ExprMatrix;

    fn sub(self, matrix: ExprMatrix) -> Self::Output {
        matrix.map(|e| &self - e)
    }
}

impl Mul<ExprMatrix> for Expr {
    type Output = ExprMatrix;

    fn mul(self, matrix: ExprMatrix) -> Self::Output {
        matrix.map(|e| &self * e)
    }
}
