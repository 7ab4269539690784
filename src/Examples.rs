//! examples of usage of RustedCAS
/// Nonlinear equations examples
pub mod nonlinear_eqs_examples;
/// Symbolic operations examples
pub mod symbolic_examples;
