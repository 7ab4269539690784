//! different utility modules used throughout the project
/// terminal logger shared by the solvers
pub mod logger;
