use std::error::Error;
use std::fmt;

/// Failures reported by the algebra kernel.
///
/// A failed pattern match is not an error (matching returns `Option`/`bool`);
/// `MatchFailure` is used only where a caller requested a decision that could not be made,
/// e.g. `If` with a symbolic condition.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgebraError {
    /// no candidate, or more than one, for a name in the namespace
    UnresolvedName(String),
    MatchFailure(String),
    /// a memoizing pass revisited a node that is still being computed
    Cycle(String),
    Unimplemented(String),
    CompilationFailure(String),
    /// an iterative numerical method failed to converge
    Diverged { iterations: usize, residual: f64 },
    InvalidArgument(String),
}

pub type AlgebraResult<T> = Result<T, AlgebraError>;

impl fmt::Display for AlgebraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgebraError::UnresolvedName(name) => write!(f, "unresolved name '{}'", name),
            AlgebraError::MatchFailure(msg) => write!(f, "match failure: {}", msg),
            AlgebraError::Cycle(expr) => write!(f, "cycle detected while visiting {}", expr),
            AlgebraError::Unimplemented(msg) => write!(f, "not implemented: {}", msg),
            AlgebraError::CompilationFailure(msg) => write!(f, "cannot compile: {}", msg),
            AlgebraError::Diverged {
                iterations,
                residual,
            } => write!(
                f,
                "iteration diverged after {} iterations (residual {:e})",
                iterations, residual
            ),
            AlgebraError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
        }
    }
}

impl Error for AlgebraError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = AlgebraError::UnresolvedName("Foo".to_string());
        assert_eq!(e.to_string(), "unresolved name 'Foo'");
        let d = AlgebraError::Diverged {
            iterations: 64,
            residual: 1.0,
        };
        assert!(d.to_string().contains("64"));
    }
}
