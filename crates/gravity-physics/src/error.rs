use thiserror::Error;

/// Errors raised by the physics core
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected at init/reset so NaN never reaches the integrator
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("self-consistent evaluation needs one target per source ({targets} targets, {sources} sources)")]
    ShapeMismatch { targets: usize, sources: usize },

    #[error("acceleration backend returned {actual} values for {expected} targets")]
    BatchLength { expected: usize, actual: usize },

    #[error("tracer arrays differ in length: {positions} positions, {other} {name}")]
    ArrayLength {
        name: &'static str,
        positions: usize,
        other: usize,
    },

    #[error("acceleration backend failed: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
