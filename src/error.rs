use thiserror::Error;

/// Error type for planning and inference operations
///
/// All variants are programming or configuration errors. They are detected
/// eagerly, before any partial result is produced, and are never retried.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The transition and reward models (or a policy) do not cover the same
    /// (state, action, next_state) keys
    #[error("model mismatch: {0}")]
    ModelMismatch(String),

    /// A normalization denominator came out zero, so no probability can be
    /// assigned
    #[error("degenerate signal: {0}")]
    DegenerateSignal(String),

    /// A numeric parameter or goal set is outside its valid range
    #[error("invalid value for `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Value iteration hit its sweep cap before the value function settled
    #[error("did not converge within {max_sweeps} sweeps (last delta {delta})")]
    NoConvergence { max_sweeps: u32, delta: f64 },
}

/// Convenience alias for results using the crate's [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;
