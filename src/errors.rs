use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimplexError {
    /// Malformed LP file or tableau. Carries what went wrong where.
    #[error("improper input: {0}")]
    ImproperInput(String),

    /// Phase II found a profitable column with no positive entry.
    #[error("the objective is unbounded")]
    Unbounded,

    /// A tableau invariant was broken mid-solve. Indicates a bug, not bad input.
    #[error("tableau invariant broken: {0}")]
    Invariant(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
