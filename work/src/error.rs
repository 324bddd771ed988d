use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkError {
    #[error("work value {actual:016x} below difficulty {minimum:016x}")]
    InsufficientDifficulty { actual: u64, minimum: u64 },

    #[error("invalid difficulty {0:?}")]
    InvalidDifficulty(String),

    #[error("work generation cancelled")]
    Cancelled,
}
