use thiserror::Error;

/// Errors produced when parsing a [`Hash`](crate::Hash) from its external form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
