use vellum_hash::Hash;

/// Errors from chunk store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store has been closed and can no longer be used.
    #[error("store is closed")]
    Closed,

    /// A chunk embeds a reference that is neither pending, hinted, nor stored.
    #[error("chunk {chunk} references missing chunk {reference}")]
    MissingReference { chunk: Hash, reference: Hash },

    /// Chunk bytes do not hash to the address they were filed under.
    #[error("hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: Hash, computed: Hash },

    /// The chunk data is malformed and its references cannot be read.
    #[error("corrupt chunk {hash}: {reason}")]
    Corrupt { hash: Hash, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
