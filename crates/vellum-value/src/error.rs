use thiserror::Error;
use vellum_hash::Hash;
use vellum_store::StoreError;

use crate::kind::Kind;

/// Errors raised while constructing types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid struct field name: {0:?}")]
    InvalidFieldName(String),

    #[error("duplicate struct field name: {0:?}")]
    DuplicateField(String),

    #[error("{0} is not a primitive kind")]
    NotPrimitive(Kind),

    #[error("unknown primitive type name: {0:?}")]
    UnknownPrimitive(String),

    /// A field type refers to a struct that does not enclose it.
    #[error("struct field {0:?} has a cycle marker with no enclosing struct")]
    UnboundCycle(String),
}

/// Malformed or truncated wire bytes.
///
/// Decoding never substitutes a default: any of these aborts the decode of
/// the enclosing value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("unknown kind tag: {tag}")]
    UnknownKind { tag: u8 },

    #[error("unexpected {found} kind in {context}")]
    UnexpectedKind { context: &'static str, found: Kind },

    #[error("invalid bool value: {value} (expected 0x00 or 0x01)")]
    InvalidBool { value: u8 },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("{field} length {len} exceeds the {available} bytes remaining")]
    LengthExceedsInput {
        field: &'static str,
        len: u64,
        available: usize,
    },

    #[error("invalid struct field name: {name:?}")]
    InvalidFieldName { name: String },

    #[error("duplicate struct field name: {name:?}")]
    DuplicateField { name: String },

    #[error("struct field {field:?} holds a {found} value its declared type does not accept")]
    FieldTypeMismatch { field: String, found: Kind },

    #[error("invalid hash: {0}")]
    InvalidHash(String),

    #[error("cycle marker at depth {depth} has no enclosing struct")]
    UnboundCycle { depth: u32 },

    #[error("nesting exceeds maximum depth {max}")]
    NestingTooDeep { max: usize },

    #[error("{context} is not in canonical order")]
    NonCanonicalOrder { context: &'static str },

    #[error("malformed sequence: {context}")]
    MalformedSequence { context: &'static str },

    #[error("{remaining} trailing bytes after value")]
    TrailingBytes { remaining: usize },
}

/// Errors from value construction, collection access, and value storage.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Positional access outside a list or blob.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: u64, len: u64 },

    /// A chunk referenced by a sequence is not in the store.
    #[error("chunk {0} not found")]
    MissingChunk(Hash),

    /// A referenced chunk decoded to a value of the wrong kind.
    #[error("chunk {hash} holds a {found}, expected a {expected}")]
    UnexpectedChunk {
        hash: Hash,
        expected: Kind,
        found: Kind,
    },

    /// A struct field value whose kind the declared field type rejects.
    #[error("field {field:?} expects {expected}, got a {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: Kind,
    },

    #[error("struct type declares {expected} fields, got {actual}")]
    FieldCountMismatch { expected: usize, actual: usize },

    #[error("missing value for struct field {0:?}")]
    MissingField(String),

    #[error("struct type has no field {0:?}")]
    UnknownField(String),

    #[error("{0} is not a struct type")]
    NotAStructType(String),
}

/// Result alias for value operations.
pub type ValueResult<T> = Result<T, ValueError>;
