//! Structural types, values and chunked collections for Vellum.
//!
//! Every [`Value`] has a canonical, self-describing encoding; its hash is
//! the hash of that encoding. Large collections are split into trees of
//! chunks whose shape depends only on their contents, so equal collections
//! share chunks no matter how they were built.
//!
//! # Key Types
//!
//! - [`Kind`]: the closed set of value and type categories, with wire tags
//! - [`Type`]: structural types, including recursive struct types
//! - [`Value`]: any storable value
//! - [`Blob`], [`List`], [`Set`], [`Map`]: chunked collections
//! - [`Ref`]: a typed pointer to a stored value
//! - [`ValueStore`]: reads and writes values through a batch store
//!
//! # Design Rules
//!
//! 1. Types and values are immutable; edits return new values.
//! 2. Decoding never substitutes defaults for malformed input.
//! 3. Collection children are loaded by hash when first visited, never
//!    eagerly.
//! 4. For a given boundary strategy, a collection's chunks depend only on
//!    its contents, whatever sequence of edits produced it.

pub mod blob;
pub mod codec;
pub mod error;
pub mod kind;
pub mod list;
pub mod map;
pub mod reference;
pub mod sequence;
pub mod set;
pub mod store;
pub mod structs;
pub mod types;
pub mod value;

pub use blob::Blob;
pub use error::{DecodeError, TypeError, ValueError, ValueResult};
pub use kind::Kind;
pub use list::List;
pub use map::Map;
pub use reference::Ref;
pub use sequence::{
    BoundaryChecker, BoundaryStrategy, ChunkerConfig, FixedSizeBoundary, MetaTuple,
    RollingHashBoundary,
};
pub use set::Set;
pub use store::{ChunkRefWalker, ValueCache, ValueReader, ValueStore, ValueStoreConfig, ValueWriter};
pub use structs::Struct;
pub use types::{is_valid_field_name, StructDesc, Type, TypeDesc};
pub use value::Value;
