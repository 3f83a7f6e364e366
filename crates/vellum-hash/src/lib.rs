//! Content addressing for Vellum.
//!
//! Every chunk and every value in Vellum is identified by the BLAKE3 digest
//! of its canonical bytes. This crate is the leaf of the dependency graph:
//! the chunk store, the type system and the value codec all build on
//! [`Hash`].
//!
//! # Key Types
//!
//! - [`Hash`]: 32-byte content address with a total order and a hex form
//! - [`ContentHasher`]: domain-separated digest computation
//! - [`HashError`]: failures parsing the external (hex) representation

pub mod error;
pub mod hash;
pub mod hasher;

pub use error::HashError;
pub use hash::{Hash, HASH_LEN};
pub use hasher::ContentHasher;
