//! The Vellum binary value codec.
//!
//! Every value is written as its kind tag followed by a kind-specific
//! payload, so any chunk can be decoded without an external schema. Inside
//! a context whose static type fixes a single concrete kind (a struct field,
//! a homogeneous collection), values are written untagged.

mod primitives;
mod types;
mod value;

pub use primitives::{Reader, Writer, MAX_DEPTH};
pub use types::{describe_type, encode_type, encode_type_value, read_type, write_type};
pub use value::{read_payload, read_ref, read_value, write_payload, write_ref, write_value};

pub(crate) use value::{read_in_slot, write_in_slot};
