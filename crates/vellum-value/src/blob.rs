use std::fmt;

use vellum_hash::Hash;

use crate::error::{ValueError, ValueResult};
use crate::kind::Kind;
use crate::sequence::Sequence;
use crate::store::{ValueReader, ValueWriter};
use crate::types::Type;

/// An immutable byte string, chunked like any other collection.
#[derive(Clone)]
pub struct Blob {
    seq: Sequence<u8>,
}

impl Blob {
    pub fn new<W: ValueWriter + ?Sized>(store: &W, data: &[u8]) -> ValueResult<Self> {
        Ok(Self::from_sequence(Sequence::from_items(
            store,
            Kind::Blob,
            data.to_vec(),
        )?))
    }

    pub fn empty() -> Self {
        Self::from_sequence(Sequence::empty(Kind::Blob))
    }

    pub(crate) fn from_sequence(seq: Sequence<u8>) -> Self {
        Self { seq }
    }

    pub(crate) fn sequence(&self) -> &Sequence<u8> {
        &self.seq
    }

    pub(crate) fn into_sequence(self) -> Sequence<u8> {
        self.seq
    }

    pub fn len(&self) -> u64 {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn hash(&self) -> Hash {
        self.seq.hash()
    }

    pub fn type_of(&self) -> Type {
        Type::blob()
    }

    /// Whether the bytes are spread over several chunks.
    pub fn is_chunked(&self) -> bool {
        self.seq.is_meta()
    }

    pub fn get<R: ValueReader + ?Sized>(&self, store: &R, index: u64) -> ValueResult<u8> {
        self.seq.get(store, index)
    }

    pub fn read_all<R: ValueReader + ?Sized>(&self, store: &R) -> ValueResult<Vec<u8>> {
        self.seq.to_vec(store)
    }

    /// Up to `len` bytes starting at `offset`.
    pub fn read_at<R: ValueReader + ?Sized>(
        &self,
        store: &R,
        offset: u64,
        len: u64,
    ) -> ValueResult<Vec<u8>> {
        self.seq.range(store, offset, len)
    }

    /// Replace `remove` bytes at `offset` with `data`.
    pub fn splice<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        offset: u64,
        remove: u64,
        data: &[u8],
    ) -> ValueResult<Self> {
        Ok(Self::from_sequence(self.seq.splice(
            store,
            offset,
            remove,
            data.to_vec(),
        )?))
    }

    pub fn append<W: ValueWriter + ?Sized>(&self, store: &W, data: &[u8]) -> ValueResult<Self> {
        self.splice(store, self.len(), 0, data)
    }

    /// Bytes `start..end`, as a new blob.
    pub fn slice<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        start: u64,
        end: u64,
    ) -> ValueResult<Self> {
        if start > end || end > self.len() {
            return Err(ValueError::IndexOutOfRange {
                index: end,
                len: self.len(),
            });
        }
        Self::new(store, &self.read_at(store, start, end - start)?)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("len", &self.len())
            .field("hash", &self.hash())
            .finish()
    }
}
