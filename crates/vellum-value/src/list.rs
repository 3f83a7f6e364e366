use std::fmt;

use vellum_hash::Hash;

use crate::error::{ValueError, ValueResult};
use crate::kind::Kind;
use crate::sequence::Sequence;
use crate::store::{ValueReader, ValueWriter};
use crate::types::Type;
use crate::value::Value;

/// An ordered list of values.
///
/// Edits return a new list; the old one stays valid and shares every chunk
/// the edit did not touch.
#[derive(Clone)]
pub struct List {
    seq: Sequence<Value>,
}

impl List {
    pub fn new<W: ValueWriter + ?Sized>(store: &W, values: Vec<Value>) -> ValueResult<Self> {
        Ok(Self::from_sequence(Sequence::from_items(
            store,
            Kind::List,
            values,
        )?))
    }

    pub fn empty() -> Self {
        Self::from_sequence(Sequence::empty(Kind::List))
    }

    pub(crate) fn from_sequence(seq: Sequence<Value>) -> Self {
        Self { seq }
    }

    pub(crate) fn sequence(&self) -> &Sequence<Value> {
        &self.seq
    }

    pub(crate) fn into_sequence(self) -> Sequence<Value> {
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

    /// `List<T>`, where `T` is the union of the element types.
    pub fn type_of(&self) -> Type {
        self.seq.type_of()
    }

    /// Whether the elements are spread over several chunks.
    pub fn is_chunked(&self) -> bool {
        self.seq.is_meta()
    }

    pub fn get<R: ValueReader + ?Sized>(&self, store: &R, index: u64) -> ValueResult<Value> {
        self.seq.get(store, index)
    }

    pub fn iter<'a, R: ValueReader + ?Sized>(
        &self,
        store: &'a R,
    ) -> ValueResult<impl Iterator<Item = ValueResult<Value>> + 'a> {
        self.seq.iter(store)
    }

    pub fn to_vec<R: ValueReader + ?Sized>(&self, store: &R) -> ValueResult<Vec<Value>> {
        self.seq.to_vec(store)
    }

    /// Remove `remove` values at `index` and insert `values` there.
    pub fn splice<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        index: u64,
        remove: u64,
        values: Vec<Value>,
    ) -> ValueResult<Self> {
        Ok(Self::from_sequence(
            self.seq.splice(store, index, remove, values)?,
        ))
    }

    pub fn insert<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        index: u64,
        value: Value,
    ) -> ValueResult<Self> {
        self.splice(store, index, 0, vec![value])
    }

    pub fn append<W: ValueWriter + ?Sized>(&self, store: &W, value: Value) -> ValueResult<Self> {
        self.splice(store, self.len(), 0, vec![value])
    }

    /// Replace the value at `index`.
    pub fn set<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        index: u64,
        value: Value,
    ) -> ValueResult<Self> {
        self.check_index(index)?;
        self.splice(store, index, 1, vec![value])
    }

    pub fn remove<W: ValueWriter + ?Sized>(&self, store: &W, index: u64) -> ValueResult<Self> {
        self.check_index(index)?;
        self.splice(store, index, 1, Vec::new())
    }

    fn check_index(&self, index: u64) -> ValueResult<()> {
        if index >= self.len() {
            return Err(ValueError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("len", &self.len())
            .field("hash", &self.hash())
            .finish()
    }
}
