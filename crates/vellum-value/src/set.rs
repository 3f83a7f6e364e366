use std::cmp::Ordering;
use std::fmt;

use vellum_hash::Hash;

use crate::error::ValueResult;
use crate::kind::Kind;
use crate::sequence::Sequence;
use crate::store::{ValueReader, ValueWriter};
use crate::types::Type;
use crate::value::{canonical_key, Value};

/// A set of values, kept in [`Value::compare`] order.
#[derive(Clone)]
pub struct Set {
    seq: Sequence<Value>,
}

impl Set {
    /// Build a set. Duplicates are dropped.
    pub fn new<W: ValueWriter + ?Sized>(store: &W, values: Vec<Value>) -> ValueResult<Self> {
        let mut values: Vec<Value> = values.into_iter().map(canonical_key).collect();
        values.sort_by(Value::compare);
        values.dedup_by(|a, b| a.compare(b) == Ordering::Equal);
        Ok(Self::from_sequence(Sequence::from_items(
            store,
            Kind::Set,
            values,
        )?))
    }

    pub fn empty() -> Self {
        Self::from_sequence(Sequence::empty(Kind::Set))
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

    pub fn type_of(&self) -> Type {
        self.seq.type_of()
    }

    pub fn is_chunked(&self) -> bool {
        self.seq.is_meta()
    }

    pub fn has<R: ValueReader + ?Sized>(&self, store: &R, value: &Value) -> ValueResult<bool> {
        Ok(self.seq.seek(store, value)?.1)
    }

    /// The first element, in set order.
    pub fn first<R: ValueReader + ?Sized>(&self, store: &R) -> ValueResult<Option<Value>> {
        if self.is_empty() {
            return Ok(None);
        }
        self.seq.get(store, 0).map(Some)
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

    /// A set that also holds `value`. Returns `self` unchanged if it
    /// already does.
    pub fn insert<W: ValueWriter + ?Sized>(&self, store: &W, value: Value) -> ValueResult<Self> {
        let value = canonical_key(value);
        let (cursor, found) = self.seq.seek(store, &value)?;
        if found {
            return Ok(self.clone());
        }
        Ok(Self::from_sequence(
            self.seq.splice_at(store, &cursor, 0, vec![value])?,
        ))
    }

    /// A set without `value`. Returns `self` unchanged if it is absent.
    pub fn remove<W: ValueWriter + ?Sized>(&self, store: &W, value: &Value) -> ValueResult<Self> {
        let (cursor, found) = self.seq.seek(store, value)?;
        if !found {
            return Ok(self.clone());
        }
        Ok(Self::from_sequence(
            self.seq.splice_at(store, &cursor, 1, Vec::new())?,
        ))
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set")
            .field("len", &self.len())
            .field("hash", &self.hash())
            .finish()
    }
}
