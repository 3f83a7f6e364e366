use std::cmp::Ordering;
use std::fmt;

use vellum_hash::Hash;

use crate::error::ValueResult;
use crate::kind::Kind;
use crate::sequence::Sequence;
use crate::store::{ValueReader, ValueWriter};
use crate::types::Type;
use crate::value::{canonical_key, Value};

/// A map from values to values, kept in [`Value::compare`] order of keys.
#[derive(Clone)]
pub struct Map {
    seq: Sequence<(Value, Value)>,
}

impl Map {
    /// Build a map. For a key given more than once, the last entry wins.
    pub fn new<W: ValueWriter + ?Sized>(
        store: &W,
        entries: Vec<(Value, Value)>,
    ) -> ValueResult<Self> {
        let mut entries: Vec<(usize, (Value, Value))> = entries
            .into_iter()
            .map(|(k, v)| (canonical_key(k), v))
            .enumerate()
            .collect();
        entries.sort_by(|(ia, (a, _)), (ib, (b, _))| a.compare(b).then(ib.cmp(ia)));
        entries.dedup_by(|(_, (a, _)), (_, (b, _))| a.compare(b) == Ordering::Equal);
        let entries = entries.into_iter().map(|(_, entry)| entry).collect();
        Ok(Self::from_sequence(Sequence::from_items(
            store,
            Kind::Map,
            entries,
        )?))
    }

    pub fn empty() -> Self {
        Self::from_sequence(Sequence::empty(Kind::Map))
    }

    pub(crate) fn from_sequence(seq: Sequence<(Value, Value)>) -> Self {
        Self { seq }
    }

    pub(crate) fn sequence(&self) -> &Sequence<(Value, Value)> {
        &self.seq
    }

    pub(crate) fn into_sequence(self) -> Sequence<(Value, Value)> {
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

    /// `Map<K, V>` over the unions of key and value types.
    pub fn type_of(&self) -> Type {
        self.seq.type_of()
    }

    pub fn is_chunked(&self) -> bool {
        self.seq.is_meta()
    }

    pub fn get<R: ValueReader + ?Sized>(&self, store: &R, key: &Value) -> ValueResult<Option<Value>> {
        let (cursor, found) = self.seq.seek(store, key)?;
        if !found {
            return Ok(None);
        }
        Ok(cursor.current().map(|(_, v)| v.clone()))
    }

    pub fn has<R: ValueReader + ?Sized>(&self, store: &R, key: &Value) -> ValueResult<bool> {
        Ok(self.seq.seek(store, key)?.1)
    }

    pub fn iter<'a, R: ValueReader + ?Sized>(
        &self,
        store: &'a R,
    ) -> ValueResult<impl Iterator<Item = ValueResult<(Value, Value)>> + 'a> {
        self.seq.iter(store)
    }

    pub fn to_vec<R: ValueReader + ?Sized>(&self, store: &R) -> ValueResult<Vec<(Value, Value)>> {
        self.seq.to_vec(store)
    }

    pub fn keys<R: ValueReader + ?Sized>(&self, store: &R) -> ValueResult<Vec<Value>> {
        Ok(self.to_vec(store)?.into_iter().map(|(k, _)| k).collect())
    }

    /// A map with `key` bound to `value`.
    pub fn set<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        key: Value,
        value: Value,
    ) -> ValueResult<Self> {
        let key = canonical_key(key);
        let (cursor, found) = self.seq.seek(store, &key)?;
        let remove = match cursor.current() {
            Some((k, v)) if found => {
                if v.hash() == value.hash() && k.hash() == key.hash() {
                    return Ok(self.clone());
                }
                1
            }
            _ => 0,
        };
        Ok(Self::from_sequence(self.seq.splice_at(
            store,
            &cursor,
            remove,
            vec![(key, value)],
        )?))
    }

    /// A map without `key`. Returns `self` unchanged if it is absent.
    pub fn remove<W: ValueWriter + ?Sized>(&self, store: &W, key: &Value) -> ValueResult<Self> {
        let (cursor, found) = self.seq.seek(store, key)?;
        if !found {
            return Ok(self.clone());
        }
        Ok(Self::from_sequence(
            self.seq.splice_at(store, &cursor, 1, Vec::new())?,
        ))
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("len", &self.len())
            .field("hash", &self.hash())
            .finish()
    }
}
