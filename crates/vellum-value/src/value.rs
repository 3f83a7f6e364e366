use std::cmp::Ordering;

use vellum_hash::{ContentHasher, Hash};
use vellum_store::Chunk;

use crate::blob::Blob;
use crate::codec::{self, Reader, Writer};
use crate::error::DecodeError;
use crate::kind::Kind;
use crate::list::List;
use crate::map::Map;
use crate::reference::Ref;
use crate::set::Set;
use crate::structs::Struct;
use crate::types::Type;

/// Any storable value.
///
/// Collections (`Blob`, `List`, `Set`, `Map`) may span many chunks; their
/// children are read lazily through a [`ValueReader`](crate::ValueReader).
/// Cloning a value is cheap for collections, types and structs.
#[derive(Clone, Debug)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    Blob(Blob),
    List(List),
    Set(Set),
    Map(Map),
    Ref(Ref),
    Struct(Struct),
    Type(Type),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Number(_) => Kind::Number,
            Value::String(_) => Kind::String,
            Value::Blob(_) => Kind::Blob,
            Value::List(_) => Kind::List,
            Value::Set(_) => Kind::Set,
            Value::Map(_) => Kind::Map,
            Value::Ref(_) => Kind::Ref,
            Value::Struct(_) => Kind::Struct,
            Value::Type(_) => Kind::Type,
        }
    }

    /// The structural type of this value.
    pub fn type_of(&self) -> Type {
        match self {
            Value::Bool(_) => Type::bool(),
            Value::Number(_) => Type::number(),
            Value::String(_) => Type::string(),
            Value::Blob(_) => Type::blob(),
            Value::List(list) => list.type_of(),
            Value::Set(set) => set.type_of(),
            Value::Map(map) => map.type_of(),
            Value::Ref(r) => r.type_of(),
            Value::Struct(s) => s.type_of().clone(),
            Value::Type(_) => Type::type_type(),
        }
    }

    /// The canonical chunk of this value.
    pub fn encode(&self) -> Chunk {
        let mut w = Writer::new();
        codec::write_value(&mut w, self);
        Chunk::new(w.into_bytes())
    }

    /// Decode a chunk. The whole chunk must be consumed.
    pub fn decode(chunk: &Chunk) -> Result<Self, DecodeError> {
        let mut r = Reader::new(chunk.data());
        let value = codec::read_value(&mut r)?;
        if !r.is_empty() {
            return Err(DecodeError::TrailingBytes {
                remaining: r.remaining_len(),
            });
        }
        Ok(value)
    }

    /// Content address of the value's chunk. Memoized for collections and
    /// types.
    pub fn hash(&self) -> Hash {
        match self {
            Value::Blob(blob) => blob.hash(),
            Value::List(list) => list.hash(),
            Value::Set(set) => set.hash(),
            Value::Map(map) => map.hash(),
            Value::Type(ty) => ty.hash(),
            _ => {
                let mut w = Writer::new();
                codec::write_value(&mut w, self);
                ContentHasher::CHUNK.hash(w.as_bytes())
            }
        }
    }

    /// The refs embedded directly in this value's chunk. Refs inside the
    /// referenced chunks are not followed.
    pub fn chunks(&self) -> Vec<Ref> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    pub(crate) fn collect_refs(&self, out: &mut Vec<Ref>) {
        match self {
            Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Type(_) => {}
            Value::Blob(blob) => blob.sequence().collect_refs(out),
            Value::List(list) => list.sequence().collect_refs(out),
            Value::Set(set) => set.sequence().collect_refs(out),
            Value::Map(map) => map.sequence().collect_refs(out),
            Value::Ref(r) => out.push(r.clone()),
            Value::Struct(s) => {
                for v in s.values() {
                    v.collect_refs(out);
                }
            }
        }
    }

    /// 0 when the value embeds no refs, otherwise one more than the
    /// tallest embedded ref.
    pub fn height(&self) -> u64 {
        height_of(&self.chunks())
    }

    /// Total order used by sets and maps.
    ///
    /// Numbers sort first (numerically, with `-0 == 0`), then strings
    /// (bytewise), then refs (by target hash), then every other value by
    /// its hash.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => normalize(*a).total_cmp(&normalize(*b)),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Ref(a), Value::Ref(b)) => a.target().cmp(&b.target()),
            _ => match self.rank().cmp(&other.rank()) {
                Ordering::Equal => self.hash().cmp(&other.hash()),
                ord => ord,
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Number(_) => 0,
            Value::String(_) => 1,
            Value::Ref(_) => 2,
            _ => 3,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Struct> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Value::Type(t) => Some(t),
            _ => None,
        }
    }
}

pub(crate) fn height_of(refs: &[Ref]) -> u64 {
    refs.iter().map(|r| r.height() + 1).max().unwrap_or(0)
}

/// The form a value takes as a set element or map key, so that keys which
/// compare equal are also stored identically: `-0` becomes `0`.
pub(crate) fn canonical_key(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize(n)),
        other => other,
    }
}

fn normalize(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        n
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Blob> for Value {
    fn from(b: Blob) -> Self {
        Value::Blob(b)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

impl From<Set> for Value {
    fn from(s: Set) -> Self {
        Value::Set(s)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl From<Struct> for Value {
    fn from(s: Struct) -> Self {
        Value::Struct(s)
    }
}

impl From<Type> for Value {
    fn from(t: Type) -> Self {
        Value::Type(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(value: &Value) -> Value {
        let chunk = value.encode();
        assert_eq!(chunk.hash(), value.hash());
        Value::decode(&chunk).unwrap()
    }

    // -------------------------------------------------------------------------
    // Scalars
    // -------------------------------------------------------------------------

    #[test]
    fn booleans_roundtrip() {
        for b in [true, false] {
            assert_eq!(roundtrip(&Value::Bool(b)), Value::Bool(b));
        }
    }

    #[test]
    fn number_edge_cases_roundtrip() {
        for n in [0.0, -0.0, 1.0, -1.0, 0.5, -273.15, 1e18, 1e19, 1e20, f64::MAX, f64::MIN_POSITIVE] {
            let decoded = roundtrip(&Value::Number(n));
            assert_eq!(decoded.as_number().unwrap().to_bits(), n.to_bits(), "{n}");
        }
    }

    #[test]
    fn zero_and_negative_zero() {
        assert_eq!(Value::Number(0.0), Value::Number(-0.0));
        assert_ne!(Value::Number(0.0).hash(), Value::Number(-0.0).hash());
    }

    #[test]
    fn strings_roundtrip() {
        for s in ["", "hello", "\u{65e5}\u{672c}\u{8a9e}", "emoji \u{1F980}"] {
            assert_eq!(roundtrip(&Value::from(s)), Value::from(s));
        }
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = Value::Bool(true).encode().data().to_vec();
        bytes.push(0);
        assert_eq!(
            Value::decode(&Chunk::new(bytes)),
            Err(DecodeError::TrailingBytes { remaining: 1 })
        );
    }

    #[test]
    fn empty_chunk_rejected() {
        assert!(matches!(
            Value::decode(&Chunk::new(Vec::new())),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    // -------------------------------------------------------------------------
    // Ordering
    // -------------------------------------------------------------------------

    #[test]
    fn kinds_order_numbers_strings_refs_then_rest() {
        let number = Value::Number(1e9);
        let string = Value::from("a");
        let reference = Value::Ref(Ref::from_value(&Value::Bool(true)));
        let other = Value::Bool(false);
        assert!(number < string);
        assert!(string < reference);
        assert!(reference < other);
    }

    #[test]
    fn numbers_order_numerically() {
        assert!(Value::Number(-1.0) < Value::Number(0.0));
        assert!(Value::Number(2.0) < Value::Number(10.0));
    }

    #[test]
    fn refs_order_by_target() {
        let a = Ref::from_value(&Value::from("a"));
        let b = Ref::from_value(&Value::from("b"));
        let expected = a.target().cmp(&b.target());
        assert_eq!(Value::Ref(a).compare(&Value::Ref(b)), expected);
    }

    // -------------------------------------------------------------------------
    // Refs and heights
    // -------------------------------------------------------------------------

    #[test]
    fn scalar_values_embed_no_refs() {
        assert!(Value::Number(1.0).chunks().is_empty());
        assert_eq!(Value::Number(1.0).height(), 0);
    }

    #[test]
    fn struct_chunks_are_its_refs() {
        let leaf = Value::from("leaf");
        let r = Ref::from_value(&leaf);
        let s = Struct::from_fields("S", [("r", Value::Ref(r.clone())), ("n", Value::Number(1.0))])
            .unwrap();
        let value = Value::Struct(s);
        assert_eq!(value.chunks(), vec![r.clone()]);
        assert_eq!(value.height(), 1);

        let outer = Value::Ref(Ref::from_value(&value));
        assert_eq!(outer.height(), 2);
    }

    proptest! {
        #[test]
        fn number_roundtrip(n in any::<f64>()) {
            let decoded = roundtrip(&Value::Number(n));
            prop_assert_eq!(decoded.as_number().unwrap().to_bits(), n.to_bits());
        }

        #[test]
        fn string_roundtrip(s in ".*") {
            let value = Value::from(s.as_str());
            prop_assert_eq!(roundtrip(&value), value);
        }

        #[test]
        fn number_order_matches_f64(a in -1e12f64..1e12, b in -1e12f64..1e12) {
            let expected = a.partial_cmp(&b).unwrap();
            prop_assert_eq!(Value::Number(a).compare(&Value::Number(b)), expected);
        }
    }
}
