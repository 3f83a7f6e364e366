//! Chunked sequences: the storage engine behind blobs, lists, sets and maps.
//!
//! A sequence is a tree of nodes. A leaf node holds items directly; a meta
//! node holds [`MetaTuple`]s, each pointing at a child node stored as its
//! own chunk. Children are never held in memory by their parent: they are
//! read by hash through a [`ValueReader`] when a cursor descends into them.
//!
//! Trees are canonical for a given boundary strategy. Leaves are cut by the
//! strategy over the items, each level of meta nodes is cut by the same
//! strategy over the child hashes, and levels stop at the first level with
//! a single node. Edits re-chunk only from the edited node until the new
//! chunk boundaries line up with the old ones again, so an edited tree is
//! identical to one built from scratch and shares every untouched chunk.

mod boundary;
mod chunker;
mod cursor;

use std::fmt;
use std::sync::{Arc, OnceLock};

use vellum_hash::{ContentHasher, Hash};

pub use boundary::{
    BoundaryChecker, BoundaryStrategy, ChunkerConfig, FixedSizeBoundary, RollingHashBoundary,
};
pub(crate) use chunker::ChunkItem;
pub(crate) use cursor::{Cursor, SequenceIter};

use crate::codec::{self, Reader, Writer};
use crate::error::{DecodeError, ValueError, ValueResult};
use crate::kind::Kind;
use crate::reference::Ref;
use crate::store::{ValueReader, ValueWriter};
use crate::types::Type;
use crate::value::Value;

// smallest meta tuple: ref tag, type byte, empty hash string, height,
// tagged bool key, cumulative count
const MIN_TUPLE_SIZE: usize = 1 + 1 + 4 + 8 + 2 + 8;

/// An item stored in a sequence leaf.
pub(crate) trait SequenceItem: ChunkItem + Clone + fmt::Debug + Send + Sync + 'static {
    /// Smallest encoded size of one item, for sanity-checking counts.
    const MIN_ENCODED_SIZE: usize;

    /// Element type headers for a leaf holding `items`.
    fn leaf_header(items: &[Self]) -> Vec<Type>;

    /// Ordering key: the element for sets, the key for maps.
    fn key(&self) -> Value;

    /// Compare this item's ordering key against `key`.
    fn cmp_key(&self, key: &Value) -> std::cmp::Ordering;

    fn collect_refs(&self, out: &mut Vec<Ref>);

    fn write_item(&self, w: &mut Writer, header: &[Type]);

    fn read_item(r: &mut Reader<'_>, header: &[Type]) -> Result<Self, DecodeError>;

    fn write_leaf(w: &mut Writer, items: &[Self], header: &[Type]) {
        w.write_u64(items.len() as u64);
        for item in items {
            item.write_item(w, header);
        }
    }

    fn read_leaf(r: &mut Reader<'_>, header: &[Type]) -> Result<Vec<Self>, DecodeError> {
        let count = r.read_count(Self::MIN_ENCODED_SIZE, "sequence length")?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(Self::read_item(r, header)?);
        }
        Ok(items)
    }

    /// Wrap a sequence of these items as the collection value of its kind.
    fn wrap(seq: Sequence<Self>) -> Value;

    /// Unwrap a collection value of `kind` holding these items.
    fn unwrap(value: Value, kind: Kind) -> Option<Sequence<Self>>;
}

/// One entry of a meta node.
#[derive(Clone, Debug)]
pub struct MetaTuple {
    /// The child node, stored as its own chunk.
    pub child: Ref,
    /// `Number(cumulative)` for blobs and lists; the largest key in the
    /// child subtree for sets and maps.
    pub key: Value,
    /// Leaf items covered by this tuple and every tuple before it in the
    /// same node.
    pub cumulative: u64,
}

pub(crate) enum Node<T> {
    Leaf(Vec<T>),
    Meta(Vec<MetaTuple>),
}

/// A node together with its memoized header and hash.
pub(crate) struct SeqNode<T> {
    kind: Kind,
    node: Node<T>,
    header: OnceLock<Vec<Type>>,
    hash: OnceLock<Hash>,
}

impl<T: SequenceItem> SeqNode<T> {
    pub(crate) fn leaf(kind: Kind, items: Vec<T>) -> Self {
        Self::new(kind, Node::Leaf(items))
    }

    fn new(kind: Kind, node: Node<T>) -> Self {
        Self {
            kind,
            node,
            header: OnceLock::new(),
            hash: OnceLock::new(),
        }
    }

    pub(crate) fn kind(&self) -> Kind {
        self.kind
    }

    #[cfg(test)]
    pub(crate) fn node(&self) -> &Node<T> {
        &self.node
    }

    pub(crate) fn is_meta(&self) -> bool {
        matches!(self.node, Node::Meta(_))
    }

    /// Items of a leaf; empty for meta nodes.
    pub(crate) fn items(&self) -> &[T] {
        match &self.node {
            Node::Leaf(items) => items,
            Node::Meta(_) => &[],
        }
    }

    /// Tuples of a meta node; empty for leaves.
    pub(crate) fn tuples(&self) -> &[MetaTuple] {
        match &self.node {
            Node::Leaf(_) => &[],
            Node::Meta(tuples) => tuples,
        }
    }

    /// Number of items or tuples held directly.
    pub(crate) fn width(&self) -> usize {
        match &self.node {
            Node::Leaf(items) => items.len(),
            Node::Meta(tuples) => tuples.len(),
        }
    }

    /// Leaf items in the subtree.
    pub(crate) fn count(&self) -> u64 {
        match &self.node {
            Node::Leaf(items) => items.len() as u64,
            Node::Meta(tuples) => tuples.last().map_or(0, |t| t.cumulative),
        }
    }

    /// Largest key in the subtree.
    pub(crate) fn last_key(&self) -> Option<Value> {
        match &self.node {
            Node::Leaf(items) => items.last().map(T::key),
            Node::Meta(tuples) => tuples.last().map(|t| t.key.clone()),
        }
    }

    /// Element type headers: one per element type of the collection kind.
    pub(crate) fn header(&self) -> &[Type] {
        self.header.get_or_init(|| match &self.node {
            Node::Leaf(items) => T::leaf_header(items),
            Node::Meta(tuples) => (0..self.kind.elem_arity())
                .map(|i| {
                    Type::union_of(
                        tuples
                            .iter()
                            .filter_map(|t| t.child.target_type().elem_types().get(i).cloned()),
                    )
                })
                .collect(),
        })
    }

    pub(crate) fn collect_refs(&self, out: &mut Vec<Ref>) {
        match &self.node {
            Node::Leaf(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            Node::Meta(tuples) => {
                for tuple in tuples {
                    out.push(tuple.child.clone());
                    tuple.key.collect_refs(out);
                }
            }
        }
    }
}

/// An immutable chunked sequence of `T`.
pub(crate) struct Sequence<T> {
    root: Arc<SeqNode<T>>,
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Self {
            root: Arc::clone(&self.root),
        }
    }
}

impl<T: SequenceItem> Sequence<T> {
    pub(crate) fn empty(kind: Kind) -> Self {
        Self::from_root(Arc::new(SeqNode::leaf(kind, Vec::new())))
    }

    pub(crate) fn from_root(root: Arc<SeqNode<T>>) -> Self {
        Self { root }
    }

    /// Build a canonical tree over `items`.
    pub(crate) fn from_items<W: ValueWriter + ?Sized>(
        store: &W,
        kind: Kind,
        items: Vec<T>,
    ) -> ValueResult<Self> {
        Ok(Self::from_root(chunker::build(store, kind, items)?))
    }

    #[cfg(test)]
    pub(crate) fn root(&self) -> &Arc<SeqNode<T>> {
        &self.root
    }

    pub(crate) fn kind(&self) -> Kind {
        self.root.kind
    }

    pub(crate) fn len(&self) -> u64 {
        self.root.count()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the root is a meta node.
    pub(crate) fn is_meta(&self) -> bool {
        self.root.is_meta()
    }

    pub(crate) fn header(&self) -> &[Type] {
        self.root.header()
    }

    /// The collection type: `Blob`, or `List<T>`, `Set<T>`, `Map<K, V>`
    /// over the element headers.
    pub(crate) fn type_of(&self) -> Type {
        match self.kind() {
            Kind::Blob => Type::blob(),
            kind => Type::compound(kind, self.header().to_vec()),
        }
    }

    /// Hash of the root chunk. Memoized.
    pub(crate) fn hash(&self) -> Hash {
        *self.root.hash.get_or_init(|| {
            let mut w = Writer::new();
            w.write_u8(self.kind().tag());
            self.write_node(&mut w);
            ContentHasher::CHUNK.hash(w.as_bytes())
        })
    }

    pub(crate) fn collect_refs(&self, out: &mut Vec<Ref>) {
        self.root.collect_refs(out);
    }

    // -------------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------------

    pub(crate) fn get<R: ValueReader + ?Sized>(&self, store: &R, index: u64) -> ValueResult<T> {
        let len = self.len();
        if index >= len {
            return Err(ValueError::IndexOutOfRange { index, len });
        }
        let cursor = Cursor::at_index(store, &self.root, index)?;
        cursor
            .current()
            .cloned()
            .ok_or(ValueError::IndexOutOfRange { index, len })
    }

    pub(crate) fn iter<'a, R: ValueReader + ?Sized>(
        &self,
        store: &'a R,
    ) -> ValueResult<SequenceIter<'a, T, R>> {
        Ok(SequenceIter::new(store, Cursor::at_index(store, &self.root, 0)?))
    }

    /// Every item, reading leaves in order.
    pub(crate) fn to_vec<R: ValueReader + ?Sized>(&self, store: &R) -> ValueResult<Vec<T>> {
        self.range(store, 0, self.len())
    }

    /// `len` items starting at `start`, clamped to the end.
    pub(crate) fn range<R: ValueReader + ?Sized>(
        &self,
        store: &R,
        start: u64,
        len: u64,
    ) -> ValueResult<Vec<T>> {
        let total = self.len();
        if start > total {
            return Err(ValueError::IndexOutOfRange { index: start, len: total });
        }
        let want = len.min(total - start) as usize;
        let mut out = Vec::with_capacity(want);
        if want == 0 {
            return Ok(out);
        }
        let mut cursor = Cursor::at_index(store, &self.root, start)?;
        let mut skip = cursor.leaf_index();
        loop {
            let items = cursor.leaf().items();
            let take = (want - out.len()).min(items.len() - skip);
            out.extend_from_slice(&items[skip..skip + take]);
            if out.len() == want || !cursor.next_node(store, 0)? {
                break;
            }
            skip = 0;
        }
        Ok(out)
    }

    /// Cursor at the first item whose key is not less than `key`, and
    /// whether that item's key equals `key`.
    pub(crate) fn seek<R: ValueReader + ?Sized>(
        &self,
        store: &R,
        key: &Value,
    ) -> ValueResult<(Cursor<T>, bool)> {
        let cursor = Cursor::at_key(store, &self.root, key)?;
        let found = cursor
            .current()
            .is_some_and(|item| item.cmp_key(key) == std::cmp::Ordering::Equal);
        Ok((cursor, found))
    }

    // -------------------------------------------------------------------------
    // Edits
    // -------------------------------------------------------------------------

    /// Remove `remove` items at `index` and insert `inserts` there.
    pub(crate) fn splice<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        index: u64,
        remove: u64,
        inserts: Vec<T>,
    ) -> ValueResult<Self> {
        let len = self.len();
        if index > len {
            return Err(ValueError::IndexOutOfRange { index, len });
        }
        if remove > len - index {
            return Err(ValueError::IndexOutOfRange {
                index: index.saturating_add(remove),
                len,
            });
        }
        if remove == 0 && inserts.is_empty() {
            return Ok(self.clone());
        }
        let cursor = Cursor::at_index(store, &self.root, index)?;
        self.splice_at(store, &cursor, remove, inserts)
    }

    /// Splice at a cursor position.
    pub(crate) fn splice_at<W: ValueWriter + ?Sized>(
        &self,
        store: &W,
        cursor: &Cursor<T>,
        remove: u64,
        inserts: Vec<T>,
    ) -> ValueResult<Self> {
        Ok(Self::from_root(chunker::splice(store, cursor, remove, inserts)?))
    }

    // -------------------------------------------------------------------------
    // Encoding
    // -------------------------------------------------------------------------

    /// Write the node payload: headers, meta flag, then items or tuples.
    pub(crate) fn write_node(&self, w: &mut Writer) {
        let header = self.root.header();
        for ty in header {
            codec::write_type(w, ty);
        }
        match &self.root.node {
            Node::Leaf(items) => {
                w.write_bool(false);
                T::write_leaf(w, items, header);
            }
            Node::Meta(tuples) => {
                w.write_bool(true);
                w.write_u64(tuples.len() as u64);
                for tuple in tuples {
                    w.write_u8(Kind::Ref.tag());
                    codec::write_ref(w, &tuple.child);
                    codec::write_value(w, &tuple.key);
                    w.write_u64(tuple.cumulative);
                }
            }
        }
    }

    /// Read a node payload of a collection of `kind`.
    pub(crate) fn read_node(r: &mut Reader<'_>, kind: Kind) -> Result<Self, DecodeError> {
        let mut header = Vec::with_capacity(kind.elem_arity());
        for _ in 0..kind.elem_arity() {
            header.push(codec::read_type(r)?);
        }
        let node = if r.read_bool("sequence meta flag")? {
            let count = r.read_count(MIN_TUPLE_SIZE, "meta tuple count")?;
            let mut tuples = Vec::with_capacity(count);
            for _ in 0..count {
                let tag = Kind::from_u8(r.read_u8("meta tuple child")?)?;
                if tag != Kind::Ref {
                    return Err(DecodeError::UnexpectedKind {
                        context: "meta tuple child",
                        found: tag,
                    });
                }
                let child = codec::read_ref(r)?;
                let key = codec::read_value(r)?;
                let cumulative = r.read_u64("cumulative count")?;
                tuples.push(MetaTuple {
                    child,
                    key,
                    cumulative,
                });
            }
            check_tuples(kind, &tuples)?;
            Node::Meta(tuples)
        } else {
            let items = T::read_leaf(r, &header)?;
            if !kind.is_positional()
                && items
                    .windows(2)
                    .any(|w| w[1].cmp_key(&w[0].key()) != std::cmp::Ordering::Greater)
            {
                return Err(DecodeError::NonCanonicalOrder {
                    context: "sequence items",
                });
            }
            Node::Leaf(items)
        };
        let node = SeqNode::new(kind, node);
        if node.header() != header.as_slice() {
            return Err(DecodeError::MalformedSequence {
                context: "element type header",
            });
        }
        Ok(Self::from_root(Arc::new(node)))
    }
}

fn check_tuples(kind: Kind, tuples: &[MetaTuple]) -> Result<(), DecodeError> {
    if tuples.is_empty() {
        return Err(DecodeError::MalformedSequence {
            context: "empty meta node",
        });
    }
    let mut prev: Option<&MetaTuple> = None;
    for tuple in tuples {
        if tuple.child.target_type().kind() != kind {
            return Err(DecodeError::MalformedSequence {
                context: "child of a different kind",
            });
        }
        if tuple.cumulative <= prev.map_or(0, |p| p.cumulative) {
            return Err(DecodeError::MalformedSequence {
                context: "cumulative counts",
            });
        }
        if kind.is_positional() {
            if tuple.key != Value::Number(tuple.cumulative as f64) {
                return Err(DecodeError::MalformedSequence {
                    context: "positional tuple key",
                });
            }
        } else if prev.is_some_and(|p| tuple.key <= p.key) {
            return Err(DecodeError::NonCanonicalOrder {
                context: "meta tuple keys",
            });
        }
        prev = Some(tuple);
    }
    Ok(())
}

/// Read the node a meta tuple points at.
pub(crate) fn load_child<T: SequenceItem, R: ValueReader + ?Sized>(
    store: &R,
    kind: Kind,
    child: &Ref,
) -> ValueResult<Arc<SeqNode<T>>> {
    let hash = child.target();
    let value = store
        .read_value(&hash)?
        .ok_or(ValueError::MissingChunk(hash))?;
    let found = value.kind();
    T::unwrap(value, kind)
        .map(|seq| seq.root)
        .ok_or(ValueError::UnexpectedChunk {
            hash,
            expected: kind,
            found,
        })
}

impl<T: SequenceItem> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("kind", &self.kind())
            .field("len", &self.len())
            .field("meta", &self.is_meta())
            .field("hash", &self.hash())
            .finish()
    }
}

// =============================================================================
// Item kinds
// =============================================================================

impl SequenceItem for u8 {
    const MIN_ENCODED_SIZE: usize = 1;

    fn leaf_header(_items: &[Self]) -> Vec<Type> {
        Vec::new()
    }

    fn key(&self) -> Value {
        Value::Number(f64::from(*self))
    }

    fn cmp_key(&self, key: &Value) -> std::cmp::Ordering {
        self.key().compare(key)
    }

    fn collect_refs(&self, _out: &mut Vec<Ref>) {}

    fn write_item(&self, w: &mut Writer, _header: &[Type]) {
        w.write_u8(*self);
    }

    fn read_item(r: &mut Reader<'_>, _header: &[Type]) -> Result<Self, DecodeError> {
        r.read_u8("blob byte")
    }

    fn write_leaf(w: &mut Writer, items: &[Self], _header: &[Type]) {
        w.write_bytes(items);
    }

    fn read_leaf(r: &mut Reader<'_>, _header: &[Type]) -> Result<Vec<Self>, DecodeError> {
        Ok(r.read_bytes("blob bytes")?.to_vec())
    }

    fn wrap(seq: Sequence<Self>) -> Value {
        Value::Blob(crate::blob::Blob::from_sequence(seq))
    }

    fn unwrap(value: Value, kind: Kind) -> Option<Sequence<Self>> {
        match (value, kind) {
            (Value::Blob(blob), Kind::Blob) => Some(blob.into_sequence()),
            _ => None,
        }
    }
}

impl SequenceItem for Value {
    const MIN_ENCODED_SIZE: usize = 1;

    fn leaf_header(items: &[Self]) -> Vec<Type> {
        vec![Type::union_of(items.iter().map(Value::type_of))]
    }

    fn key(&self) -> Value {
        self.clone()
    }

    fn cmp_key(&self, key: &Value) -> std::cmp::Ordering {
        self.compare(key)
    }

    fn collect_refs(&self, out: &mut Vec<Ref>) {
        Value::collect_refs(self, out);
    }

    fn write_item(&self, w: &mut Writer, header: &[Type]) {
        codec::write_in_slot(w, &header[0], self);
    }

    fn read_item(r: &mut Reader<'_>, header: &[Type]) -> Result<Self, DecodeError> {
        codec::read_in_slot(r, &header[0])
    }

    fn wrap(seq: Sequence<Self>) -> Value {
        match seq.kind() {
            Kind::Set => Value::Set(crate::set::Set::from_sequence(seq)),
            _ => Value::List(crate::list::List::from_sequence(seq)),
        }
    }

    fn unwrap(value: Value, kind: Kind) -> Option<Sequence<Self>> {
        match (value, kind) {
            (Value::List(list), Kind::List) => Some(list.into_sequence()),
            (Value::Set(set), Kind::Set) => Some(set.into_sequence()),
            _ => None,
        }
    }
}

impl SequenceItem for (Value, Value) {
    const MIN_ENCODED_SIZE: usize = 2;

    fn leaf_header(items: &[Self]) -> Vec<Type> {
        vec![
            Type::union_of(items.iter().map(|(k, _)| k.type_of())),
            Type::union_of(items.iter().map(|(_, v)| v.type_of())),
        ]
    }

    fn key(&self) -> Value {
        self.0.clone()
    }

    fn cmp_key(&self, key: &Value) -> std::cmp::Ordering {
        self.0.compare(key)
    }

    fn collect_refs(&self, out: &mut Vec<Ref>) {
        self.0.collect_refs(out);
        self.1.collect_refs(out);
    }

    fn write_item(&self, w: &mut Writer, header: &[Type]) {
        codec::write_in_slot(w, &header[0], &self.0);
        codec::write_in_slot(w, &header[1], &self.1);
    }

    fn read_item(r: &mut Reader<'_>, header: &[Type]) -> Result<Self, DecodeError> {
        let key = codec::read_in_slot(r, &header[0])?;
        let value = codec::read_in_slot(r, &header[1])?;
        Ok((key, value))
    }

    fn wrap(seq: Sequence<Self>) -> Value {
        Value::Map(crate::map::Map::from_sequence(seq))
    }

    fn unwrap(value: Value, kind: Kind) -> Option<Sequence<Self>> {
        match (value, kind) {
            (Value::Map(map), Kind::Map) => Some(map.into_sequence()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests;
