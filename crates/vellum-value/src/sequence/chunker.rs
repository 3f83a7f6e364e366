use std::sync::Arc;

use tracing::{debug, trace};

use super::boundary::{BoundaryChecker, BoundaryStrategy};
use super::{load_child, Cursor, MetaTuple, Node, SeqNode, Sequence, SequenceItem};
use crate::error::ValueResult;
use crate::kind::Kind;
use crate::reference::Ref;
use crate::store::ValueWriter;
use crate::value::Value;

/// A boundary hit is ignored until a chunk holds this many items, so every
/// level has at most half as many nodes as the level below.
const MIN_CHUNK_ITEMS: usize = 2;

/// Something a boundary checker can look at.
pub(crate) trait ChunkItem {
    /// Append the bytes the boundary strategy sees for this item.
    fn boundary_bytes(&self, out: &mut Vec<u8>);
}

impl ChunkItem for u8 {
    fn boundary_bytes(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl ChunkItem for Value {
    fn boundary_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.hash().as_bytes());
    }
}

impl ChunkItem for (Value, Value) {
    fn boundary_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.0.hash().as_bytes());
        out.extend_from_slice(self.1.hash().as_bytes());
    }
}

/// A written node, as seen from the level above.
#[derive(Clone, Debug)]
struct Entry {
    child: Ref,
    /// Largest key in the subtree; `None` for positional kinds.
    key: Option<Value>,
    count: u64,
}

impl ChunkItem for Entry {
    fn boundary_bytes(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.child.target().as_bytes());
    }
}

/// Cuts one level of a tree into chunks.
struct LevelChunker<'s, I> {
    strategy: &'s dyn BoundaryStrategy,
    checker: Box<dyn BoundaryChecker>,
    current: Vec<I>,
    chunks: Vec<Vec<I>>,
    scratch: Vec<u8>,
}

impl<'s, I: ChunkItem> LevelChunker<'s, I> {
    fn new(strategy: &'s dyn BoundaryStrategy) -> Self {
        Self {
            strategy,
            checker: strategy.checker(),
            current: Vec::new(),
            chunks: Vec::new(),
            scratch: Vec::new(),
        }
    }

    fn push(&mut self, item: I) {
        self.scratch.clear();
        item.boundary_bytes(&mut self.scratch);
        let hit = self.checker.write(&self.scratch);
        self.current.push(item);
        if hit && self.current.len() >= MIN_CHUNK_ITEMS {
            self.chunks.push(std::mem::take(&mut self.current));
            self.checker = self.strategy.checker();
        }
    }

    fn extend(&mut self, items: impl IntoIterator<Item = I>) {
        for item in items {
            self.push(item);
        }
    }

    /// True when the last item pushed ended a chunk.
    fn at_boundary(&self) -> bool {
        self.current.is_empty()
    }

    fn finish(mut self) -> Vec<Vec<I>> {
        if !self.current.is_empty() {
            self.chunks.push(self.current);
        }
        self.chunks
    }
}

fn meta_node<T: SequenceItem>(kind: Kind, entries: Vec<Entry>) -> SeqNode<T> {
    let mut cumulative = 0;
    let tuples = entries
        .into_iter()
        .map(|entry| {
            cumulative += entry.count;
            MetaTuple {
                child: entry.child,
                key: entry.key.unwrap_or(Value::Number(cumulative as f64)),
                cumulative,
            }
        })
        .collect();
    SeqNode::new(kind, Node::Meta(tuples))
}

/// The entries a meta node's tuples stand for.
fn tuple_entries<T: SequenceItem>(node: &SeqNode<T>) -> Vec<Entry> {
    let positional = node.kind().is_positional();
    let mut prev = 0;
    node.tuples()
        .iter()
        .map(|tuple| {
            let count = tuple.cumulative - prev;
            prev = tuple.cumulative;
            Entry {
                child: tuple.child.clone(),
                key: (!positional).then(|| tuple.key.clone()),
                count,
            }
        })
        .collect()
}

/// Write a node and describe it for the level above.
fn write_node<T: SequenceItem, W: ValueWriter + ?Sized>(
    store: &W,
    node: SeqNode<T>,
) -> ValueResult<Entry> {
    let key = if node.kind().is_positional() {
        None
    } else {
        node.last_key()
    };
    let count = node.count();
    let child = store.write_value(&T::wrap(Sequence::from_root(Arc::new(node))))?;
    Ok(Entry { child, key, count })
}

fn write_nodes<T: SequenceItem, W: ValueWriter + ?Sized>(
    store: &W,
    nodes: Vec<SeqNode<T>>,
) -> ValueResult<Vec<Entry>> {
    nodes.into_iter().map(|node| write_node(store, node)).collect()
}

/// Build the canonical tree over `items`.
pub(super) fn build<T: SequenceItem, W: ValueWriter + ?Sized>(
    store: &W,
    kind: Kind,
    items: Vec<T>,
) -> ValueResult<Arc<SeqNode<T>>> {
    let total = items.len();
    let mut chunker = LevelChunker::new(store.boundary());
    chunker.extend(items);
    let mut leaves: Vec<SeqNode<T>> = chunker
        .finish()
        .into_iter()
        .map(|items| SeqNode::leaf(kind, items))
        .collect();
    debug!(%kind, items = total, leaves = leaves.len(), "building sequence");
    match leaves.len() {
        0 => Ok(Arc::new(SeqNode::leaf(kind, Vec::new()))),
        1 => Ok(Arc::new(leaves.remove(0))),
        _ => {
            let entries = write_nodes(store, leaves)?;
            finish_root(store, kind, entries)
        }
    }
}

/// Stack levels of meta nodes over `entries` until one node remains.
fn finish_root<T: SequenceItem, W: ValueWriter + ?Sized>(
    store: &W,
    kind: Kind,
    mut entries: Vec<Entry>,
) -> ValueResult<Arc<SeqNode<T>>> {
    loop {
        match entries.len() {
            0 => return Ok(Arc::new(SeqNode::leaf(kind, Vec::new()))),
            1 => return collapse(store, load_child(store, kind, &entries[0].child)?),
            _ => {}
        }
        let mut chunker = LevelChunker::new(store.boundary());
        chunker.extend(entries);
        let mut chunks = chunker.finish();
        trace!(%kind, nodes = chunks.len(), "built meta level");
        if chunks.len() == 1 {
            return Ok(Arc::new(meta_node(kind, chunks.remove(0))));
        }
        entries = chunks
            .into_iter()
            .map(|chunk| write_node(store, meta_node::<T>(kind, chunk)))
            .collect::<ValueResult<_>>()?;
    }
}

/// Replace a root meta node of a single tuple with its child, repeatedly.
fn collapse<T: SequenceItem, W: ValueWriter + ?Sized>(
    store: &W,
    mut root: Arc<SeqNode<T>>,
) -> ValueResult<Arc<SeqNode<T>>> {
    while let [tuple] = root.tuples() {
        root = load_child(store, root.kind(), &tuple.child)?;
    }
    Ok(root)
}

/// Remove `remove` items at the cursor, insert `inserts` there, and
/// re-chunk every level from the edited node until the new boundaries meet
/// the old ones.
pub(super) fn splice<T: SequenceItem, W: ValueWriter + ?Sized>(
    store: &W,
    cursor: &Cursor<T>,
    remove: u64,
    inserts: Vec<T>,
) -> ValueResult<Arc<SeqNode<T>>> {
    let kind = cursor.kind();
    let top = cursor.depth() - 1;
    let (chunks, mut consumed) = rechunk_level(
        store,
        cursor.clone(),
        0,
        remove,
        inserts,
        |node: &SeqNode<T>| node.items().to_vec(),
    )?;
    let mut nodes: Vec<SeqNode<T>> = chunks
        .into_iter()
        .map(|items| SeqNode::leaf(kind, items))
        .collect();
    debug!(%kind, remove, levels = top + 1, consumed, rebuilt = nodes.len(), "spliced leaves");

    for level in 1..=top {
        let entries = write_nodes(store, nodes)?;
        let (chunks, used) = rechunk_level(
            store,
            cursor.clone(),
            level,
            consumed,
            entries,
            tuple_entries::<T>,
        )?;
        nodes = chunks
            .into_iter()
            .map(|chunk| meta_node(kind, chunk))
            .collect();
        trace!(%kind, level, consumed = used, rebuilt = nodes.len(), "spliced meta level");
        consumed = used;
    }

    match nodes.len() {
        0 => Ok(Arc::new(SeqNode::leaf(kind, Vec::new()))),
        1 => collapse(store, Arc::new(nodes.remove(0))),
        _ => {
            let entries = write_nodes(store, nodes)?;
            finish_root(store, kind, entries)
        }
    }
}

/// Re-chunk one level. The cursor frame at `level` marks the first item to
/// remove. Returns the new chunks and the number of old nodes they replace.
fn rechunk_level<T, I, W>(
    store: &W,
    mut cursor: Cursor<T>,
    level: usize,
    remove: u64,
    inserts: Vec<I>,
    items_of: impl Fn(&SeqNode<T>) -> Vec<I>,
) -> ValueResult<(Vec<Vec<I>>, u64)>
where
    T: SequenceItem,
    I: ChunkItem,
    W: ValueWriter + ?Sized,
{
    let mut chunker = LevelChunker::new(store.boundary());
    let mut items = items_of(cursor.node(level));
    let mut pos = cursor.index(level).min(items.len());
    let mut consumed = 1;

    let rest = items.split_off(pos);
    chunker.extend(items);
    items = rest;
    pos = 0;

    let mut left = remove;
    while left > (items.len() - pos) as u64 {
        left -= (items.len() - pos) as u64;
        if !cursor.next_node(store, level)? {
            left = 0;
            pos = items.len();
            break;
        }
        consumed += 1;
        items = items_of(cursor.node(level));
        pos = 0;
    }
    pos += left as usize;

    chunker.extend(inserts);
    chunker.extend(items.into_iter().skip(pos));
    while !chunker.at_boundary() && cursor.next_node(store, level)? {
        consumed += 1;
        chunker.extend(items_of(cursor.node(level)));
    }
    Ok((chunker.finish(), consumed))
}
