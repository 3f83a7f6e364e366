use std::sync::Arc;

use super::{load_child, SeqNode, SequenceItem};
use crate::error::ValueResult;
use crate::kind::Kind;
use crate::store::ValueReader;
use crate::value::Value;

struct Frame<T> {
    node: Arc<SeqNode<T>>,
    idx: usize,
}

impl<T> Clone for Frame<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            idx: self.idx,
        }
    }
}

/// A position in a sequence tree: one frame per level, leaf first.
///
/// Cloning a cursor is cheap; clones move independently.
pub(crate) struct Cursor<T> {
    kind: Kind,
    frames: Vec<Frame<T>>,
}

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            frames: self.frames.clone(),
        }
    }
}

impl<T: SequenceItem> Cursor<T> {
    /// Cursor at leaf item `index`. An index equal to the length places the
    /// cursor just past the last item.
    pub(crate) fn at_index<R: ValueReader + ?Sized>(
        store: &R,
        root: &Arc<SeqNode<T>>,
        index: u64,
    ) -> ValueResult<Self> {
        let mut remaining = index;
        Self::descend(store, root, |node| match node.tuples() {
            [] => remaining.min(node.width() as u64) as usize,
            tuples => {
                let idx = tuples
                    .partition_point(|t| t.cumulative <= remaining)
                    .min(tuples.len() - 1);
                if idx > 0 {
                    remaining -= tuples[idx - 1].cumulative;
                }
                idx
            }
        })
    }

    /// Cursor at the first item whose key is not less than `key`, or just
    /// past the last item.
    pub(crate) fn at_key<R: ValueReader + ?Sized>(
        store: &R,
        root: &Arc<SeqNode<T>>,
        key: &Value,
    ) -> ValueResult<Self> {
        Self::descend(store, root, |node| match node.tuples() {
            [] => node
                .items()
                .partition_point(|item| item.cmp_key(key) == std::cmp::Ordering::Less),
            tuples => tuples
                .partition_point(|t| t.key.compare(key) == std::cmp::Ordering::Less)
                .min(tuples.len() - 1),
        })
    }

    fn descend<R: ValueReader + ?Sized>(
        store: &R,
        root: &Arc<SeqNode<T>>,
        mut pick: impl FnMut(&SeqNode<T>) -> usize,
    ) -> ValueResult<Self> {
        let kind = root.kind();
        let mut frames = Vec::new();
        let mut node = Arc::clone(root);
        loop {
            let idx = pick(&node);
            let child = match node.tuples().get(idx) {
                Some(tuple) => Some(load_child(store, kind, &tuple.child)?),
                None => None,
            };
            frames.push(Frame { node, idx });
            match child {
                Some(child) => node = child,
                None => break,
            }
        }
        frames.reverse();
        Ok(Self { kind, frames })
    }

    pub(crate) fn kind(&self) -> Kind {
        self.kind
    }

    /// Number of levels, leaf level included.
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn node(&self, level: usize) -> &Arc<SeqNode<T>> {
        &self.frames[level].node
    }

    pub(crate) fn index(&self, level: usize) -> usize {
        self.frames[level].idx
    }

    pub(crate) fn leaf(&self) -> &Arc<SeqNode<T>> {
        self.node(0)
    }

    pub(crate) fn leaf_index(&self) -> usize {
        self.index(0)
    }

    /// The item under the cursor, or `None` past the end.
    pub(crate) fn current(&self) -> Option<&T> {
        self.leaf().items().get(self.leaf_index())
    }

    /// Move the frame at `level` to the start of the next node on that
    /// level. Returns `false`, leaving the cursor untouched, if there is no
    /// next node.
    pub(crate) fn next_node<R: ValueReader + ?Sized>(
        &mut self,
        store: &R,
        level: usize,
    ) -> ValueResult<bool> {
        let parent = level + 1;
        if parent >= self.frames.len() {
            return Ok(false);
        }
        let frame = &self.frames[parent];
        if frame.idx + 1 < frame.node.width() {
            self.frames[parent].idx += 1;
        } else if !self.next_node(store, parent)? {
            return Ok(false);
        }
        let frame = &self.frames[parent];
        let child = load_child(store, self.kind, &frame.node.tuples()[frame.idx].child)?;
        self.frames[level] = Frame {
            node: child,
            idx: 0,
        };
        Ok(true)
    }

    /// Step to the next item. Returns `false` once the cursor is past the
    /// last item.
    pub(crate) fn advance<R: ValueReader + ?Sized>(&mut self, store: &R) -> ValueResult<bool> {
        let leaf = &mut self.frames[0];
        if leaf.idx < leaf.node.width() {
            leaf.idx += 1;
        }
        if leaf.idx < leaf.node.width() {
            return Ok(true);
        }
        self.next_node(store, 0)
    }
}

/// Iterator over sequence items, loading leaves as it reaches them.
pub(crate) struct SequenceIter<'a, T, R: ?Sized> {
    store: &'a R,
    cursor: Cursor<T>,
    started: bool,
    done: bool,
}

impl<'a, T: SequenceItem, R: ValueReader + ?Sized> SequenceIter<'a, T, R> {
    pub(crate) fn new(store: &'a R, cursor: Cursor<T>) -> Self {
        Self {
            store,
            cursor,
            started: false,
            done: false,
        }
    }
}

impl<T: SequenceItem, R: ValueReader + ?Sized> Iterator for SequenceIter<'_, T, R> {
    type Item = ValueResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.started {
            match self.cursor.advance(self.store) {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.started = true;
        match self.cursor.current() {
            Some(item) => Some(Ok(item.clone())),
            None => {
                self.done = true;
                None
            }
        }
    }
}
