use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;
use vellum_hash::Hash;

use crate::chunk::Chunk;
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

/// Batch-oriented chunk persistence.
///
/// Instead of `put`, a batch store offers `schedule_put`, which enqueues a
/// chunk to be written at a possibly later time. A scheduled chunk is
/// guaranteed durable after the next `flush` or `close`.
///
/// Validating a chunk means checking that every reference embedded in it
/// points at a durable chunk. Done naively that is one read per reference.
/// [`Hints`] name a smaller set of durable chunks whose own references cover
/// many of the new chunk's references, so checking only the hinted chunks
/// validates the rest.
pub trait BatchStore: Send + Sync {
    /// Read a chunk, including chunks scheduled but not yet flushed.
    ///
    /// Returns `Ok(None)` if the chunk is absent.
    fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>>;

    /// Enqueue `chunk` for persistence. May or may not block until it is
    /// persisted.
    fn schedule_put(&self, chunk: Chunk, hints: &Hints) -> StoreResult<()>;

    /// Block until every chunk scheduled before this call is durable.
    fn flush(&self) -> StoreResult<()>;

    /// Flush, then release the backing store. The batch store is unusable
    /// afterwards.
    fn close(&self) -> StoreResult<()>;
}

/// A set of chunk hashes used to speed up validation of scheduled chunks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Hints(BTreeSet<Hash>);

impl Hints {
    /// An empty hint set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hinted hash. Returns `true` if it was not already present.
    pub fn insert(&mut self, hash: Hash) -> bool {
        self.0.insert(hash)
    }

    /// Returns `true` if `hash` is hinted.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.0.contains(hash)
    }

    /// Number of hinted hashes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no hints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the hinted hashes in order.
    pub fn iter(&self) -> impl Iterator<Item = &Hash> {
        self.0.iter()
    }

    /// Merge another hint set into this one.
    pub fn merge(&mut self, other: &Hints) {
        self.0.extend(other.0.iter().copied());
    }

    /// Remove every hint.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<Hash> for Hints {
    fn from_iter<I: IntoIterator<Item = Hash>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Hash> for Hints {
    fn extend<I: IntoIterator<Item = Hash>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Naive [`BatchStore`] over a [`ChunkStore`].
///
/// Provides no batching and no validation: `schedule_put` is an immediate
/// `put` and hints are ignored. Only suitable for backends that can put
/// quickly and are themselves authoritative. Takes ownership of the backing
/// store's lifetime: closing the adaptor closes the backend.
pub struct BatchStoreAdaptor {
    backing: Arc<dyn ChunkStore>,
    closed: AtomicBool,
}

impl BatchStoreAdaptor {
    /// Wrap a chunk store.
    pub fn new(backing: Arc<dyn ChunkStore>) -> Self {
        Self {
            backing,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl BatchStore for BatchStoreAdaptor {
    fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>> {
        self.ensure_open()?;
        self.backing.get(hash)
    }

    fn schedule_put(&self, chunk: Chunk, _hints: &Hints) -> StoreResult<()> {
        self.ensure_open()?;
        debug!(hash = %chunk.hash().short_hex(), len = chunk.len(), "direct chunk put");
        self.backing.put(&chunk)
    }

    fn flush(&self) -> StoreResult<()> {
        self.ensure_open()
    }

    fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        self.backing.close()
    }
}

impl std::fmt::Debug for BatchStoreAdaptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchStoreAdaptor")
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}
