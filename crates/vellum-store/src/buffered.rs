use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vellum_hash::Hash;

use crate::batch::{BatchStore, Hints};
use crate::chunk::Chunk;
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

/// Extracts the chunk references embedded in a chunk.
///
/// The store does not know the chunk format; the layer that owns it
/// supplies a walker so that scheduled chunks can be validated.
pub trait RefWalker: Send + Sync {
    /// Hashes of every chunk directly referenced by `chunk`.
    fn refs(&self, chunk: &Chunk) -> StoreResult<Vec<Hash>>;
}

/// Configuration for [`BufferedBatchStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStoreConfig {
    /// Check every embedded reference before chunks are written.
    pub validate_refs: bool,
    /// Flush automatically once this many chunks are pending.
    pub max_pending: usize,
}

impl Default for BatchStoreConfig {
    fn default() -> Self {
        Self {
            validate_refs: true,
            max_pending: 4096,
        }
    }
}

/// Chunks scheduled but not yet written, in scheduling order.
#[derive(Default)]
struct Pending {
    chunks: HashMap<Hash, Chunk>,
    order: Vec<Hash>,
    hints: Hints,
}

impl Pending {
    /// Returns `true` if the chunk was not already pending.
    fn insert(&mut self, chunk: Chunk, hints: &Hints) -> bool {
        let hash = chunk.hash();
        let added = self.chunks.insert(hash, chunk).is_none();
        if added {
            self.order.push(hash);
        }
        self.hints.merge(hints);
        added
    }

    /// Undo the most recent [`Pending::insert`] of `hash`.
    fn withdraw(&mut self, hash: &Hash, hints: Hints) {
        if self.order.last() == Some(hash) {
            self.order.pop();
            self.chunks.remove(hash);
        }
        self.hints = hints;
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn clear(&mut self) {
        self.chunks.clear();
        self.order.clear();
        self.hints.clear();
    }
}

/// [`BatchStore`] that buffers scheduled chunks and validates them on flush.
///
/// On flush, every reference embedded in a pending chunk must resolve to
/// one of:
/// - another pending chunk,
/// - a hinted chunk or a chunk referenced by a hinted chunk (the hinted
///   chunk is read once; its own references were validated when it was
///   written),
/// - a chunk already present in the backing store.
///
/// If any reference is unresolvable the flush fails with
/// [`StoreError::MissingReference`] and the buffer is left intact.
pub struct BufferedBatchStore {
    backing: Arc<dyn ChunkStore>,
    walker: Arc<dyn RefWalker>,
    config: BatchStoreConfig,
    pending: Mutex<Pending>,
    closed: AtomicBool,
}

impl BufferedBatchStore {
    /// Create a buffered store over `backing`, using `walker` to find the
    /// references embedded in scheduled chunks.
    pub fn new(
        backing: Arc<dyn ChunkStore>,
        walker: Arc<dyn RefWalker>,
        config: BatchStoreConfig,
    ) -> Self {
        Self {
            backing,
            walker,
            config,
            pending: Mutex::new(Pending::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &BatchStoreConfig {
        &self.config
    }

    /// Number of chunks scheduled but not yet flushed.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().expect("lock poisoned").order.len()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn flush_pending(&self, pending: &mut Pending) -> StoreResult<()> {
        if pending.is_empty() {
            return Ok(());
        }
        if self.config.validate_refs {
            self.validate(pending)?;
        }
        let chunks: Vec<Chunk> = pending
            .order
            .iter()
            .filter_map(|h| pending.chunks.get(h).cloned())
            .collect();
        self.backing.put_many(&chunks)?;
        info!(count = chunks.len(), "flushed pending chunks");
        pending.clear();
        Ok(())
    }

    /// Hashes known to be durable without further reads: every hinted
    /// chunk and every chunk it references.
    fn covered_by_hints(&self, pending: &Pending) -> StoreResult<HashSet<Hash>> {
        let mut covered = HashSet::new();
        for hint in pending.hints.iter() {
            let chunk = match pending.chunks.get(hint) {
                Some(c) => Some(c.clone()),
                None => self.backing.get(hint)?,
            };
            match chunk {
                Some(chunk) => {
                    covered.insert(*hint);
                    covered.extend(self.walker.refs(&chunk)?);
                }
                None => warn!(hint = %hint.short_hex(), "hinted chunk not found; ignoring hint"),
            }
        }
        Ok(covered)
    }

    fn validate(&self, pending: &Pending) -> StoreResult<()> {
        let covered = self.covered_by_hints(pending)?;
        let mut direct_checks = 0usize;
        for hash in &pending.order {
            let Some(chunk) = pending.chunks.get(hash) else {
                continue;
            };
            for reference in self.walker.refs(chunk)? {
                if pending.chunks.contains_key(&reference) || covered.contains(&reference) {
                    continue;
                }
                direct_checks += 1;
                if !self.backing.has(&reference)? {
                    return Err(StoreError::MissingReference {
                        chunk: *hash,
                        reference,
                    });
                }
            }
        }
        debug!(
            pending = pending.order.len(),
            hinted = covered.len(),
            direct_checks,
            "validated pending chunks"
        );
        Ok(())
    }
}

impl BatchStore for BufferedBatchStore {
    fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>> {
        self.ensure_open()?;
        if let Some(chunk) = self.pending.lock().expect("lock poisoned").chunks.get(hash) {
            return Ok(Some(chunk.clone()));
        }
        self.backing.get(hash)
    }

    /// Schedule `chunk`. If this fills the buffer it is flushed; when that
    /// flush fails, `chunk` is withdrawn again and the error returned, so an
    /// `Err` always means the chunk was not scheduled.
    fn schedule_put(&self, chunk: Chunk, hints: &Hints) -> StoreResult<()> {
        self.ensure_open()?;
        let hash = chunk.hash();
        let mut pending = self.pending.lock().expect("lock poisoned");
        let is_new = !pending.chunks.contains_key(&hash);
        if pending.order.len() + usize::from(is_new) < self.config.max_pending {
            pending.insert(chunk, hints);
            return Ok(());
        }

        let saved_hints = pending.hints.clone();
        let added = pending.insert(chunk, hints);
        debug!(max_pending = self.config.max_pending, "pending buffer full");
        if let Err(err) = self.flush_pending(&mut pending) {
            if added {
                pending.withdraw(&hash, saved_hints);
            } else {
                pending.hints = saved_hints;
            }
            warn!(
                chunk = %hash.short_hex(),
                error = %err,
                "automatic flush failed; chunk not scheduled"
            );
            return Err(err);
        }
        Ok(())
    }

    fn flush(&self) -> StoreResult<()> {
        self.ensure_open()?;
        let mut pending = self.pending.lock().expect("lock poisoned");
        self.flush_pending(&mut pending)
    }

    fn close(&self) -> StoreResult<()> {
        self.ensure_open()?;
        {
            let mut pending = self.pending.lock().expect("lock poisoned");
            self.flush_pending(&mut pending)?;
        }
        self.closed.store(true, Ordering::Release);
        self.backing.close()
    }
}

impl std::fmt::Debug for BufferedBatchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedBatchStore")
            .field("pending", &self.pending_len())
            .field("config", &self.config)
            .finish()
    }
}
