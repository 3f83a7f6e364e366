use vellum_hash::Hash;

use crate::chunk::Chunk;
use crate::error::StoreResult;

/// Physical chunk persistence.
///
/// All implementations must satisfy these invariants:
/// - Chunks are immutable once written. The same bytes always map to the
///   same hash, so `put` of an existing chunk is a no-op.
/// - Concurrent reads are always safe.
/// - The store never interprets chunk contents.
/// - All I/O errors are propagated, never silently ignored.
/// - After `close`, every operation fails with [`StoreError::Closed`](crate::StoreError::Closed).
pub trait ChunkStore: Send + Sync {
    /// Read a chunk by hash.
    ///
    /// Returns `Ok(None)` if the chunk does not exist.
    fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>>;

    /// Check whether a chunk exists.
    fn has(&self, hash: &Hash) -> StoreResult<bool> {
        Ok(self.get(hash)?.is_some())
    }

    /// Write a chunk. Idempotent.
    fn put(&self, chunk: &Chunk) -> StoreResult<()>;

    /// Write several chunks.
    ///
    /// Default implementation calls `put()` for each chunk. Backends may
    /// override for better performance (e.g., a single fsync).
    fn put_many(&self, chunks: &[Chunk]) -> StoreResult<()> {
        chunks.iter().try_for_each(|c| self.put(c))
    }

    /// Release the underlying resource.
    fn close(&self) -> StoreResult<()>;
}
