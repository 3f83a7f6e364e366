use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use vellum_hash::Hash;

use crate::chunk::Chunk;
use crate::error::{StoreError, StoreResult};
use crate::traits::ChunkStore;

/// In-memory, HashMap-based chunk store.
///
/// Intended for tests and embedding. Chunks are held behind a `RwLock`
/// for safe concurrent access; cloning a chunk only bumps a refcount.
pub struct InMemoryChunkStore {
    chunks: RwLock<HashMap<Hash, Chunk>>,
    closed: AtomicBool,
}

impl InMemoryChunkStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored chunks.
    pub fn total_bytes(&self) -> u64 {
        self.chunks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|c| c.len() as u64)
            .sum()
    }

    /// Sorted list of every stored hash.
    pub fn all_hashes(&self) -> Vec<Hash> {
        let map = self.chunks.read().expect("lock poisoned");
        let mut hashes: Vec<Hash> = map.keys().copied().collect();
        hashes.sort();
        hashes
    }

    /// Returns `true` once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkStore for InMemoryChunkStore {
    fn get(&self, hash: &Hash) -> StoreResult<Option<Chunk>> {
        self.ensure_open()?;
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.get(hash).cloned())
    }

    fn has(&self, hash: &Hash) -> StoreResult<bool> {
        self.ensure_open()?;
        let map = self.chunks.read().expect("lock poisoned");
        Ok(map.contains_key(hash))
    }

    fn put(&self, chunk: &Chunk) -> StoreResult<()> {
        self.ensure_open()?;
        if !chunk.verify() {
            return Err(StoreError::HashMismatch {
                expected: chunk.hash(),
                computed: vellum_hash::ContentHasher::CHUNK.hash(chunk.data()),
            });
        }
        let mut map = self.chunks.write().expect("lock poisoned");
        map.entry(chunk.hash()).or_insert_with(|| chunk.clone());
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryChunkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryChunkStore")
            .field("chunk_count", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &[u8]) -> Chunk {
        Chunk::new(content.to_vec())
    }

    // -----------------------------------------------------------------------
    // Core operations
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let store = InMemoryChunkStore::new();
        let c = chunk(b"hello world");
        store.put(&c).unwrap();
        assert_eq!(store.get(&c.hash()).unwrap(), Some(c.clone()));
        assert!(store.has(&c.hash()).unwrap());
    }

    #[test]
    fn get_missing_returns_none() {
        let store = InMemoryChunkStore::new();
        assert!(store.get(&Hash::of(b"missing")).unwrap().is_none());
        assert!(!store.has(&Hash::of(b"missing")).unwrap());
    }

    #[test]
    fn put_is_idempotent() {
        let store = InMemoryChunkStore::new();
        let c = chunk(b"idempotent");
        store.put(&c).unwrap();
        store.put(&c).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn put_many_writes_all() {
        let store = InMemoryChunkStore::new();
        let chunks = vec![chunk(b"a"), chunk(b"bb"), chunk(b"ccc")];
        store.put_many(&chunks).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.total_bytes(), 6);
        let hashes = store.all_hashes();
        assert!(hashes.windows(2).all(|w| w[0] <= w[1]));
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    #[test]
    fn closed_store_rejects_operations() {
        let store = InMemoryChunkStore::new();
        let c = chunk(b"x");
        store.put(&c).unwrap();
        store.close().unwrap();
        assert!(store.is_closed());
        assert!(matches!(store.get(&c.hash()), Err(StoreError::Closed)));
        assert!(matches!(store.put(&c), Err(StoreError::Closed)));
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_puts_and_reads() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryChunkStore::new());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let c = Chunk::new(vec![i; 16]);
                    store.put(&c).unwrap();
                    assert_eq!(store.get(&c.hash()).unwrap(), Some(c));
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryChunkStore::default();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryChunkStore"));
        assert!(debug.contains("chunk_count"));
    }
}
