//! Reading and writing values through a [`BatchStore`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use vellum_hash::Hash;
use vellum_store::{
    BatchStore, BatchStoreAdaptor, BatchStoreConfig, BufferedBatchStore, Chunk, ChunkStore,
    Hints, InMemoryChunkStore, RefWalker, StoreError, StoreResult,
};

use crate::error::ValueResult;
use crate::reference::Ref;
use crate::sequence::{BoundaryStrategy, ChunkerConfig};
use crate::value::{height_of, Value};

/// Loads values by hash.
pub trait ValueReader: Send + Sync {
    /// Read and decode the value stored under `hash`. `Ok(None)` if absent.
    fn read_value(&self, hash: &Hash) -> ValueResult<Option<Value>>;
}

/// Stores values and decides how collections are chunked.
pub trait ValueWriter: ValueReader {
    /// Schedule `value`'s chunk for persistence and return a ref to it.
    fn write_value(&self, value: &Value) -> ValueResult<Ref>;

    /// The boundary strategy collections are chunked with.
    fn boundary(&self) -> &dyn BoundaryStrategy;
}

/// Configuration for [`ValueStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueStoreConfig {
    pub chunker: ChunkerConfig,
    /// Decoded values kept in memory. Zero disables the cache.
    pub cache_capacity: usize,
    /// Ref-to-parent entries remembered for write hints. Zero disables
    /// hints.
    pub hint_capacity: usize,
}

impl Default for ValueStoreConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            cache_capacity: 4096,
            hint_capacity: DEFAULT_HINT_CAPACITY,
        }
    }
}

const DEFAULT_HINT_CAPACITY: usize = 65_536;

// =============================================================================
// Cache
// =============================================================================

struct FifoInner<V> {
    entries: HashMap<Hash, V>,
    order: VecDeque<Hash>,
}

/// Map keyed by hash holding at most `capacity` entries, evicting the
/// oldest first.
struct FifoMap<V> {
    capacity: usize,
    inner: RwLock<FifoInner<V>>,
}

impl<V: Clone> FifoMap<V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: RwLock::new(FifoInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    fn get(&self, key: &Hash) -> Option<V> {
        self.inner
            .read()
            .expect("lock poisoned")
            .entries
            .get(key)
            .cloned()
    }

    fn insert(&self, key: Hash, value: V) {
        self.insert_all([(key, value)]);
    }

    fn insert_all(&self, items: impl IntoIterator<Item = (Hash, V)>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.write().expect("lock poisoned");
        for (key, value) in items {
            if inner.entries.insert(key, value).is_none() {
                inner.order.push_back(key);
            }
        }
        while inner.order.len() > self.capacity {
            if let Some(evicted) = inner.order.pop_front() {
                inner.entries.remove(&evicted);
            }
        }
    }

    fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").entries.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner.entries.clear();
        inner.order.clear();
    }
}

/// Bounded cache of decoded values, evicting the oldest entry first.
///
/// Values are immutable and addressed by content, so racing inserts of the
/// same hash store the same value.
pub struct ValueCache {
    map: FifoMap<Value>,
}

impl ValueCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            map: FifoMap::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.map.capacity
    }

    pub fn get(&self, hash: &Hash) -> Option<Value> {
        self.map.get(hash)
    }

    pub fn insert(&self, hash: Hash, value: Value) {
        self.map.insert(hash, value);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.map.clear();
    }
}

impl std::fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueCache")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

// =============================================================================
// Ref walker
// =============================================================================

/// [`RefWalker`] that decodes chunks as values.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChunkRefWalker;

impl RefWalker for ChunkRefWalker {
    fn refs(&self, chunk: &Chunk) -> StoreResult<Vec<Hash>> {
        let value = Value::decode(chunk).map_err(|e| StoreError::Corrupt {
            hash: chunk.hash(),
            reason: e.to_string(),
        })?;
        Ok(value.chunks().iter().map(Ref::target).collect())
    }
}

// =============================================================================
// Value store
// =============================================================================

/// Values over a [`BatchStore`].
///
/// Every value read is remembered as the parent of the refs it embeds.
/// When a later write embeds one of those refs, the parent is passed to
/// the batch store as a hint, since the parent is durable and already
/// covers the ref. At most `hint_capacity` of these entries are kept,
/// oldest evicted first.
pub struct ValueStore {
    batch: Arc<dyn BatchStore>,
    cache: Arc<ValueCache>,
    boundary: Box<dyn BoundaryStrategy>,
    ref_hints: FifoMap<Hash>,
}

impl ValueStore {
    /// A store over `batch` with the default configuration.
    pub fn new(batch: Arc<dyn BatchStore>) -> Self {
        Self::with_config(batch, &ValueStoreConfig::default())
    }

    pub fn with_config(batch: Arc<dyn BatchStore>, config: &ValueStoreConfig) -> Self {
        Self::build(
            batch,
            Arc::new(ValueCache::new(config.cache_capacity)),
            config.chunker.build(),
            config.hint_capacity,
        )
    }

    /// A store sharing `cache` with other stores.
    pub fn with_cache(
        batch: Arc<dyn BatchStore>,
        cache: Arc<ValueCache>,
        boundary: Box<dyn BoundaryStrategy>,
    ) -> Self {
        Self::build(batch, cache, boundary, DEFAULT_HINT_CAPACITY)
    }

    fn build(
        batch: Arc<dyn BatchStore>,
        cache: Arc<ValueCache>,
        boundary: Box<dyn BoundaryStrategy>,
        hint_capacity: usize,
    ) -> Self {
        Self {
            batch,
            cache,
            boundary,
            ref_hints: FifoMap::new(hint_capacity),
        }
    }

    /// A store over a fresh in-memory chunk store.
    pub fn in_memory() -> Self {
        Self::in_memory_with(&ValueStoreConfig::default())
    }

    pub fn in_memory_with(config: &ValueStoreConfig) -> Self {
        let backing = Arc::new(InMemoryChunkStore::new());
        Self::with_config(Arc::new(BatchStoreAdaptor::new(backing)), config)
    }

    /// A store that buffers writes over `backing` and validates the refs
    /// of buffered chunks on flush.
    pub fn buffered(
        backing: Arc<dyn ChunkStore>,
        batch_config: BatchStoreConfig,
        config: &ValueStoreConfig,
    ) -> Self {
        let batch = BufferedBatchStore::new(backing, Arc::new(ChunkRefWalker), batch_config);
        Self::with_config(Arc::new(batch), config)
    }

    pub fn batch_store(&self) -> &Arc<dyn BatchStore> {
        &self.batch
    }

    pub fn cache(&self) -> &Arc<ValueCache> {
        &self.cache
    }

    /// Hints for a chunk embedding `refs`: the known parents of those refs.
    fn hints_for(&self, refs: &[Ref]) -> Hints {
        refs.iter()
            .filter_map(|r| self.ref_hints.get(&r.target()))
            .collect()
    }

    fn remember_parent(&self, parent: Hash, refs: &[Ref]) {
        if refs.is_empty() {
            return;
        }
        self.ref_hints
            .insert_all(refs.iter().map(|r| (r.target(), parent)));
    }

    /// Block until every written value is durable.
    pub fn flush(&self) -> ValueResult<()> {
        self.batch.flush()?;
        debug!("value store flushed");
        Ok(())
    }

    /// Flush, then close the batch store.
    pub fn close(&self) -> ValueResult<()> {
        self.batch.close()?;
        self.cache.clear();
        self.ref_hints.clear();
        Ok(())
    }
}

impl ValueReader for ValueStore {
    fn read_value(&self, hash: &Hash) -> ValueResult<Option<Value>> {
        if let Some(value) = self.cache.get(hash) {
            return Ok(Some(value));
        }
        let Some(chunk) = self.batch.get(hash)? else {
            return Ok(None);
        };
        let value = Value::decode(&chunk)?;
        let refs = value.chunks();
        self.remember_parent(*hash, &refs);
        trace!(hash = %hash.short_hex(), kind = %value.kind(), refs = refs.len(), "read value");
        self.cache.insert(*hash, value.clone());
        Ok(Some(value))
    }
}

impl ValueWriter for ValueStore {
    fn write_value(&self, value: &Value) -> ValueResult<Ref> {
        let chunk = value.encode();
        let hash = chunk.hash();
        let refs = value.chunks();
        let hints = self.hints_for(&refs);
        trace!(
            hash = %hash.short_hex(),
            kind = %value.kind(),
            len = chunk.len(),
            refs = refs.len(),
            hints = hints.len(),
            "write value"
        );
        self.batch.schedule_put(chunk, &hints)?;
        self.cache.insert(hash, value.clone());
        Ok(Ref::new(hash, value.type_of(), height_of(&refs)))
    }

    fn boundary(&self) -> &dyn BoundaryStrategy {
        self.boundary.as_ref()
    }
}

impl std::fmt::Debug for ValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueStore")
            .field("cache", &self.cache)
            .field("boundary", &self.boundary)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValueError;
    use crate::list::List;
    use crate::structs::Struct;
    use crate::types::Type;

    fn fixed(items: usize) -> ValueStoreConfig {
        ValueStoreConfig {
            chunker: ChunkerConfig::Fixed { items },
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Cache
    // -------------------------------------------------------------------------

    #[test]
    fn cache_evicts_oldest() {
        let cache = ValueCache::new(2);
        let values: Vec<Value> = (0..3).map(Value::from).collect();
        for v in &values {
            cache.insert(v.hash(), v.clone());
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&values[0].hash()).is_none());
        assert_eq!(cache.get(&values[2].hash()), Some(values[2].clone()));
    }

    #[test]
    fn zero_capacity_cache_stores_nothing() {
        let cache = ValueCache::new(0);
        let v = Value::from("x");
        cache.insert(v.hash(), v);
        assert!(cache.is_empty());
    }

    // -------------------------------------------------------------------------
    // Store
    // -------------------------------------------------------------------------

    #[test]
    fn write_then_read() {
        let store = ValueStore::in_memory();
        let value = Value::from("hello");
        let r = store.write_value(&value).unwrap();
        assert_eq!(r.target(), value.hash());
        assert_eq!(r.target_type(), &Type::string());
        assert_eq!(store.read_value(&r.target()).unwrap(), Some(value));
        assert_eq!(store.read_value(&Hash::of(b"absent")).unwrap(), None);
    }

    #[test]
    fn reads_decode_without_the_cache() {
        let config = ValueStoreConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        let store = ValueStore::in_memory_with(&config);
        let value = Value::from(12.5);
        let r = store.write_value(&value).unwrap();
        assert!(store.cache().is_empty());
        assert_eq!(r.target_value(&store).unwrap(), value);
    }

    #[test]
    fn ref_height_counts_embedded_refs() {
        let store = ValueStore::in_memory();
        let leaf = store.write_value(&Value::from(1)).unwrap();
        assert_eq!(leaf.height(), 0);
        let parent = store.write_value(&Value::Ref(leaf.clone())).unwrap();
        assert_eq!(parent.height(), 1);
        let grandparent = store.write_value(&Value::Ref(parent)).unwrap();
        assert_eq!(grandparent.height(), 2);
    }

    #[test]
    fn buffered_store_validates_refs_on_flush() {
        let backing = Arc::new(InMemoryChunkStore::new());
        let store = ValueStore::buffered(
            backing.clone(),
            BatchStoreConfig::default(),
            &ValueStoreConfig::default(),
        );
        let dangling = Ref::from_value(&Value::from("never written"));
        store.write_value(&Value::Ref(dangling)).unwrap();
        assert!(matches!(
            store.flush(),
            Err(ValueError::Store(StoreError::MissingReference { .. }))
        ));
    }

    #[test]
    fn buffered_store_flushes_collections() {
        let backing = Arc::new(InMemoryChunkStore::new());
        let store = ValueStore::buffered(backing.clone(), BatchStoreConfig::default(), &fixed(2));
        let values: Vec<Value> = (0..20).map(Value::from).collect();
        let list = List::new(&store, values.clone()).unwrap();
        let r = store.write_value(&Value::List(list)).unwrap();
        store.flush().unwrap();
        assert!(backing.has(&r.target()).unwrap());

        let reader = ValueStore::new(Arc::new(BatchStoreAdaptor::new(backing)));
        let loaded = r.target_value(&reader).unwrap();
        assert_eq!(loaded.as_list().unwrap().to_vec(&reader).unwrap(), values);
    }

    #[test]
    fn refs_read_earlier_become_hints() {
        let backing = Arc::new(InMemoryChunkStore::new());
        let first = ValueStore::buffered(
            backing.clone(),
            BatchStoreConfig::default(),
            &ValueStoreConfig::default(),
        );
        let child = first.write_value(&Value::from("child")).unwrap();
        let holder = Struct::from_fields("Holder", [("child", Value::Ref(child.clone()))]).unwrap();
        let parent = first.write_value(&Value::Struct(holder)).unwrap();
        first.flush().unwrap();

        let second = ValueStore::buffered(
            backing,
            BatchStoreConfig::default(),
            &ValueStoreConfig::default(),
        );
        assert!(second.hints_for(&[child.clone()]).is_empty());
        second.read_value(&parent.target()).unwrap().unwrap();
        let hints = second.hints_for(&[child.clone()]);
        assert!(hints.contains(&parent.target()));

        second.write_value(&Value::Ref(child)).unwrap();
        second.flush().unwrap();
    }

    #[test]
    fn remembered_parents_are_bounded() {
        let config = ValueStoreConfig {
            hint_capacity: 8,
            ..fixed(2)
        };
        let store = ValueStore::in_memory_with(&config);
        let list = List::new(&store, (0..200).map(Value::from).collect()).unwrap();
        let r = store.write_value(&Value::List(list.clone())).unwrap();
        store.cache().clear();

        store.read_value(&r.target()).unwrap().unwrap();
        let children = Value::List(list.clone()).chunks();
        assert!(children.len() > 1);
        assert_eq!(store.hints_for(&children).len(), 1);

        // reading every node of the tree remembers far more refs than fit
        store.cache().clear();
        assert_eq!(list.to_vec(&store).unwrap().len(), 200);
        assert_eq!(store.ref_hints.len(), 8);

        store.close().unwrap();
        assert_eq!(store.ref_hints.len(), 0);
    }

    #[test]
    fn zero_hint_capacity_disables_hints() {
        let store = ValueStore::in_memory_with(&ValueStoreConfig {
            hint_capacity: 0,
            ..fixed(2)
        });
        let list = List::new(&store, (0..20).map(Value::from).collect()).unwrap();
        let r = store.write_value(&Value::List(list.clone())).unwrap();
        store.cache().clear();
        store.read_value(&r.target()).unwrap().unwrap();
        assert!(store.hints_for(&Value::List(list).chunks()).is_empty());
    }

    #[test]
    fn config_serde_fills_defaults() {
        let config: ValueStoreConfig = serde_json::from_str(r#"{"cache_capacity":16}"#).unwrap();
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.hint_capacity, ValueStoreConfig::default().hint_capacity);
        assert_eq!(config.chunker, ChunkerConfig::default());
    }

    #[test]
    fn closed_store_rejects_writes() {
        let store = ValueStore::in_memory();
        store.close().unwrap();
        assert!(matches!(
            store.write_value(&Value::from(1)),
            Err(ValueError::Store(StoreError::Closed))
        ));
    }
}
