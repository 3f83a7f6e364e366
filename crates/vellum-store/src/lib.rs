//! Chunk persistence for Vellum.
//!
//! The value layer never talks to a physical backend directly. It hands
//! encoded chunks to a [`BatchStore`], which decouples "schedule this chunk
//! for persistence" from "this chunk is durable". Backends only need to
//! implement the small [`ChunkStore`] capability: get, put, close.
//!
//! # Stores
//!
//! - [`InMemoryChunkStore`]: `HashMap`-based [`ChunkStore`] for tests and embedding
//! - [`BatchStoreAdaptor`]: naive [`BatchStore`]: every scheduled put is an immediate put
//! - [`BufferedBatchStore`]: buffers puts and validates embedded references on flush,
//!   using caller-supplied [`Hints`] to skip already-covered sub-graphs
//!
//! # Design Rules
//!
//! 1. Chunks are immutable once written (content addressing guarantees this).
//! 2. A scheduled chunk is durable no later than the next `flush` or `close`.
//! 3. Concurrent `schedule_put` calls are serialized by the store itself.
//! 4. Stores never interpret chunk contents; reference extraction is delegated
//!    to a [`RefWalker`] supplied by the layer that owns the format.
//! 5. All backend errors are propagated, never silently retried.

pub mod batch;
pub mod buffered;
pub mod chunk;
pub mod error;
pub mod memory;
pub mod traits;

pub use batch::{BatchStore, BatchStoreAdaptor, Hints};
pub use buffered::{BatchStoreConfig, BufferedBatchStore, RefWalker};
pub use chunk::Chunk;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryChunkStore;
pub use traits::ChunkStore;
