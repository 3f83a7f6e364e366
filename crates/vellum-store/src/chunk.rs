use bytes::Bytes;
use vellum_hash::{ContentHasher, Hash};

use crate::error::{StoreError, StoreResult};

/// An immutable, content-addressed block of bytes: the unit of storage.
///
/// The hash is computed once, when the chunk is created from its data, and
/// never changes. Cloning a chunk is cheap (the bytes are reference counted).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    hash: Hash,
    data: Bytes,
}

impl Chunk {
    /// Create a chunk, computing its hash from `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let hash = ContentHasher::CHUNK.hash(&data);
        Self { hash, data }
    }

    /// Rebuild a chunk from a hash and data read back from a backend,
    /// verifying that they agree.
    pub fn from_parts(hash: Hash, data: impl Into<Bytes>) -> StoreResult<Self> {
        let data = data.into();
        let computed = ContentHasher::CHUNK.hash(&data);
        if computed != hash {
            return Err(StoreError::HashMismatch {
                expected: hash,
                computed,
            });
        }
        Ok(Self { hash, data })
    }

    /// The empty chunk: null hash, no data. Stands for "absent".
    pub fn empty() -> Self {
        Self {
            hash: Hash::null(),
            data: Bytes::new(),
        }
    }

    /// Returns `true` for the empty chunk.
    pub fn is_empty(&self) -> bool {
        self.hash.is_null()
    }

    /// The content address of this chunk.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The chunk bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the chunk data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Recompute the digest and compare it to the stored hash.
    pub fn verify(&self) -> bool {
        ContentHasher::CHUNK.verify(&self.data, &self.hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_computed_from_data() {
        let chunk = Chunk::new(b"abc".to_vec());
        assert_eq!(chunk.hash(), ContentHasher::CHUNK.hash(b"abc"));
        assert_eq!(chunk.data(), b"abc");
        assert_eq!(chunk.len(), 3);
        assert!(chunk.verify());
    }

    #[test]
    fn from_parts_rejects_mismatch() {
        let good = Chunk::new(b"abc".to_vec());
        assert_eq!(Chunk::from_parts(good.hash(), b"abc".to_vec()).unwrap(), good);
        let err = Chunk::from_parts(good.hash(), b"abd".to_vec()).unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
    }

    #[test]
    fn empty_chunk() {
        let empty = Chunk::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
        assert!(!Chunk::new(Vec::new()).is_empty());
    }
}
