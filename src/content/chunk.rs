//! Chunk descriptors and the content-addressed chunk pool.

use linked_hash_map::LinkedHashMap;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::base::stats;
use crate::error::Result;
use crate::odb::{ObjectKind, ObjectStore, Oid};

/// A de-duplicated piece of a logical blob. The payload lives in the
/// object store as a blob under `oid`; the descriptor only carries the
/// address and the payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub oid: Oid,
    pub len: usize,
}

/// Content-addressed set of the chunks a backend has seen, at most one
/// descriptor per fingerprint. Enumeration follows insertion order.
///
/// Dropping the pool (or calling [`free_all`](ChunkPool::free_all))
/// releases the descriptors only; the chunk objects stay in the store.
#[derive(Debug, Default)]
pub struct ChunkPool {
    chunks: LinkedHashMap<Oid, Chunk>,
    total_bytes: usize,
}

impl ChunkPool {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns the pooled descriptor for `data`, writing the payload to
    /// the store the first time this content is seen.
    ///
    /// The fingerprint is computed without writing; only a pool miss
    /// touches the store. When the store write fails the pool is left
    /// unchanged.
    pub fn get_or_create(
        &mut self,
        store: &mut ObjectStore,
        data: &[u8],
    ) -> Result<Chunk> {
        let oid = store.hash(ObjectKind::Blob, data);
        if let Some(chunk) = self.chunks.get(&oid) {
            trace!("chunk {} reused", oid);
            return Ok(*chunk);
        }

        store.write(ObjectKind::Blob, data)?;
        let chunk = Chunk {
            oid,
            len: data.len(),
        };
        self.chunks.insert(oid, chunk);
        self.total_bytes += chunk.len;
        stats::add_chunk(chunk.len);
        trace!("chunk {} created, {} bytes", oid, chunk.len);
        Ok(chunk)
    }

    /// Drops every descriptor and zeroes the aggregates.
    pub fn free_all(&mut self) {
        stats::remove_chunks(self.chunks.len(), self.total_bytes);
        self.chunks.clear();
        self.total_bytes = 0;
    }

    pub fn contains(&self, oid: &Oid) -> bool {
        self.chunks.contains_key(oid)
    }

    pub fn count(&self) -> usize {
        self.chunks.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }
}

impl Drop for ChunkPool {
    fn drop(&mut self) {
        self.free_all();
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn scratch_store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new("chunk-pool-test").unwrap();
        let store = ObjectStore::create(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn get_or_create_dedups_by_content() {
        let (_dir, mut store) = scratch_store();
        let mut pool = ChunkPool::new();

        let a = pool.get_or_create(&mut store, b"alpha").unwrap();
        let b = pool.get_or_create(&mut store, b"beta").unwrap();
        let a2 = pool.get_or_create(&mut store, b"alpha").unwrap();

        assert_eq!(a, a2);
        assert_ne!(a.oid, b.oid);
        assert_eq!(pool.count(), 2);
        assert_eq!(pool.total_bytes(), "alpha".len() + "beta".len());
    }

    #[test]
    fn created_chunks_are_stored_blobs() {
        let (_dir, mut store) = scratch_store();
        let mut pool = ChunkPool::new();

        let chunk = pool.get_or_create(&mut store, b"payload").unwrap();
        let (kind, data) = store.read(chunk.oid).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(data, b"payload");
    }

    #[test]
    fn free_all_keeps_store_objects() {
        let (_dir, mut store) = scratch_store();
        let mut pool = ChunkPool::new();

        let chunk = pool.get_or_create(&mut store, b"sticky").unwrap();
        pool.free_all();

        assert_eq!(pool.count(), 0);
        assert_eq!(pool.total_bytes(), 0);
        assert!(store.read(chunk.oid).is_ok());
    }

    #[test]
    fn enumeration_follows_insertion_order() {
        let (_dir, mut store) = scratch_store();
        let mut pool = ChunkPool::new();

        let first = pool.get_or_create(&mut store, b"one").unwrap();
        let second = pool.get_or_create(&mut store, b"two").unwrap();
        pool.get_or_create(&mut store, b"one").unwrap();

        let order: Vec<Oid> = pool.iter().map(|c| c.oid).collect();
        assert_eq!(order, vec![first.oid, second.oid]);
    }
}
