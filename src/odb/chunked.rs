//! The chunking backend: stores large blobs as de-duplicated chunks
//! plus a manifest, reassembling them transparently on read.
//!
//! A blob write runs the content through the chunker, pools every chunk
//! (writing only first-seen content) and then stores the manifest as an
//! ordinary blob whose id becomes the logical blob's fingerprint. Chunk
//! writes always land before the manifest, so a manifest observed in
//! the store implies its chunks are present. Non-blob objects pass
//! through untouched.

use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::base::stats;
use crate::content::chunk::{Chunk, ChunkPool};
use crate::content::chunker::Chunker;
use crate::content::manifest::Manifest;
use crate::error::{Error, Result};
use crate::odb::{ObjectKind, ObjectStore, OdbBackend, Oid};

pub struct ChunkedBackend {
    store: ObjectStore,
    path: PathBuf,
    pool: ChunkPool,
}

impl ChunkedBackend {
    /// Opens a backend over the repository at `path`, which must
    /// already have an objects directory.
    pub fn open(path: &Path) -> Result<ChunkedBackend> {
        let store = ObjectStore::open(&path.join("objects"))?;
        Ok(ChunkedBackend {
            store,
            path: path.to_path_buf(),
            pool: ChunkPool::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pool(&self) -> &ChunkPool {
        &self.pool
    }

    /// The chunk list the manifest of logical blob `oid` references.
    /// Test introspection; reads the stored manifest bytes, never the
    /// reassembled content.
    pub fn object_chunks(&self, oid: Oid) -> Result<Vec<Chunk>> {
        let (kind, data) = self.store.read(oid)?;
        if kind != ObjectKind::Blob {
            return Err(Error::ManifestFormat);
        }
        Ok(Manifest::decode(&data)?.entries().to_vec())
    }

    fn write_blob(&mut self, data: &[u8]) -> Result<Oid> {
        let mut manifest = Manifest::new();
        for piece in Chunker::new(data) {
            let chunk = self.pool.get_or_create(&mut self.store, piece)?;
            manifest.push(chunk);
        }

        let oid = self.store.write(ObjectKind::Blob, &manifest.encode())?;
        debug!(
            "blob {} stored as {} chunk(s), {} bytes",
            oid,
            manifest.len(),
            data.len()
        );
        Ok(oid)
    }

    fn read_object(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)> {
        let (kind, data) = self.store.read(oid)?;
        if kind != ObjectKind::Blob {
            return Ok((kind, data));
        }

        let manifest = match Manifest::decode(&data) {
            Ok(manifest) if !manifest.is_empty() => manifest,
            // not a manifest (or an empty one): the bytes are the blob
            _ => return Ok((kind, data)),
        };

        trace!("reassembling {} from {} chunk(s)", oid, manifest.len());
        let mut out = Vec::new();
        out.try_reserve_exact(manifest.total_len())?;
        for chunk in manifest.entries() {
            let (chunk_kind, chunk_data) = match self.store.read(chunk.oid) {
                Ok(object) => object,
                Err(Error::NotFound) => {
                    return Err(Error::CorruptManifest(chunk.oid))
                }
                Err(err) => return Err(err),
            };
            if chunk_kind != ObjectKind::Blob || chunk_data.len() != chunk.len
            {
                return Err(Error::CorruptManifest(chunk.oid));
            }
            out.extend_from_slice(&chunk_data);
        }
        Ok((ObjectKind::Blob, out))
    }
}

impl OdbBackend for ChunkedBackend {
    fn read(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)> {
        stats::record_read();
        self.read_object(oid)
    }

    fn write(&mut self, kind: ObjectKind, data: &[u8]) -> Result<Oid> {
        stats::record_write();
        if kind != ObjectKind::Blob {
            return self.store.write(kind, data);
        }
        self.write_blob(data)
    }

    fn contains(&self, oid: Oid) -> bool {
        self.store.contains(oid)
    }
}

impl Drop for ChunkedBackend {
    fn drop(&mut self) {
        stats::record_free();
        self.pool.free_all();
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;
    use crate::content::chunker::MAX_CHUNK;

    fn scratch_backend() -> (TempDir, ChunkedBackend) {
        let dir = TempDir::new("chunked-test").unwrap();
        ObjectStore::create(&dir.path().join("objects")).unwrap();
        let backend = ChunkedBackend::open(dir.path()).unwrap();
        (dir, backend)
    }

    #[test]
    fn blob_write_stores_a_manifest() {
        let (_dir, mut backend) = scratch_backend();
        let data = vec![0x42u8; MAX_CHUNK * 2 + 100];

        let oid = backend.write(ObjectKind::Blob, &data).unwrap();

        let chunks = backend.object_chunks(oid).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.len).sum::<usize>(),
            data.len()
        );
        assert_eq!(backend.pool().count(), chunks.len() - 1); // repeated block dedups

        let (kind, read_back) = backend.read(oid).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(read_back, data);
    }

    #[test]
    fn empty_blob_round_trips() {
        let (_dir, mut backend) = scratch_backend();
        let oid = backend.write(ObjectKind::Blob, b"").unwrap();
        let (kind, data) = backend.read(oid).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert!(data.is_empty());
        assert!(backend.object_chunks(oid).unwrap().is_empty());
    }

    #[test]
    fn non_blob_objects_pass_through() {
        let (_dir, mut backend) = scratch_backend();
        let payload = b"tree-ish bytes";

        let oid = backend.write(ObjectKind::Tree, payload).unwrap();
        assert_eq!(oid, Oid::hash(ObjectKind::Tree, payload));

        let (kind, data) = backend.read(oid).unwrap();
        assert_eq!(kind, ObjectKind::Tree);
        assert_eq!(data, payload);
    }

    #[test]
    fn missing_chunk_is_corrupt_manifest() {
        let (_dir, mut backend) = scratch_backend();
        let data = vec![0x17u8; MAX_CHUNK + 10];
        let oid = backend.write(ObjectKind::Blob, &data).unwrap();

        let victim = backend.object_chunks(oid).unwrap()[0].oid;
        backend.store.remove_loose(victim).unwrap();

        match backend.read(oid) {
            Err(Error::CorruptManifest(missing)) => {
                assert_eq!(missing, victim)
            }
            other => panic!("expected corrupt manifest, got {:?}", other),
        }
    }

    #[test]
    fn missing_object_read_is_not_found() {
        let (_dir, backend) = scratch_backend();
        let oid = Oid::hash(ObjectKind::Blob, b"nowhere");
        assert!(matches!(backend.read(oid), Err(Error::NotFound)));
    }
}
