//! `chunkodb` is a content-addressed object store that de-duplicates
//! large blobs by splitting them into chunks along a rolling-hash
//! boundary.
//!
//! Writing a blob through the [`ChunkedBackend`] stores the content as
//! single-instance chunk objects plus a small manifest listing them;
//! reading the manifest's id reassembles the original bytes. Similar
//! blobs share chunk storage, so repeated edits of a large file cost a
//! handful of new chunks instead of a full copy.
//!
//! The crate also carries the host side the backend plugs into: a
//! small object database (loose objects and packs), repository
//! plumbing (index, trees, commits, revision walk) and the maintenance
//! operations ([`repack`], [`fsck`]) that traverse manifests so chunk
//! objects survive garbage collection.
//!
//! ```no_run
//! use chunkodb::{ChunkedBackend, ObjectKind, OdbBackend, Repository};
//!
//! # fn main() -> chunkodb::Result<()> {
//! let repo = Repository::init(std::path::Path::new("/tmp/demo"))?;
//! let mut backend = ChunkedBackend::open(repo.path())?;
//!
//! let oid = backend.write(ObjectKind::Blob, &vec![7u8; 1 << 20])?;
//! let (_, data) = backend.read(oid)?;
//! assert_eq!(data.len(), 1 << 20);
//! # Ok(())
//! # }
//! ```

mod base;
mod content;
mod error;
mod odb;
mod repo;

pub use crate::base::init_env;
pub use crate::base::stats;
pub use crate::content::chunk::{Chunk, ChunkPool};
pub use crate::content::chunker::{Chunker, MAX_CHUNK, MIN_CHUNK};
pub use crate::content::manifest::Manifest;
pub use crate::content::rollsum::Rollsum;
pub use crate::error::{Error, Result};
pub use crate::odb::{
    ChunkedBackend, ObjectKind, ObjectStore, Odb, OdbBackend, Oid,
    PackReader, PackWriter, OID_HEX_LEN, OID_RAW_LEN,
};
pub use crate::repo::commit::{Commit, Signature};
pub use crate::repo::maint::{fsck, repack};
pub use crate::repo::traverse::{reachable_oids, OidSet};
pub use crate::repo::tree::{Tree, TreeEntry};
pub use crate::repo::{Repository, DEFAULT_BRANCH};
