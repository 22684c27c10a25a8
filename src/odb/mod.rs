//! The host object database: content-addressed storage of kind-tagged
//! byte payloads, plus the backend seam the chunking layer plugs into.

mod chunked;
mod loose;
mod oid;
mod pack;
mod store;

pub use self::chunked::ChunkedBackend;
pub use self::oid::{Oid, OID_HEX_LEN, OID_RAW_LEN};
pub use self::pack::{PackReader, PackWriter};
pub use self::store::ObjectStore;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kinds of objects the database stores. Only blobs are subject to
/// chunking; the rest always pass through backends unchanged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    pub fn parse(s: &str) -> Option<ObjectKind> {
        match s {
            "blob" => Some(ObjectKind::Blob),
            "tree" => Some(ObjectKind::Tree),
            "commit" => Some(ObjectKind::Commit),
            _ => None,
        }
    }

    pub(crate) fn as_byte(&self) -> u8 {
        match self {
            ObjectKind::Commit => 1,
            ObjectKind::Tree => 2,
            ObjectKind::Blob => 3,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<ObjectKind> {
        match byte {
            1 => Some(ObjectKind::Commit),
            2 => Some(ObjectKind::Tree),
            3 => Some(ObjectKind::Blob),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set a storage backend offers the database.
///
/// Backends own whatever state they need; teardown happens through
/// `Drop`. Reads answer [`Error::NotFound`] for ids they do not hold so
/// the database can fall through to the next backend.
pub trait OdbBackend {
    fn read(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)>;

    fn write(&mut self, kind: ObjectKind, data: &[u8]) -> Result<Oid>;

    fn contains(&self, oid: Oid) -> bool;
}

/// Object database over one base store and any number of registered
/// backends.
///
/// Reads consult backends from the highest priority down and fall back
/// to the base store; `NotFound` falls through, any other error
/// surfaces. Writes go to the best backend, or the store when none is
/// registered.
pub struct Odb {
    store: ObjectStore,
    backends: Vec<(i32, Box<dyn OdbBackend>)>,
}

impl Odb {
    /// Opens the database over an existing `objects` directory.
    pub fn open(objects_dir: &Path) -> Result<Odb> {
        Ok(Odb {
            store: ObjectStore::open(objects_dir)?,
            backends: Vec::new(),
        })
    }

    /// Registers `backend`; higher `priority` is consulted earlier.
    /// Equal priorities keep registration order.
    pub fn add_backend(&mut self, backend: Box<dyn OdbBackend>, priority: i32) {
        let at = self
            .backends
            .iter()
            .position(|(p, _)| *p < priority)
            .unwrap_or(self.backends.len());
        self.backends.insert(at, (priority, backend));
    }

    pub fn hash(kind: ObjectKind, data: &[u8]) -> Oid {
        Oid::hash(kind, data)
    }

    pub fn read(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)> {
        for (_, backend) in &self.backends {
            match backend.read(oid) {
                Err(Error::NotFound) => continue,
                other => return other,
            }
        }
        self.store.read(oid)
    }

    pub fn write(&mut self, kind: ObjectKind, data: &[u8]) -> Result<Oid> {
        match self.backends.first_mut() {
            Some((_, backend)) => backend.write(kind, data),
            None => self.store.write(kind, data),
        }
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.backends.iter().any(|(_, b)| b.contains(oid))
            || self.store.contains(oid)
    }

    /// The base store, bypassing every registered backend. Maintenance
    /// uses this to see stored bytes as they are on disk.
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ObjectStore {
        &mut self.store
    }
}
