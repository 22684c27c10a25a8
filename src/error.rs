use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

use crate::odb::Oid;

/// Errors surfaced by the object database and the chunking backend.
#[derive(Debug, Error)]
pub enum Error {
    /// Lookup miss in the object database.
    #[error("object not found")]
    NotFound,

    /// Underlying storage I/O failure.
    #[error("storage error: {0}")]
    Storage(#[from] io::Error),

    /// Failed to reserve memory for a buffer or descriptor.
    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),

    /// Byte buffer does not follow the manifest line grammar.
    #[error("malformed manifest")]
    ManifestFormat,

    /// A manifest decoded fine but references a chunk that is missing
    /// or unreadable.
    #[error("manifest references unreadable chunk {0}")]
    CorruptManifest(Oid),

    /// Text that should be a 40-hex object id is not one.
    #[error("invalid object id {0:?}")]
    InvalidOid(String),

    /// Stored object bytes do not decode as the expected kind.
    #[error("corrupt object: {0}")]
    InvalidObject(String),

    /// Revision spec that cannot be resolved.
    #[error("cannot resolve revision {0:?}")]
    InvalidSpec(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt(what: impl Into<String>) -> Error {
        Error::InvalidObject(what.into())
    }
}
