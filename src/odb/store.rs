//! The base object store: loose objects in front of any number of
//! packs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::odb::loose::LooseStore;
use crate::odb::pack::PackReader;
use crate::odb::{ObjectKind, OdbBackend, Oid};

pub struct ObjectStore {
    dir: PathBuf,
    loose: LooseStore,
    packs: Vec<PackReader>,
}

impl ObjectStore {
    /// Opens an existing objects directory, loading every pack under
    /// `pack/` into its in-memory index.
    pub fn open(objects_dir: &Path) -> Result<ObjectStore> {
        if !objects_dir.is_dir() {
            return Err(Error::Storage(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no objects directory at {}", objects_dir.display()),
            )));
        }
        let packs = load_packs(&objects_dir.join("pack"))?;
        Ok(ObjectStore {
            dir: objects_dir.to_path_buf(),
            loose: LooseStore::new(objects_dir),
            packs,
        })
    }

    /// Creates the objects directory if needed, then opens it.
    pub fn create(objects_dir: &Path) -> Result<ObjectStore> {
        fs::create_dir_all(objects_dir)?;
        ObjectStore::open(objects_dir)
    }

    pub fn objects_dir(&self) -> &Path {
        &self.dir
    }

    /// Fingerprint `data` would get as an object of `kind`, without
    /// writing.
    pub fn hash(&self, kind: ObjectKind, data: &[u8]) -> Oid {
        Oid::hash(kind, data)
    }

    pub fn write(&mut self, kind: ObjectKind, data: &[u8]) -> Result<Oid> {
        self.loose.write(kind, data)
    }

    /// Reads an object, loose copies first, then the packs.
    pub fn read(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)> {
        match self.loose.read(oid) {
            Err(Error::NotFound) => {}
            other => return other,
        }
        for pack in &self.packs {
            match pack.read(oid) {
                Err(Error::NotFound) => continue,
                other => return other,
            }
        }
        Err(Error::NotFound)
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.loose.contains(oid) || self.packs.iter().any(|p| p.contains(oid))
    }

    /// Ids of all objects currently stored loose (packed objects not
    /// included).
    pub fn loose_oids(&self) -> Result<Vec<Oid>> {
        self.loose.oids()
    }

    pub fn remove_loose(&mut self, oid: Oid) -> Result<()> {
        self.loose.remove(oid)
    }

    pub fn packs(&self) -> &[PackReader] {
        &self.packs
    }
}

fn load_packs(pack_dir: &Path) -> Result<Vec<PackReader>> {
    if !pack_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(pack_dir)?
        .collect::<io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "pack"))
        .collect();
    paths.sort();

    let mut packs = Vec::with_capacity(paths.len());
    for path in paths {
        packs.push(PackReader::open(&path)?);
    }
    debug!("{} pack(s) loaded from {}", packs.len(), pack_dir.display());
    Ok(packs)
}

impl OdbBackend for ObjectStore {
    fn read(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)> {
        ObjectStore::read(self, oid)
    }

    fn write(&mut self, kind: ObjectKind, data: &[u8]) -> Result<Oid> {
        ObjectStore::write(self, kind, data)
    }

    fn contains(&self, oid: Oid) -> bool {
        ObjectStore::contains(self, oid)
    }
}
