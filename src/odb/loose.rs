//! Loose objects: one zlib-deflated file per object, fanned out over
//! 256 two-hex-digit subdirectories of the objects directory.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::trace;

use crate::error::{Error, Result};
use crate::odb::{ObjectKind, Oid, OID_HEX_LEN};

pub(super) struct LooseStore {
    dir: PathBuf,
}

impl LooseStore {
    pub fn new(objects_dir: &Path) -> LooseStore {
        LooseStore {
            dir: objects_dir.to_path_buf(),
        }
    }

    fn object_path(&self, oid: Oid) -> PathBuf {
        let hex = oid.to_hex();
        self.dir.join(&hex[..2]).join(&hex[2..])
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.object_path(oid).exists()
    }

    /// Stores `data` under its content id. Rewriting existing content is
    /// a no-op; the file lands via temp-file plus rename so a reader
    /// never sees a half-written object.
    pub fn write(&mut self, kind: ObjectKind, data: &[u8]) -> Result<Oid> {
        let oid = Oid::hash(kind, data);
        let path = self.object_path(oid);
        if path.exists() {
            return Ok(oid);
        }

        let parent = path.parent().ok_or_else(|| {
            Error::Storage(io::Error::new(
                io::ErrorKind::InvalidInput,
                "loose object path has no parent",
            ))
        })?;
        fs::create_dir_all(parent)?;

        let tmp = path.with_extension("tmp");
        {
            let file = File::create(&tmp)?;
            let mut encoder = ZlibEncoder::new(file, Compression::default());
            encoder.write_all(kind.as_str().as_bytes())?;
            encoder.write_all(b" ")?;
            encoder.write_all(data.len().to_string().as_bytes())?;
            encoder.write_all(b"\0")?;
            encoder.write_all(data)?;
            encoder.finish()?;
        }
        fs::rename(&tmp, &path)?;
        trace!("loose object {} written, {} bytes", oid, data.len());
        Ok(oid)
    }

    pub fn read(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)> {
        let file = match File::open(self.object_path(oid)) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound)
            }
            Err(err) => return Err(err.into()),
        };

        let mut raw = Vec::new();
        ZlibDecoder::new(file).read_to_end(&mut raw)?;
        parse_object(oid, &raw)
    }

    /// Removes the loose file for `oid` if present. The fanout
    /// subdirectory is left behind; sweeping cleans those separately.
    pub fn remove(&mut self, oid: Oid) -> Result<()> {
        match fs::remove_file(self.object_path(oid)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Every object id currently stored loose.
    pub fn oids(&self) -> Result<Vec<Oid>> {
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let prefix = entry.file_name();
            let prefix = match prefix.to_str() {
                Some(name) if name.len() == 2 => name.to_string(),
                _ => continue,
            };
            if !entry.file_type()?.is_dir() {
                continue;
            }

            for file in fs::read_dir(entry.path())? {
                let file = file?;
                let rest = file.file_name();
                let rest = match rest.to_str() {
                    Some(name) if name.len() == OID_HEX_LEN - 2 => name,
                    _ => continue,
                };
                if let Ok(oid) = Oid::from_hex(&format!("{}{}", prefix, rest)) {
                    found.push(oid);
                }
            }
        }
        Ok(found)
    }
}

fn parse_object(oid: Oid, raw: &[u8]) -> Result<(ObjectKind, Vec<u8>)> {
    let header_end = raw
        .iter()
        .position(|&b| b == b'\0')
        .ok_or_else(|| Error::corrupt(format!("loose object {} has no header", oid)))?;
    let header = std::str::from_utf8(&raw[..header_end])
        .map_err(|_| Error::corrupt(format!("loose object {} header", oid)))?;

    let (kind, len) = match header.split_once(' ') {
        Some((kind_str, len_str)) => (
            ObjectKind::parse(kind_str),
            len_str.parse::<usize>().ok(),
        ),
        None => (None, None),
    };
    let kind = kind
        .ok_or_else(|| Error::corrupt(format!("loose object {} kind", oid)))?;
    let len = len
        .ok_or_else(|| Error::corrupt(format!("loose object {} length", oid)))?;

    let data = &raw[header_end + 1..];
    if data.len() != len {
        return Err(Error::corrupt(format!(
            "loose object {} is {} bytes, header says {}",
            oid,
            data.len(),
            len
        )));
    }
    Ok((kind, data.to_vec()))
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn scratch() -> (TempDir, LooseStore) {
        let dir = TempDir::new("loose-test").unwrap();
        let store = LooseStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn write_read_round_trip() {
        let (_dir, mut store) = scratch();

        let oid = store.write(ObjectKind::Blob, b"loose bytes").unwrap();
        assert!(store.contains(oid));

        let (kind, data) = store.read(oid).unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(data, b"loose bytes");
    }

    #[test]
    fn missing_object_is_not_found() {
        let (_dir, store) = scratch();
        let oid = Oid::hash(ObjectKind::Blob, b"missing");
        assert!(matches!(store.read(oid), Err(Error::NotFound)));
        assert!(!store.contains(oid));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let (_dir, mut store) = scratch();
        let first = store.write(ObjectKind::Tree, b"entries").unwrap();
        let second = store.write(ObjectKind::Tree, b"entries").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.oids().unwrap().len(), 1);
    }

    #[test]
    fn enumeration_sees_all_objects() {
        let (_dir, mut store) = scratch();
        let a = store.write(ObjectKind::Blob, b"a").unwrap();
        let b = store.write(ObjectKind::Blob, b"b").unwrap();

        let mut oids = store.oids().unwrap();
        oids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(oids, expected);
    }

    #[test]
    fn remove_then_read_misses() {
        let (_dir, mut store) = scratch();
        let oid = store.write(ObjectKind::Blob, b"short lived").unwrap();
        store.remove(oid).unwrap();
        assert!(matches!(store.read(oid), Err(Error::NotFound)));
    }
}
