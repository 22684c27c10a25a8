//! Pack files: many objects in one file, written during repack.
//!
//! Layout: `"CPAK"` magic, format version, entry count, then per entry
//! the object id, kind byte, payload length, deflated payload length
//! and the deflated payload itself. A SHA-1 over everything before it
//! trails the file and doubles as the pack's name.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::debug;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};
use crate::odb::{ObjectKind, Oid, OID_RAW_LEN};

const PACK_MAGIC: &[u8; 4] = b"CPAK";
const PACK_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4;
const ENTRY_HEADER_LEN: usize = OID_RAW_LEN + 1 + 4 + 4;

/// Accumulates objects and writes them out as one pack file.
#[derive(Default)]
pub struct PackWriter {
    entries: Vec<(Oid, ObjectKind, Vec<u8>)>,
}

impl PackWriter {
    pub fn new() -> PackWriter {
        Default::default()
    }

    pub fn insert(&mut self, oid: Oid, kind: ObjectKind, data: Vec<u8>) {
        self.entries.push((oid, kind, data));
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Writes the pack into `pack_dir` and returns its path. The file
    /// is named after its trailing checksum and lands via temp-file
    /// plus rename.
    pub fn write(&self, pack_dir: &Path) -> Result<PathBuf> {
        let mut buf = Vec::new();
        buf.extend_from_slice(PACK_MAGIC);
        buf.extend_from_slice(&PACK_VERSION.to_be_bytes());
        buf.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for (oid, kind, data) in &self.entries {
            let mut encoder =
                ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            let compressed = encoder.finish()?;

            buf.extend_from_slice(oid.as_bytes());
            buf.push(kind.as_byte());
            buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
            buf.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
            buf.extend_from_slice(&compressed);
        }

        let checksum: [u8; OID_RAW_LEN] = Sha1::digest(&buf).into();
        buf.extend_from_slice(&checksum);

        fs::create_dir_all(pack_dir)?;
        let name = format!("pack-{}.pack", hex::encode(checksum));
        let path = pack_dir.join(&name);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &buf)?;
        fs::rename(&tmp, &path)?;
        debug!("pack {} written, {} objects", name, self.entries.len());
        Ok(path)
    }
}

struct PackEntry {
    kind: ObjectKind,
    len: usize,
    compressed_len: usize,
    offset: u64,
}

/// Read side of one pack file: an in-memory id index over payloads that
/// stay on disk until asked for.
pub struct PackReader {
    path: PathBuf,
    index: HashMap<Oid, PackEntry>,
}

impl PackReader {
    /// Scans the pack, verifying magic, version and trailing checksum,
    /// and builds the id index.
    pub fn open(path: &Path) -> Result<PackReader> {
        let raw = fs::read(path)?;
        if raw.len() < HEADER_LEN + OID_RAW_LEN
            || &raw[..4] != PACK_MAGIC
        {
            return Err(Error::corrupt(format!(
                "{} is not a pack file",
                path.display()
            )));
        }

        let version = u32::from_be_bytes(raw[4..8].try_into().unwrap());
        if version != PACK_VERSION {
            return Err(Error::corrupt(format!(
                "pack {} has unknown version {}",
                path.display(),
                version
            )));
        }

        let body_len = raw.len() - OID_RAW_LEN;
        let checksum: [u8; OID_RAW_LEN] = Sha1::digest(&raw[..body_len]).into();
        if checksum[..] != raw[body_len..] {
            return Err(Error::corrupt(format!(
                "pack {} checksum mismatch",
                path.display()
            )));
        }

        let count = u32::from_be_bytes(raw[8..12].try_into().unwrap()) as usize;
        let mut index = HashMap::with_capacity(count);
        let mut pos = HEADER_LEN;
        for _ in 0..count {
            if pos + ENTRY_HEADER_LEN > body_len {
                return Err(Error::corrupt(format!(
                    "pack {} is truncated",
                    path.display()
                )));
            }

            let oid = Oid::from_raw(
                raw[pos..pos + OID_RAW_LEN].try_into().unwrap(),
            );
            let kind = ObjectKind::from_byte(raw[pos + OID_RAW_LEN])
                .ok_or_else(|| {
                    Error::corrupt(format!(
                        "pack {} entry {} has unknown kind",
                        path.display(),
                        oid
                    ))
                })?;
            let len = u32::from_be_bytes(
                raw[pos + OID_RAW_LEN + 1..pos + OID_RAW_LEN + 5]
                    .try_into()
                    .unwrap(),
            ) as usize;
            let compressed_len = u32::from_be_bytes(
                raw[pos + OID_RAW_LEN + 5..pos + ENTRY_HEADER_LEN]
                    .try_into()
                    .unwrap(),
            ) as usize;

            pos += ENTRY_HEADER_LEN;
            if pos + compressed_len > body_len {
                return Err(Error::corrupt(format!(
                    "pack {} is truncated",
                    path.display()
                )));
            }
            index.insert(
                oid,
                PackEntry {
                    kind,
                    len,
                    compressed_len,
                    offset: pos as u64,
                },
            );
            pos += compressed_len;
        }

        Ok(PackReader {
            path: path.to_path_buf(),
            index,
        })
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.index.contains_key(&oid)
    }

    pub fn count(&self) -> usize {
        self.index.len()
    }

    pub fn oids(&self) -> impl Iterator<Item = &Oid> {
        self.index.keys()
    }

    pub fn read(&self, oid: Oid) -> Result<(ObjectKind, Vec<u8>)> {
        let entry = self.index.get(&oid).ok_or(Error::NotFound)?;

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(entry.offset))?;
        let mut compressed = vec![0u8; entry.compressed_len];
        file.read_exact(&mut compressed)?;

        let mut data = Vec::with_capacity(entry.len);
        ZlibDecoder::new(io::Cursor::new(compressed))
            .read_to_end(&mut data)?;
        if data.len() != entry.len {
            return Err(Error::corrupt(format!(
                "pack entry {} is {} bytes, index says {}",
                oid,
                data.len(),
                entry.len
            )));
        }
        Ok((entry.kind, data))
    }
}

#[cfg(test)]
mod tests {
    use tempdir::TempDir;

    use super::*;

    fn sample_objects() -> Vec<(Oid, ObjectKind, Vec<u8>)> {
        [
            (ObjectKind::Blob, &b"pack me"[..]),
            (ObjectKind::Tree, b"some tree bytes"),
            (ObjectKind::Commit, b"a commit"),
        ]
        .into_iter()
        .map(|(kind, data)| {
            (Oid::hash(kind, data), kind, data.to_vec())
        })
        .collect()
    }

    #[test]
    fn write_then_read_back_every_object() {
        let dir = TempDir::new("pack-test").unwrap();
        let objects = sample_objects();

        let mut writer = PackWriter::new();
        for (oid, kind, data) in &objects {
            writer.insert(*oid, *kind, data.clone());
        }
        let path = writer.write(dir.path()).unwrap();

        let reader = PackReader::open(&path).unwrap();
        assert_eq!(reader.count(), objects.len());
        for (oid, kind, data) in &objects {
            assert!(reader.contains(*oid));
            let (got_kind, got_data) = reader.read(*oid).unwrap();
            assert_eq!(got_kind, *kind);
            assert_eq!(&got_data, data);
        }

        let missing = Oid::hash(ObjectKind::Blob, b"elsewhere");
        assert!(matches!(reader.read(missing), Err(Error::NotFound)));
    }

    #[test]
    fn pack_name_is_its_checksum() {
        let dir = TempDir::new("pack-test").unwrap();
        let mut writer = PackWriter::new();
        let (oid, kind, data) = sample_objects().remove(0);
        writer.insert(oid, kind, data);

        let path = writer.write(dir.path()).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("pack-") && name.ends_with(".pack"));
        assert_eq!(name.len(), "pack-".len() + 40 + ".pack".len());
    }

    #[test]
    fn corruption_is_rejected_on_open() {
        let dir = TempDir::new("pack-test").unwrap();
        let mut writer = PackWriter::new();
        for (oid, kind, data) in sample_objects() {
            writer.insert(oid, kind, data);
        }
        let path = writer.write(dir.path()).unwrap();

        let mut raw = fs::read(&path).unwrap();
        let mid = raw.len() / 2;
        raw[mid] ^= 0xff;
        fs::write(&path, &raw).unwrap();

        assert!(PackReader::open(&path).is_err());
    }

    #[test]
    fn empty_pack_round_trips() {
        let dir = TempDir::new("pack-test").unwrap();
        let path = PackWriter::new().write(dir.path()).unwrap();
        let reader = PackReader::open(&path).unwrap();
        assert_eq!(reader.count(), 0);
    }
}
