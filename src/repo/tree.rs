//! Tree objects: one text line per entry, sorted by name.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::odb::{ObjectKind, Odb, Oid};
use crate::repo::index::Index;

pub const MODE_BLOB: u32 = 0o100_644;
pub const MODE_TREE: u32 = 0o040_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: u32,
    pub kind: ObjectKind,
    pub oid: Oid,
    pub name: String,
}

/// A directory listing: named, kind-tagged references to blobs and
/// further trees.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Lines of `"<octal mode> <kind> <hex40>\t<name>\n"`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&format!(
                "{:06o} {} {}\t{}\n",
                entry.mode, entry.kind, entry.oid, entry.name
            ));
        }
        out.into_bytes()
    }

    pub fn decode(data: &[u8]) -> Result<Tree> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::corrupt("tree is not utf-8"))?;

        let mut entries = Vec::new();
        for line in text.lines() {
            entries.push(parse_entry(line)?);
        }
        Ok(Tree { entries })
    }
}

fn parse_entry(line: &str) -> Result<TreeEntry> {
    let parse = || -> Option<TreeEntry> {
        let (mode, rest) = line.split_once(' ')?;
        let (kind, rest) = rest.split_once(' ')?;
        let (hex, name) = rest.split_once('\t')?;

        let mode = u32::from_str_radix(mode, 8).ok()?;
        let kind = ObjectKind::parse(kind)?;
        let oid = Oid::from_hex(hex).ok()?;
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(TreeEntry {
            mode,
            kind,
            oid,
            name: name.to_string(),
        })
    };
    parse().ok_or_else(|| Error::corrupt(format!("bad tree entry {:?}", line)))
}

enum Node {
    File(Oid),
    Dir(BTreeMap<String, Node>),
}

/// Writes the index out as a hierarchy of tree objects, innermost
/// first, and returns the root tree id. An empty index produces an
/// empty root tree.
pub fn write_tree(odb: &mut Odb, index: &Index) -> Result<Oid> {
    let mut root = BTreeMap::new();
    for entry in index.entries() {
        insert(&mut root, &entry.path, entry.oid)?;
    }
    write_dir(odb, &root)
}

fn insert(dir: &mut BTreeMap<String, Node>, path: &str, oid: Oid) -> Result<()> {
    match path.split_once('/') {
        None => {
            if path.is_empty() {
                return Err(Error::corrupt("empty path component in index"));
            }
            dir.insert(path.to_string(), Node::File(oid));
            Ok(())
        }
        Some((first, rest)) => {
            if first.is_empty() {
                return Err(Error::corrupt("empty path component in index"));
            }
            let node = dir
                .entry(first.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
            match node {
                Node::Dir(children) => insert(children, rest, oid),
                Node::File(_) => Err(Error::corrupt(format!(
                    "path {:?} is both a file and a directory",
                    first
                ))),
            }
        }
    }
}

fn write_dir(odb: &mut Odb, dir: &BTreeMap<String, Node>) -> Result<Oid> {
    let mut tree = Tree::default();
    for (name, node) in dir {
        let entry = match node {
            Node::File(oid) => TreeEntry {
                mode: MODE_BLOB,
                kind: ObjectKind::Blob,
                oid: *oid,
                name: name.clone(),
            },
            Node::Dir(children) => TreeEntry {
                mode: MODE_TREE,
                kind: ObjectKind::Tree,
                oid: write_dir(odb, children)?,
                name: name.clone(),
            },
        };
        tree.entries.push(entry);
    }
    odb.write(ObjectKind::Tree, &tree.encode())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: ObjectKind) -> TreeEntry {
        TreeEntry {
            mode: if kind == ObjectKind::Tree {
                MODE_TREE
            } else {
                MODE_BLOB
            },
            kind,
            oid: Oid::hash(kind, name.as_bytes()),
            name: name.to_string(),
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let tree = Tree {
            entries: vec![
                entry("README", ObjectKind::Blob),
                entry("src", ObjectKind::Tree),
            ],
        };

        let decoded = Tree::decode(&tree.encode()).unwrap();
        assert_eq!(decoded.entries(), tree.entries());
        assert!(decoded.entry("src").is_some());
        assert!(decoded.entry("nope").is_none());
    }

    #[test]
    fn empty_tree_is_empty_bytes() {
        let tree = Tree::decode(b"").unwrap();
        assert!(tree.entries().is_empty());
        assert!(tree.encode().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Tree::decode(b"not a tree line\n").is_err());
        assert!(Tree::decode(b"100644 blob deadbeef\tname\n").is_err());
    }
}
