//! The staging index, persisted between CLI invocations.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::odb::Oid;

const INDEX_FILE: &str = "index";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub oid: Oid,
    pub size: u64,
    pub mtime: i64,
}

/// Staged paths keyed by name; re-adding a path replaces its entry.
#[derive(Debug, Default)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

impl Index {
    /// Loads the index of the repository at `repo_path`; a repository
    /// with no index file has an empty one.
    pub fn load(repo_path: &Path) -> Result<Index> {
        let file = repo_path.join(INDEX_FILE);
        if !file.exists() {
            return Ok(Default::default());
        }

        let raw = fs::read(file)?;
        let entries: Vec<IndexEntry> = rmp_serde::from_read_ref(&raw)
            .map_err(|err| Error::corrupt(format!("index: {}", err)))?;
        Ok(Index {
            entries: entries
                .into_iter()
                .map(|entry| (entry.path.clone(), entry))
                .collect(),
        })
    }

    pub fn save(&self, repo_path: &Path) -> Result<()> {
        let entries: Vec<&IndexEntry> = self.entries.values().collect();
        let raw = rmp_serde::to_vec(&entries)
            .map_err(|err| Error::corrupt(format!("index: {}", err)))?;

        let path = repo_path.join(INDEX_FILE);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn add(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
