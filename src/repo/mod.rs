//! Repository plumbing: layout, references, staging and revision
//! lookup on top of the object database.

pub mod commit;
pub mod index;
pub mod maint;
pub mod revwalk;
pub mod traverse;
pub mod tree;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::{debug, info};

use crate::error::{Error, Result};
use crate::odb::{ChunkedBackend, ObjectKind, Odb, Oid, OID_HEX_LEN};
use crate::repo::commit::{Commit, Signature};
use crate::repo::index::{Index, IndexEntry};
use crate::repo::revwalk::RevWalk;
use crate::repo::tree::Tree;

pub const DEFAULT_BRANCH: &str = "main";

/// An open repository: the worktree directory with `objects/`, `refs/`,
/// `HEAD` and `index` inside it.
pub struct Repository {
    path: PathBuf,
    odb: Odb,
}

impl Repository {
    /// Creates the repository layout at `path` (which may already hold
    /// worktree files) and opens it.
    pub fn init(path: &Path) -> Result<Repository> {
        fs::create_dir_all(path.join("objects"))?;
        fs::create_dir_all(path.join("refs").join("heads"))?;
        fs::write(
            path.join("HEAD"),
            format!("ref: refs/heads/{}\n", DEFAULT_BRANCH),
        )?;
        info!("initialised repository at {}", path.display());
        Repository::open(path)
    }

    pub fn open(path: &Path) -> Result<Repository> {
        if !path.join("HEAD").is_file() {
            return Err(Error::Storage(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no repository at {}", path.display()),
            )));
        }
        let odb = Odb::open(&path.join("objects"))?;
        Ok(Repository {
            path: path.to_path_buf(),
            odb,
        })
    }

    /// Registers a chunking backend over this repository's objects at
    /// priority 999, so blob reads and writes go through it.
    pub fn attach_chunked_backend(&mut self) -> Result<()> {
        let backend = ChunkedBackend::open(&self.path)?;
        self.odb.add_backend(Box::new(backend), 999);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn odb(&self) -> &Odb {
        &self.odb
    }

    pub fn odb_mut(&mut self) -> &mut Odb {
        &mut self.odb
    }

    fn head_ref(&self) -> Result<String> {
        let text = fs::read_to_string(self.path.join("HEAD"))?;
        text.trim_end()
            .strip_prefix("ref: ")
            .map(|name| name.to_string())
            .ok_or_else(|| Error::corrupt("HEAD is not a symbolic ref"))
    }

    /// Commit id the current branch points at, `None` before the first
    /// commit.
    pub fn head_id(&self) -> Result<Option<Oid>> {
        let ref_path = self.path.join(self.head_ref()?);
        if !ref_path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(ref_path)?;
        Ok(Some(text.trim_end().parse()?))
    }

    pub fn set_head_id(&mut self, oid: Oid) -> Result<()> {
        let ref_path = self.path.join(self.head_ref()?);
        if let Some(parent) = ref_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(ref_path, format!("{}\n", oid))?;
        Ok(())
    }

    pub fn read_commit(&self, oid: Oid) -> Result<Commit> {
        let (kind, data) = self.odb.read(oid)?;
        if kind != ObjectKind::Commit {
            return Err(Error::corrupt(format!("{} is a {}, not a commit", oid, kind)));
        }
        Commit::decode(&data)
    }

    pub fn read_tree(&self, oid: Oid) -> Result<Tree> {
        let (kind, data) = self.odb.read(oid)?;
        if kind != ObjectKind::Tree {
            return Err(Error::corrupt(format!("{} is a {}, not a tree", oid, kind)));
        }
        Tree::decode(&data)
    }

    pub fn revwalk(&self) -> Result<RevWalk> {
        Ok(RevWalk::new(self, self.head_id()?))
    }

    /// Stages the worktree file at `pathspec` (relative to the
    /// repository), writing its content through the object database,
    /// and returns the stored blob id.
    pub fn add_path(&mut self, pathspec: &str) -> Result<Oid> {
        let file = self.path.join(pathspec);
        let data = fs::read(&file)?;
        let oid = self.odb.write(ObjectKind::Blob, &data)?;

        let meta = fs::metadata(&file)?;
        let mtime = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let mut index = Index::load(&self.path)?;
        index.add(IndexEntry {
            path: pathspec.to_string(),
            oid,
            size: meta.len(),
            mtime,
        });
        index.save(&self.path)?;
        debug!("staged {} as {}", pathspec, oid);
        Ok(oid)
    }

    /// Records the staged tree as a new commit on the current branch
    /// and moves the branch to it.
    pub fn commit(&mut self, message: &str) -> Result<Oid> {
        let index = Index::load(&self.path)?;
        let tree = tree::write_tree(&mut self.odb, &index)?;
        let parents = self.head_id()?.into_iter().collect();

        let commit = Commit {
            tree,
            parents,
            author: Signature::author(),
            committer: Signature::committer(),
            message: message.to_string(),
        };
        let oid = self.odb.write(ObjectKind::Commit, &commit.encode())?;
        self.set_head_id(oid)?;
        info!("commit {} on {}", oid, self.head_ref()?);
        Ok(oid)
    }

    fn resolve_rev(&self, rev: &str) -> Result<Oid> {
        if rev == "HEAD" {
            return self
                .head_id()?
                .ok_or_else(|| Error::InvalidSpec(rev.to_string()));
        }
        if let Some(count) = rev.strip_prefix("HEAD~") {
            let count: usize = count
                .parse()
                .map_err(|_| Error::InvalidSpec(rev.to_string()))?;
            let mut oid = self
                .head_id()?
                .ok_or_else(|| Error::InvalidSpec(rev.to_string()))?;
            for _ in 0..count {
                let commit = self.read_commit(oid)?;
                oid = commit
                    .parents
                    .first()
                    .copied()
                    .ok_or_else(|| Error::InvalidSpec(rev.to_string()))?;
            }
            return Ok(oid);
        }
        if rev.len() == OID_HEX_LEN {
            return Oid::from_hex(rev);
        }
        Err(Error::InvalidSpec(rev.to_string()))
    }

    /// Resolves `<rev>[:<path>]` to an object id. The revision part
    /// accepts `HEAD`, `HEAD~n` and full 40-hex ids; the optional path
    /// descends the commit's tree.
    pub fn revparse(&self, spec: &str) -> Result<Oid> {
        let (rev, path) = match spec.split_once(':') {
            Some((rev, path)) => (rev, Some(path)),
            None => (spec, None),
        };

        let oid = self.resolve_rev(rev)?;
        let path = match path {
            Some(path) => path,
            None => return Ok(oid),
        };

        let commit = self.read_commit(oid)?;
        let mut components =
            path.split('/').filter(|c| !c.is_empty()).peekable();
        if components.peek().is_none() {
            return Ok(commit.tree);
        }

        let mut current = commit.tree;
        while let Some(name) = components.next() {
            let tree = self.read_tree(current)?;
            let entry = tree.entry(name).ok_or(Error::NotFound)?;
            if components.peek().is_none() {
                return Ok(entry.oid);
            }
            if entry.kind != ObjectKind::Tree {
                return Err(Error::NotFound);
            }
            current = entry.oid;
        }
        Ok(current)
    }
}
