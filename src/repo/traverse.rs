//! Reachability: every object id needed to reproduce the committed
//! history, including the chunks behind blob manifests.

use crate::content::manifest::Manifest;
use crate::error::Result;
use crate::odb::{ObjectKind, Oid};
use crate::repo::Repository;

/// Ordered set of object ids. Inserting a present id is a no-op;
/// enumeration follows first insertion.
#[derive(Debug, Default)]
pub struct OidSet {
    order: Vec<Oid>,
    seen: std::collections::HashSet<Oid>,
}

impl OidSet {
    pub fn insert(&mut self, oid: Oid) -> bool {
        if self.seen.insert(oid) {
            self.order.push(oid);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.seen.contains(&oid)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Oid> {
        self.order.iter()
    }
}

/// Collects every object reachable from HEAD: commits, their trees,
/// tree entries, and for each blob that stores a manifest also the
/// chunks the manifest references.
///
/// On a repository whose blobs were all written through the chunking
/// backend this is exactly the object set needed to reproduce every
/// committed blob.
pub fn reachable_oids(repo: &Repository) -> Result<OidSet> {
    let mut set = OidSet::default();
    for oid in repo.revwalk()? {
        let oid = oid?;
        set.insert(oid);
        let commit = repo.read_commit(oid)?;
        set.insert(commit.tree);
        collect_tree(repo, commit.tree, &mut set)?;
    }
    Ok(set)
}

fn collect_tree(repo: &Repository, tree_oid: Oid, set: &mut OidSet) -> Result<()> {
    let tree = repo.read_tree(tree_oid)?;
    for entry in tree.entries() {
        set.insert(entry.oid);
        match entry.kind {
            ObjectKind::Tree => collect_tree(repo, entry.oid, set)?,
            ObjectKind::Blob => add_blob_chunks(repo, entry.oid, set)?,
            ObjectKind::Commit => {}
        }
    }
    Ok(())
}

fn add_blob_chunks(repo: &Repository, oid: Oid, set: &mut OidSet) -> Result<()> {
    // stored bytes, deliberately not reassembled
    let (kind, data) = repo.odb().store().read(oid)?;
    if kind != ObjectKind::Blob {
        return Ok(());
    }
    if let Ok(manifest) = Manifest::decode(&data) {
        for chunk in manifest.entries() {
            set.insert(chunk.oid);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oid_set_dedups_and_keeps_order() {
        let a = Oid::hash(ObjectKind::Blob, b"a");
        let b = Oid::hash(ObjectKind::Blob, b"b");

        let mut set = OidSet::default();
        assert!(set.insert(a));
        assert!(set.insert(b));
        assert!(!set.insert(a));

        assert_eq!(set.len(), 2);
        assert!(set.contains(a));
        let order: Vec<Oid> = set.iter().copied().collect();
        assert_eq!(order, vec![a, b]);
    }
}
