//! Maintenance: pack everything reachable, sweep packed loose objects,
//! verify the object graph.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::Result;
use crate::odb::{PackReader, PackWriter};
use crate::repo::traverse::reachable_oids;
use crate::repo::Repository;

/// Packs every reachable object into a single new pack file, then
/// removes the loose copies the pack now covers.
///
/// The sweep only runs after the pack is fully on disk, and it only
/// deletes loose objects the new pack contains, so every object stays
/// readable at every point.
pub fn repack(repo_path: &Path) -> Result<()> {
    let repo = Repository::open(repo_path)?;
    let reachable = reachable_oids(&repo)?;
    if reachable.is_empty() {
        debug!("nothing reachable in {}, skipping repack", repo_path.display());
        return Ok(());
    }

    let mut writer = PackWriter::new();
    for &oid in reachable.iter() {
        let (kind, data) = repo.odb().store().read(oid)?;
        writer.insert(oid, kind, data);
    }

    let objects_dir = repo_path.join("objects");
    let pack_path = writer.write(&objects_dir.join("pack"))?;
    info!(
        "packed {} object(s) into {}",
        reachable.len(),
        pack_path.display()
    );

    let pack = PackReader::open(&pack_path)?;
    drop(repo);
    sweep_loose(&objects_dir, &pack)
}

/// Removes every loose object the pack contains, then drops emptied
/// fanout directories (ignoring ones that still hold files).
fn sweep_loose(objects_dir: &Path, pack: &PackReader) -> Result<()> {
    let mut removed = 0usize;
    for entry in fs::read_dir(objects_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let prefix = match name.to_str() {
            Some(name) if name.len() == 2 => name.to_string(),
            _ => continue,
        };
        if !entry.file_type()?.is_dir() {
            continue;
        }

        for file in fs::read_dir(entry.path())? {
            let file = file?;
            let rest = file.file_name();
            let hex = match rest.to_str() {
                Some(rest) => format!("{}{}", prefix, rest),
                None => continue,
            };
            let oid = match hex.parse() {
                Ok(oid) => oid,
                Err(_) => continue,
            };
            if pack.contains(oid) {
                fs::remove_file(file.path())?;
                removed += 1;
            }
        }
        fs::remove_dir(entry.path()).ok();
    }
    debug!("swept {} loose object(s)", removed);
    Ok(())
}

/// Walks the whole reachable graph and reads every object it lists.
/// Any unreadable object fails the check.
pub fn fsck(repo_path: &Path) -> Result<()> {
    let repo = Repository::open(repo_path)?;
    let reachable = reachable_oids(&repo)?;
    for &oid in reachable.iter() {
        repo.odb().store().read(oid)?;
    }
    debug!(
        "fsck of {}: {} object(s) ok",
        repo_path.display(),
        reachable.len()
    );
    Ok(())
}
