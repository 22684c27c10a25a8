//! Commit graph walk starting at HEAD.

use std::collections::{HashSet, VecDeque};

use crate::error::Result;
use crate::odb::Oid;
use crate::repo::Repository;

/// Yields every commit reachable from the starting point exactly once,
/// breadth-first over parents. Read failures end the walk with the
/// error.
pub struct RevWalk<'repo> {
    repo: &'repo Repository,
    queue: VecDeque<Oid>,
    seen: HashSet<Oid>,
}

impl<'repo> RevWalk<'repo> {
    pub(crate) fn new(repo: &'repo Repository, start: Option<Oid>) -> Self {
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        if let Some(oid) = start {
            queue.push_back(oid);
            seen.insert(oid);
        }
        RevWalk { repo, queue, seen }
    }
}

impl<'repo> Iterator for RevWalk<'repo> {
    type Item = Result<Oid>;

    fn next(&mut self) -> Option<Result<Oid>> {
        let oid = self.queue.pop_front()?;
        match self.repo.read_commit(oid) {
            Ok(commit) => {
                for parent in commit.parents {
                    if self.seen.insert(parent) {
                        self.queue.push_back(parent);
                    }
                }
                Some(Ok(oid))
            }
            Err(err) => {
                self.queue.clear();
                Some(Err(err))
            }
        }
    }
}
