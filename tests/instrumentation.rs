//! Process-wide counter checks. Kept to a single test because the
//! counters are shared by every backend in the process.

use chunkodb::{
    stats, ChunkedBackend, ObjectKind, OdbBackend, Oid, Repository,
};
use tempdir::TempDir;

#[test]
fn counters_track_backend_operations() {
    let dir = TempDir::new("instrumentation").unwrap();
    let repo = Repository::init(dir.path()).unwrap();

    let reads = stats::read_calls();
    let writes = stats::write_calls();
    let frees = stats::free_calls();
    let chunks = stats::chunk_count();
    let chunk_bytes = stats::chunk_total_bytes();

    let mut backend = ChunkedBackend::open(repo.path()).unwrap();

    // a miss still counts as one read
    let missing =
        Oid::from_hex("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391").unwrap();
    assert!(backend.read(missing).is_err());
    assert_eq!(stats::read_calls(), reads + 1);
    assert_eq!(stats::write_calls(), writes);

    // one write, one chunk pooled
    let oid = backend.write(ObjectKind::Blob, b"foo").unwrap();
    assert_eq!(stats::write_calls(), writes + 1);
    assert_eq!(stats::read_calls(), reads + 1);
    assert_eq!(stats::chunk_count(), chunks + 1);
    assert_eq!(stats::chunk_total_bytes(), chunk_bytes + 3);
    assert_eq!(backend.pool().count(), 1);
    assert_eq!(backend.pool().total_bytes(), 3);

    // one read
    let (kind, data) = backend.read(oid).unwrap();
    assert_eq!((kind, data.as_slice()), (ObjectKind::Blob, &b"foo"[..]));
    assert_eq!(stats::read_calls(), reads + 2);

    // teardown frees the pool and counts once
    drop(backend);
    assert_eq!(stats::free_calls(), frees + 1);
    assert_eq!(stats::chunk_count(), chunks);
    assert_eq!(stats::chunk_total_bytes(), chunk_bytes);

    // reads dispatched through the database hit the backend first
    let mut repo = Repository::open(dir.path()).unwrap();
    repo.attach_chunked_backend().unwrap();
    let still_missing = Oid::hash(ObjectKind::Blob, b"never stored");
    assert!(repo.odb().read(still_missing).is_err());
    assert_eq!(stats::read_calls(), reads + 3);

    drop(repo);
    assert_eq!(stats::free_calls(), frees + 2);
}
