//! Chunk reuse between near-identical blobs: single-byte flips must
//! invalidate only the chunks that cover them.

use std::collections::HashSet;

use chunkodb::{Chunk, ChunkedBackend, ObjectKind, OdbBackend, Oid, Repository};
use rand::{RngCore, SeedableRng};
use rand_xorshift::XorShiftRng;
use tempdir::TempDir;

const BLOB_SIZE: usize = 100_000;
const FLIP_MASK: u8 = 0x55;
const NUM_MODS: usize = 5;

fn chunk_covering(offset: usize, chunks: &[Chunk]) -> usize {
    let mut cum = 0;
    for (i, chunk) in chunks.iter().enumerate() {
        cum += chunk.len;
        if offset < cum {
            return i;
        }
    }
    panic!("offset {} beyond blob", offset);
}

#[test]
fn flips_spread_across_chunks_keep_the_rest_reused() {
    let dir = TempDir::new("chunk-reuse").unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let mut backend = ChunkedBackend::open(repo.path()).unwrap();

    let mut data = vec![0u8; BLOB_SIZE];
    XorShiftRng::from_seed([42u8; 16]).fill_bytes(&mut data);

    let oid1 = backend.write(ObjectKind::Blob, &data).unwrap();
    let chunks1 = backend.object_chunks(oid1).unwrap();
    assert!(chunks1.len() > NUM_MODS);

    // flip one byte at the start, at both chunk boundaries next to the
    // blob's ends, in the middle, and at the very last byte
    let boundary_first = chunks1[0].len;
    let boundary_last = BLOB_SIZE - chunks1[chunks1.len() - 1].len;
    let mods = [
        0,
        boundary_first,
        BLOB_SIZE / 2,
        boundary_last,
        BLOB_SIZE - 1,
    ];

    let mut modified = data.clone();
    for &offset in &mods {
        modified[offset] ^= FLIP_MASK;
    }

    let oid2 = backend.write(ObjectKind::Blob, &modified).unwrap();
    let chunks2 = backend.object_chunks(oid2).unwrap();
    assert!(chunks2.len() >= chunks1.len());

    let old: HashSet<Oid> = chunks1.iter().map(|c| c.oid).collect();
    let reused = chunks2.iter().filter(|c| old.contains(&c.oid)).count();
    assert!(
        reused >= chunks1.len() - NUM_MODS,
        "only {} of {} chunks reused",
        reused,
        chunks1.len()
    );

    // every flip lands in a chunk that could not be reused
    for &offset in &mods {
        let idx = chunk_covering(offset, &chunks2);
        assert!(
            !old.contains(&chunks2[idx].oid),
            "chunk covering flipped offset {} was reused",
            offset
        );
    }

    // both generations still read back bit-exactly
    let (_, first) = backend.read(oid1).unwrap();
    assert_eq!(first, data);
    let (_, second) = backend.read(oid2).unwrap();
    assert_eq!(second, modified);
}
