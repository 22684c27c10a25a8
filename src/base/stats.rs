//! Process-wide observation point for backend activity.
//!
//! The counters exist so the test suite can watch backend operations and
//! pool occupancy from outside; they are not part of the production
//! surface. Updates use relaxed atomics and are approximate when several
//! threads drive backends at once.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use lazy_static::lazy_static;

#[derive(Default)]
struct Stats {
    read_calls: AtomicU64,
    write_calls: AtomicU64,
    free_calls: AtomicU64,
    chunk_count: AtomicUsize,
    chunk_total_bytes: AtomicUsize,
}

lazy_static! {
    static ref STATS: Stats = Stats::default();
}

/// Number of backend `read` invocations since process start.
pub fn read_calls() -> u64 {
    STATS.read_calls.load(Ordering::Relaxed)
}

/// Number of backend `write` invocations since process start.
pub fn write_calls() -> u64 {
    STATS.write_calls.load(Ordering::Relaxed)
}

/// Number of backends torn down since process start.
pub fn free_calls() -> u64 {
    STATS.free_calls.load(Ordering::Relaxed)
}

/// Chunk descriptors currently held across living pools.
pub fn chunk_count() -> usize {
    STATS.chunk_count.load(Ordering::Relaxed)
}

/// Total chunk payload bytes currently held across living pools.
pub fn chunk_total_bytes() -> usize {
    STATS.chunk_total_bytes.load(Ordering::Relaxed)
}

pub(crate) fn record_read() {
    STATS.read_calls.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_write() {
    STATS.write_calls.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn record_free() {
    STATS.free_calls.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn add_chunk(len: usize) {
    STATS.chunk_count.fetch_add(1, Ordering::Relaxed);
    STATS.chunk_total_bytes.fetch_add(len, Ordering::Relaxed);
}

pub(crate) fn remove_chunks(count: usize, total_bytes: usize) {
    STATS.chunk_count.fetch_sub(count, Ordering::Relaxed);
    STATS.chunk_total_bytes.fetch_sub(total_bytes, Ordering::Relaxed);
}
