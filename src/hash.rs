use xxhash_rust::xxh64::xxh64;

/// Computes the 64-bit digest of a URL byte string.
///
/// The seed is fixed so digests are stable across runs and processes; the
/// same digest keys `hash2idx` and `hash2info` for the lifetime of a store.
pub fn url_hash(url: &[u8]) -> u64 {
    xxh64(url, 0)
}
