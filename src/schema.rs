//! Table definitions for the page store.
//!
//! Four ordered key/value namespaces live inside the embedded store. `u64`
//! keys compare numerically, so `hash2idx`/`hash2info` scan in hash order
//! and `links` scans in dense-index order.

use redb::TableDefinition;

use crate::error::{PageDbError, Result};

/// Store-wide counters keyed by short tags.
pub const INFO: TableDefinition<&str, u64> = TableDefinition::new("info");

/// `info` key holding the next dense index to issue.
pub const KEY_N_PAGES: &str = "n_pages";

/// URL hash -> dense page index.
pub const HASH2IDX: TableDefinition<u64, u64> = TableDefinition::new("hash2idx");

/// URL hash -> serialised PageInfo record.
pub const HASH2INFO: TableDefinition<u64, &[u8]> = TableDefinition::new("hash2info");

/// Source page index -> packed u64 LE target indices, in page order.
pub const LINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("links");

/// Largest key the store accepts, namespace prefix included.
pub const MAX_KEY_SIZE: usize = 500;

/// Largest accepted URL: the key budget minus an 8-byte hash prefix.
pub const MAX_URL_LEN: usize = MAX_KEY_SIZE - 8;

/// Packs an edge list for the `links` table.
pub fn encode_links(targets: &[u64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(targets.len() * 8);
    for target in targets {
        buf.extend_from_slice(&target.to_le_bytes());
    }
    buf
}

/// Unpacks an edge list read from the `links` table.
pub fn decode_links(bytes: &[u8]) -> Result<Vec<u64>> {
    if bytes.len() % 8 != 0 {
        return Err(PageDbError::Corruption(format!(
            "link list length {} is not a multiple of 8",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| u64::from_le_bytes(chunk.try_into().expect("chunks_exact yields 8 bytes")))
        .collect())
}
