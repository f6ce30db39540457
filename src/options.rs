/// Commit durability for write transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Every commit reaches stable storage before `add` returns.
    Full,
    /// Commits are batched by the store; a crash may lose the tail of a
    /// bulk load but never corrupts committed state.
    Eventual,
}

/// Tuning knobs supplied when opening a [`crate::PageDB`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Budget for the embedded store's page cache, in bytes.
    pub cache_size: usize,
    /// Commit durability applied to every write transaction.
    pub sync_mode: SyncMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cache_size: 100 * 1024 * 1024,
            sync_mode: SyncMode::Full,
        }
    }
}

impl Options {
    /// Relaxed preset for seeding a store from a large crawl dump.
    pub fn bulk_load() -> Self {
        Self {
            cache_size: 256 * 1024 * 1024,
            sync_mode: SyncMode::Eventual,
        }
    }
}
