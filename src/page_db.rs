//! The page store: URL-hash indices, dense identifiers, and adjacency.

use std::fs;
use std::path::{Path, PathBuf};

use redb::{Database, Durability, ReadableTable, WriteTransaction};
use tracing::{debug, info};

use crate::codec;
use crate::error::{ErrorSlot, PageDbError, Result};
use crate::hash::url_hash;
use crate::link_stream::PageDBLinkStream;
use crate::model::{CrawledPage, PageInfo};
use crate::options::{Options, SyncMode};
use crate::rank::{self, RankOptions};
use crate::schema;
use crate::scores::ScoreFile;

/// File holding the embedded store inside the database directory.
pub const DATA_FILE: &str = "data";

/// Score files written by the kernel drivers, also inside the directory.
pub const PAGE_RANK_FILE: &str = "page_rank.scores";
pub const HITS_HUB_FILE: &str = "hits_hub.scores";
pub const HITS_AUTHORITY_FILE: &str = "hits_authority.scores";

/// Durable store of per-URL records and outbound-link adjacency.
///
/// A handle is `Send + Sync` and meant to be shared by reference across
/// crawler threads: any number of readers run concurrently against MVCC
/// snapshots while writers serialise inside [`PageDB::add`]. Dropping the
/// handle closes the store; link streams keep their own snapshot alive.
pub struct PageDB {
    db: Database,
    path: PathBuf,
    durability: Durability,
    error: ErrorSlot,
}

impl PageDB {
    /// Opens (or creates) a store in `path` with default options.
    ///
    /// The directory is created when missing; an existing store resumes
    /// where it left off.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, Options::default())
    }

    /// Opens (or creates) a store with explicit tuning options.
    pub fn open_with_options(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let dir = path.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| PageDbError::InvalidPath(format!("{}: {e}", dir.display())))?;

        let db = Database::builder()
            .set_cache_size(options.cache_size)
            .create(dir.join(DATA_FILE))?;
        let durability = match options.sync_mode {
            SyncMode::Full => Durability::Immediate,
            SyncMode::Eventual => Durability::Eventual,
        };

        let store = Self {
            db,
            path: dir,
            durability,
            error: ErrorSlot::default(),
        };

        // Make sure every index exists and the counter is seeded before the
        // first reader shows up.
        store.with_write(|txn| {
            let mut info_table = txn.open_table(schema::INFO)?;
            let _ = txn.open_table(schema::HASH2IDX)?;
            let _ = txn.open_table(schema::HASH2INFO)?;
            let _ = txn.open_table(schema::LINKS)?;
            if info_table.get(schema::KEY_N_PAGES)?.is_none() {
                info_table.insert(schema::KEY_N_PAGES, 0u64)?;
            }
            Ok(())
        })?;

        info!(path = %store.path.display(), "page_db.open");
        Ok(store)
    }

    /// Directory this store lives in.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Most recent error recorded by any operation on this handle, if any.
    /// Per-call results are authoritative; this is a tooling convenience
    /// and is never cleared.
    pub fn last_error(&self) -> Option<String> {
        self.error.get()
    }

    /// Admits a crawled page and its outbound links.
    ///
    /// Runs entirely inside one write transaction: the source record is
    /// created or updated, previously unseen link targets get fresh dense
    /// indices and link-only records, and the source's edge list is
    /// rewritten in page order. Returns the `(url_hash, PageInfo)`
    /// snapshots of the source plus every newly observed link target, for
    /// the caller to feed into its schedulers.
    pub fn add(&self, page: &CrawledPage) -> Result<Vec<(u64, PageInfo)>> {
        self.track(self.add_inner(page))
    }

    /// Looks up the record for a URL. Absence is `Ok(None)`, not an error.
    pub fn get_info_from_url(&self, url: &str) -> Result<Option<PageInfo>> {
        self.track(self.get_info_from_url_inner(url))
    }

    /// Looks up the record for a URL hash. Absence is `Ok(None)`.
    pub fn get_info_from_hash(&self, hash: u64) -> Result<Option<PageInfo>> {
        self.track(self.get_info_from_hash_inner(hash))
    }

    /// Looks up the dense index of a URL. Absence is `Ok(None)`.
    pub fn get_idx(&self, url: &str) -> Result<Option<u64>> {
        self.track(self.get_idx_inner(url))
    }

    /// Number of pages observed so far; also the next index to be issued.
    pub fn n_pages(&self) -> Result<u64> {
        self.track(self.n_pages_inner())
    }

    /// Opens an edge stream over a snapshot of the whole link graph.
    pub fn open_link_stream(&self) -> Result<PageDBLinkStream> {
        self.track(PageDBLinkStream::new(&self.db))
    }

    /// Visits every stored record in URL-hash order. Intended for
    /// inspection tooling, not the ingestion path.
    pub fn for_each_info(&self, f: impl FnMut(u64, PageInfo)) -> Result<()> {
        self.track(self.for_each_info_inner(f))
    }

    /// Recomputes HITS hub/authority scores over the current graph and
    /// persists them to [`HITS_HUB_FILE`] and [`HITS_AUTHORITY_FILE`].
    pub fn update_hits(&self) -> Result<()> {
        self.track(self.update_hits_inner())
    }

    /// Recomputes PageRank over the current graph and persists the vector
    /// to [`PAGE_RANK_FILE`].
    pub fn update_page_rank(&self) -> Result<()> {
        self.track(self.update_page_rank_inner())
    }

    /// Runs `f` against a fresh write transaction, committing on `Ok` and
    /// aborting on `Err`. All mutations of one call become visible
    /// atomically or not at all.
    fn with_write<T>(&self, f: impl FnOnce(&WriteTransaction) -> Result<T>) -> Result<T> {
        let mut txn = self.db.begin_write()?;
        txn.set_durability(self.durability);
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = txn.abort() {
                    debug!(error = %abort_err, "page_db.abort_failed");
                }
                Err(err)
            }
        }
    }

    fn add_inner(&self, page: &CrawledPage) -> Result<Vec<(u64, PageInfo)>> {
        check_url(&page.url)?;
        for link in &page.links {
            check_url(&link.url)?;
        }

        self.with_write(|txn| {
            let mut info_table = txn.open_table(schema::INFO)?;
            let mut hash2idx = txn.open_table(schema::HASH2IDX)?;
            let mut hash2info = txn.open_table(schema::HASH2INFO)?;
            let mut links = txn.open_table(schema::LINKS)?;

            let mut n_pages = info_table
                .get(schema::KEY_N_PAGES)?
                .map(|guard| guard.value())
                .unwrap_or(0);

            let h_src = url_hash(page.url.as_bytes());
            let existing_idx = hash2idx.get(h_src)?.map(|guard| guard.value());
            let src_idx = match existing_idx {
                Some(idx) => idx,
                None => {
                    let idx = n_pages;
                    n_pages += 1;
                    hash2idx.insert(h_src, idx)?;
                    idx
                }
            };

            let src_info = if existing_idx.is_some() {
                let mut stored = hash2info
                    .get(h_src)?
                    .map(|guard| codec::load(guard.value()))
                    .transpose()?
                    .ok_or(PageDbError::NoPage(h_src))?;
                stored.record_crawl(page);
                stored
            } else {
                PageInfo::crawled(page)
            };
            hash2info.insert(h_src, codec::dump(&src_info)?.as_slice())?;

            let mut snapshots = Vec::with_capacity(page.links.len() + 1);
            snapshots.push((h_src, src_info));

            let mut targets = Vec::with_capacity(page.links.len());
            for link in &page.links {
                let h_link = url_hash(link.url.as_bytes());
                let existing_link_idx = hash2idx.get(h_link)?.map(|guard| guard.value());
                let idx = match existing_link_idx {
                    Some(idx) => idx,
                    None => {
                        let idx = n_pages;
                        n_pages += 1;
                        hash2idx.insert(h_link, idx)?;
                        let link_info = PageInfo::observed(link.url.clone());
                        hash2info.insert(h_link, codec::dump(&link_info)?.as_slice())?;
                        snapshots.push((h_link, link_info));
                        idx
                    }
                };
                targets.push(idx);
            }

            // Overwrites any prior edge list for this source; an empty link
            // list still writes an empty entry.
            links.insert(src_idx, schema::encode_links(&targets).as_slice())?;
            info_table.insert(schema::KEY_N_PAGES, n_pages)?;

            debug!(
                url = %page.url,
                idx = src_idx,
                n_links = targets.len(),
                "page_db.add"
            );
            Ok(snapshots)
        })
    }

    fn get_info_from_url_inner(&self, url: &str) -> Result<Option<PageInfo>> {
        check_url(url)?;
        self.get_info_from_hash_inner(url_hash(url.as_bytes()))
    }

    fn get_info_from_hash_inner(&self, hash: u64) -> Result<Option<PageInfo>> {
        let txn = self.db.begin_read()?;
        let hash2info = txn.open_table(schema::HASH2INFO)?;
        match hash2info.get(hash)? {
            Some(guard) => Ok(Some(codec::load(guard.value())?)),
            None => Ok(None),
        }
    }

    fn get_idx_inner(&self, url: &str) -> Result<Option<u64>> {
        check_url(url)?;
        let txn = self.db.begin_read()?;
        let hash2idx = txn.open_table(schema::HASH2IDX)?;
        Ok(hash2idx
            .get(url_hash(url.as_bytes()))?
            .map(|guard| guard.value()))
    }

    fn n_pages_inner(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let info_table = txn.open_table(schema::INFO)?;
        Ok(info_table
            .get(schema::KEY_N_PAGES)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    fn for_each_info_inner(&self, mut f: impl FnMut(u64, PageInfo)) -> Result<()> {
        let txn = self.db.begin_read()?;
        let hash2info = txn.open_table(schema::HASH2INFO)?;
        for entry in hash2info.range::<u64>(..)? {
            let (key, value) = entry?;
            f(key.value(), codec::load(value.value())?);
        }
        Ok(())
    }

    fn update_hits_inner(&self) -> Result<()> {
        let n_pages = self.n_pages_inner()?;
        let mut stream = PageDBLinkStream::new(&self.db)?;
        let scores = rank::hits(&mut stream, n_pages as usize, &RankOptions::default())?;

        let mut hub = ScoreFile::create(self.path.join(HITS_HUB_FILE), n_pages)?;
        hub.write_all(&scores.hub)?;
        hub.flush()?;

        let mut authority = ScoreFile::create(self.path.join(HITS_AUTHORITY_FILE), n_pages)?;
        authority.write_all(&scores.authority)?;
        authority.flush()?;

        info!(n_pages, "page_db.update_hits");
        Ok(())
    }

    fn update_page_rank_inner(&self) -> Result<()> {
        let n_pages = self.n_pages_inner()?;
        let mut stream = PageDBLinkStream::new(&self.db)?;
        let scores = rank::page_rank(&mut stream, n_pages as usize, &RankOptions::default())?;

        let mut file = ScoreFile::create(self.path.join(PAGE_RANK_FILE), n_pages)?;
        file.write_all(&scores)?;
        file.flush()?;

        info!(n_pages, "page_db.update_page_rank");
        Ok(())
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.error.record(err);
        }
        result
    }
}

impl Drop for PageDB {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "page_db.close");
    }
}

fn check_url(url: &str) -> Result<()> {
    if url.len() > schema::MAX_URL_LEN {
        return Err(PageDbError::InvalidArgument(format!(
            "url of {} bytes exceeds the {}-byte limit",
            url.len(),
            schema::MAX_URL_LEN
        )));
    }
    Ok(())
}
