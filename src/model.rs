use std::time::{SystemTime, UNIX_EPOCH};

/// A link discovered inside a crawled page.
///
/// The score is an estimate of the link's value, typically derived from the
/// surrounding text. It steers the crawl schedulers and is handed back to
/// the caller from [`crate::PageDB::add`]; the store itself persists only
/// the adjacency.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkInfo {
    pub url: String,
    pub score: f32,
}

/// A fetched page on its way into the store. Ephemeral input to
/// [`crate::PageDB::add`]; nothing here is retained beyond the snapshots
/// the store derives from it.
#[derive(Clone, Debug, PartialEq)]
pub struct CrawledPage {
    /// Page URL, normalised by the caller.
    pub url: String,
    /// Crawl time in seconds since the epoch.
    pub time: f64,
    /// Content value estimate supplied by the fetcher.
    pub score: f32,
    /// Hash of the page content, used to detect changes between crawls.
    pub content_hash: Option<Vec<u8>>,
    /// Outbound links in page order.
    pub links: Vec<LinkInfo>,
}

impl CrawledPage {
    /// Creates a page crawled right now with no links, no content hash and
    /// a zero score.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            time: now_epoch(),
            score: 0.0,
            content_hash: None,
            links: Vec::new(),
        }
    }

    /// Appends an outbound link. Page order is preserved into the stored
    /// edge list.
    pub fn add_link(&mut self, url: impl Into<String>, score: f32) {
        self.links.push(LinkInfo {
            url: url.into(),
            score,
        });
    }

    pub fn set_hash(&mut self, hash: &[u8]) {
        self.content_hash = Some(hash.to_vec());
    }

    pub fn set_hash32(&mut self, hash: u32) {
        self.content_hash = Some(hash.to_le_bytes().to_vec());
    }

    pub fn set_hash64(&mut self, hash: u64) {
        self.content_hash = Some(hash.to_le_bytes().to_vec());
    }

    pub fn set_hash128(&mut self, hash: u128) {
        self.content_hash = Some(hash.to_le_bytes().to_vec());
    }

    pub fn n_links(&self) -> usize {
        self.links.len()
    }
}

/// The observational record kept for every URL the crawler has fetched or
/// merely seen as a link target.
///
/// Records are created by the store and mutated only through
/// [`crate::PageDB::add`] for their own URL. Invariants:
/// `first_crawl <= last_crawl`, `n_changes <= max(0, n_crawls - 1)`, and a
/// never-crawled page has an empty `content_hash`.
#[derive(Clone, Debug, PartialEq)]
pub struct PageInfo {
    /// URL text exactly as first observed.
    pub url: String,
    /// Seconds since epoch of the first successful crawl; 0 if never crawled.
    pub first_crawl: f64,
    /// Seconds since epoch of the most recent crawl.
    pub last_crawl: f64,
    /// Number of successful crawls. 0 for pages observed only as links.
    pub n_crawls: u64,
    /// Number of content changes detected between consecutive crawls.
    pub n_changes: u64,
    /// Score supplied by the most recent crawl.
    pub score: f32,
    /// Content hash at the last crawl; empty if never crawled.
    pub content_hash: Vec<u8>,
}

impl PageInfo {
    /// Fresh record for a page entering the store through a crawl.
    pub(crate) fn crawled(page: &CrawledPage) -> Self {
        Self {
            url: page.url.clone(),
            first_crawl: page.time,
            last_crawl: page.time,
            n_crawls: 1,
            n_changes: 0,
            score: page.score,
            content_hash: page.content_hash.clone().unwrap_or_default(),
        }
    }

    /// Fresh record for a URL observed only as a link target.
    pub(crate) fn observed(url: String) -> Self {
        Self {
            url,
            first_crawl: 0.0,
            last_crawl: 0.0,
            n_crawls: 0,
            n_changes: 0,
            score: 0.0,
            content_hash: Vec::new(),
        }
    }

    /// Folds a new crawl of this URL into the record.
    pub(crate) fn record_crawl(&mut self, page: &CrawledPage) {
        if self.n_crawls == 0 {
            self.first_crawl = page.time;
        }
        if page.time > self.last_crawl {
            self.last_crawl = page.time;
        }
        self.n_crawls += 1;

        let new_hash = page.content_hash.as_deref().unwrap_or_default();
        if !self.content_hash.is_empty() && self.content_hash != new_hash {
            self.n_changes += 1;
        }
        self.content_hash = new_hash.to_vec();
        self.score = page.score;
    }

    pub fn is_crawled(&self) -> bool {
        self.n_crawls > 0
    }

    /// Estimated content change rate in changes per second, or `None` when
    /// fewer than two crawls have been observed.
    pub fn change_rate(&self) -> Option<f64> {
        if self.n_crawls < 2 {
            return None;
        }
        let span = self.last_crawl - self.first_crawl;
        if span <= 0.0 {
            return None;
        }
        Some(self.n_changes as f64 / span)
    }
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
