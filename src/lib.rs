pub mod codec;
pub mod error;
pub mod hash;
pub mod link_stream;
pub mod logging;
pub mod model;
pub mod options;
pub mod page_db;
pub mod rank;
pub mod schema;
pub mod scores;

pub use crate::error::{PageDbError, Result};
pub use crate::hash::url_hash;
pub use crate::link_stream::{Edge, LinkSource, MemoryLinkStream, PageDBLinkStream, StreamState};
pub use crate::model::{CrawledPage, LinkInfo, PageInfo};
pub use crate::options::{Options, SyncMode};
pub use crate::page_db::PageDB;
pub use crate::rank::{HitsScores, RankOptions};
pub use crate::scores::ScoreFile;
