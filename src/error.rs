use std::io;

use parking_lot::Mutex;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PageDbError>;

/// Upper bound on the diagnostic text retained in the last-error slot.
pub const MAX_ERROR_LENGTH: usize = 10_000;

#[derive(Debug, Error)]
pub enum PageDbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("storage engine error: {0}")]
    Store(#[from] redb::Error),
    #[error("corruption detected: {0}")]
    Corruption(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("page {0:#018x} not found")]
    NoPage(u64),
}

impl From<redb::DatabaseError> for PageDbError {
    fn from(err: redb::DatabaseError) -> Self {
        PageDbError::Store(err.into())
    }
}

impl From<redb::TransactionError> for PageDbError {
    fn from(err: redb::TransactionError) -> Self {
        PageDbError::Store(err.into())
    }
}

impl From<redb::TableError> for PageDbError {
    fn from(err: redb::TableError) -> Self {
        PageDbError::Store(err.into())
    }
}

impl From<redb::StorageError> for PageDbError {
    fn from(err: redb::StorageError) -> Self {
        PageDbError::Store(err.into())
    }
}

impl From<redb::CommitError> for PageDbError {
    fn from(err: redb::CommitError) -> Self {
        PageDbError::Store(err.into())
    }
}

/// Last-error slot carried by a [`crate::PageDB`] handle.
///
/// Per-call `Result` returns are authoritative; the slot only mirrors the
/// most recent failure for single-threaded tooling and is never cleared
/// automatically.
#[derive(Debug, Default)]
pub struct ErrorSlot {
    last: Mutex<Option<String>>,
}

impl ErrorSlot {
    pub(crate) fn record(&self, err: &PageDbError) {
        let mut msg = err.to_string();
        if msg.len() > MAX_ERROR_LENGTH {
            let mut end = MAX_ERROR_LENGTH;
            while !msg.is_char_boundary(end) {
                end -= 1;
            }
            msg.truncate(end);
        }
        *self.last.lock() = Some(msg);
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.last.lock().clone()
    }
}
