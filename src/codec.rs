//! Serialisation of [`PageInfo`] records for the `hash2info` index.
//!
//! The layout is little-endian, packed and self-delimiting:
//!
//! ```text
//! f64 first_crawl | f64 last_crawl | f32 score | u64 n_crawls |
//! u64 n_changes | u16 url_len | u16 content_hash_len |
//! url bytes | content_hash bytes
//! ```
//!
//! `load(dump(p)) == p` holds for every valid record; malformed buffers are
//! rejected rather than partially decoded.

use std::convert::TryInto;

use chrono::TimeZone;

use crate::error::{PageDbError, Result};
use crate::model::PageInfo;

/// Byte length of the fixed-size prefix ahead of the two variable tails.
const FIXED_LEN: usize = 8 + 8 + 4 + 8 + 8 + 2 + 2;

/// URL length cap in the printed debug representation.
const PRINT_URL_MAX: usize = 512;

/// Serialises a record into a contiguous buffer.
pub fn dump(info: &PageInfo) -> Result<Vec<u8>> {
    let url = info.url.as_bytes();
    let url_len: u16 = url
        .len()
        .try_into()
        .map_err(|_| PageDbError::InvalidArgument("url length exceeds u16::MAX".into()))?;
    let hash_len: u16 = info
        .content_hash
        .len()
        .try_into()
        .map_err(|_| PageDbError::InvalidArgument("content hash length exceeds u16::MAX".into()))?;

    let mut buf = Vec::with_capacity(FIXED_LEN + url.len() + info.content_hash.len());
    buf.extend_from_slice(&info.first_crawl.to_le_bytes());
    buf.extend_from_slice(&info.last_crawl.to_le_bytes());
    buf.extend_from_slice(&info.score.to_le_bytes());
    buf.extend_from_slice(&info.n_crawls.to_le_bytes());
    buf.extend_from_slice(&info.n_changes.to_le_bytes());
    buf.extend_from_slice(&url_len.to_le_bytes());
    buf.extend_from_slice(&hash_len.to_le_bytes());
    buf.extend_from_slice(url);
    buf.extend_from_slice(&info.content_hash);
    Ok(buf)
}

/// Decodes a record previously produced by [`dump`].
pub fn load(src: &[u8]) -> Result<PageInfo> {
    if src.len() < FIXED_LEN {
        return Err(PageDbError::Corruption(format!(
            "page info record too short: {} bytes",
            src.len()
        )));
    }

    let first_crawl = f64::from_le_bytes(src[0..8].try_into().expect("checked length"));
    let last_crawl = f64::from_le_bytes(src[8..16].try_into().expect("checked length"));
    let score = f32::from_le_bytes(src[16..20].try_into().expect("checked length"));
    let n_crawls = u64::from_le_bytes(src[20..28].try_into().expect("checked length"));
    let n_changes = u64::from_le_bytes(src[28..36].try_into().expect("checked length"));
    let url_len = u16::from_le_bytes(src[36..38].try_into().expect("checked length")) as usize;
    let hash_len = u16::from_le_bytes(src[38..40].try_into().expect("checked length")) as usize;

    let expected = FIXED_LEN + url_len + hash_len;
    if src.len() != expected {
        return Err(PageDbError::Corruption(format!(
            "page info record length mismatch: expected {expected}, got {}",
            src.len()
        )));
    }

    let url = std::str::from_utf8(&src[FIXED_LEN..FIXED_LEN + url_len])
        .map_err(|_| PageDbError::Corruption("page info url is not valid UTF-8".into()))?
        .to_owned();
    let content_hash = src[FIXED_LEN + url_len..].to_vec();

    Ok(PageInfo {
        url,
        first_crawl,
        last_crawl,
        n_crawls,
        n_changes,
        score,
        content_hash,
    })
}

/// Renders the fixed-width one-line representation used by inspection
/// tooling:
///
/// ```text
/// <ctime first_crawl> <ctime last_crawl> <n_crawls> <n_changes> <url>
/// ```
///
/// Timestamps take the 24-byte `ctime` form, counters the 8-byte
/// two-digit exponential form, and the URL is truncated to 512 bytes.
pub fn print_line(info: &PageInfo) -> String {
    let mut end = PRINT_URL_MAX.min(info.url.len());
    while !info.url.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{} {} {} {} {}",
        ctime(info.first_crawl),
        ctime(info.last_crawl),
        exp2(info.n_crawls),
        exp2(info.n_changes),
        &info.url[..end]
    )
}

fn ctime(epoch: f64) -> String {
    match chrono::Utc.timestamp_opt(epoch as i64, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%a %b %e %H:%M:%S %Y").to_string(),
        _ => format!("{:>24}", "invalid time"),
    }
}

/// Fixed 8-byte exponential rendering, e.g. `1.21e+01`.
fn exp2(v: u64) -> String {
    if v == 0 {
        return "0.00e+00".to_owned();
    }
    let v = v as f64;
    let mut exp = v.log10().floor() as i32;
    let mut mantissa = v / 10f64.powi(exp);
    if mantissa >= 9.995 {
        mantissa /= 10.0;
        exp += 1;
    }
    format!("{mantissa:.2}e{exp:+03}")
}
