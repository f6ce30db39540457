//! Dense per-page score arrays persisted next to the store.
//!
//! Graph kernels produce one `f32` per dense page index; slot `i` of a
//! score file always belongs to index `i`. The file is memory-mapped so
//! downstream passes can read scores without loading the whole vector.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::error::{PageDbError, Result};

const MAGIC: &[u8; 8] = b"PDBSCORE";
const VERSION: u32 = 1;

/// magic (8) + version (4) + reserved (4) + n_slots (8).
const HEADER_SIZE: usize = 24;

/// A fixed-length mmap-backed array of `f32` scores.
#[derive(Debug)]
pub struct ScoreFile {
    mmap: MmapMut,
    n_slots: u64,
    path: PathBuf,
}

impl ScoreFile {
    /// Creates (or truncates) a score file with `n_slots` zeroed slots.
    pub fn create(path: impl AsRef<Path>, n_slots: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(HEADER_SIZE as u64 + n_slots * 4)?;
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        mmap[0..8].copy_from_slice(MAGIC);
        mmap[8..12].copy_from_slice(&VERSION.to_le_bytes());
        mmap[12..16].copy_from_slice(&[0u8; 4]);
        mmap[16..24].copy_from_slice(&n_slots.to_le_bytes());

        Ok(Self {
            mmap,
            n_slots,
            path,
        })
    }

    /// Opens an existing score file, validating its header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        if (len as usize) < HEADER_SIZE {
            return Err(PageDbError::Corruption(format!(
                "score file {} too short for a header",
                path.display()
            )));
        }
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        if &mmap[0..8] != MAGIC {
            return Err(PageDbError::Corruption(format!(
                "score file {} has a bad magic",
                path.display()
            )));
        }
        let version = u32::from_le_bytes(mmap[8..12].try_into().expect("checked length"));
        if version != VERSION {
            return Err(PageDbError::Corruption(format!(
                "score file {} has unsupported version {version}",
                path.display()
            )));
        }
        let n_slots = u64::from_le_bytes(mmap[16..24].try_into().expect("checked length"));
        if len != HEADER_SIZE as u64 + n_slots * 4 {
            return Err(PageDbError::Corruption(format!(
                "score file {} length does not match {n_slots} slots",
                path.display()
            )));
        }

        Ok(Self {
            mmap,
            n_slots,
            path,
        })
    }

    pub fn n_slots(&self) -> u64 {
        self.n_slots
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, idx: u64) -> Result<f32> {
        let off = self.offset(idx)?;
        Ok(f32::from_le_bytes(
            self.mmap[off..off + 4].try_into().expect("slot is 4 bytes"),
        ))
    }

    pub fn set(&mut self, idx: u64, score: f32) -> Result<()> {
        let off = self.offset(idx)?;
        self.mmap[off..off + 4].copy_from_slice(&score.to_le_bytes());
        Ok(())
    }

    /// Overwrites every slot from `scores`, which must match the slot count.
    pub fn write_all(&mut self, scores: &[f32]) -> Result<()> {
        if scores.len() as u64 != self.n_slots {
            return Err(PageDbError::InvalidArgument(format!(
                "expected {} scores, got {}",
                self.n_slots,
                scores.len()
            )));
        }
        for (i, score) in scores.iter().enumerate() {
            let off = HEADER_SIZE + i * 4;
            self.mmap[off..off + 4].copy_from_slice(&score.to_le_bytes());
        }
        Ok(())
    }

    /// Flushes outstanding writes to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.mmap.flush()?;
        Ok(())
    }

    fn offset(&self, idx: u64) -> Result<usize> {
        if idx >= self.n_slots {
            return Err(PageDbError::InvalidArgument(format!(
                "score slot {idx} out of range ({} slots)",
                self.n_slots
            )));
        }
        Ok(HEADER_SIZE + idx as usize * 4)
    }
}
