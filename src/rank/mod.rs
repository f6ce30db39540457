//! Streaming graph kernels.
//!
//! Both kernels consume any [`LinkSource`] plus the page count and emit
//! `f32` vectors indexed by dense page index. They restart the stream once
//! per sweep, so a store-backed stream runs them without materialising the
//! edge set.

mod hits;
mod page_rank;

pub use hits::{hits, HitsScores};
pub use page_rank::page_rank;

use crate::error::{PageDbError, Result};
use crate::link_stream::{Edge, LinkSource, StreamState};

/// Convergence policy shared by the kernels.
#[derive(Clone, Copy, Debug)]
pub struct RankOptions {
    /// PageRank damping factor.
    pub damping: f32,
    /// L1 delta under which an iteration counts as converged.
    pub tolerance: f32,
    /// Hard cap on iterations when the tolerance is never reached.
    pub max_iterations: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            damping: 0.85,
            tolerance: 1e-4,
            max_iterations: 100,
        }
    }
}

/// Resets the stream and applies `visit` to every edge.
fn sweep(
    stream: &mut dyn LinkSource,
    n_pages: usize,
    mut visit: impl FnMut(usize, usize),
) -> Result<()> {
    if stream.reset() == StreamState::Error {
        return Err(PageDbError::Corruption("link stream failed to reset".into()));
    }
    let mut edge = Edge::default();
    loop {
        match stream.next(&mut edge) {
            StreamState::Next => {
                let (from, to) = (edge.from as usize, edge.to as usize);
                if from >= n_pages || to >= n_pages {
                    return Err(PageDbError::Corruption(format!(
                        "edge ({}, {}) outside the {n_pages}-page index space",
                        edge.from, edge.to
                    )));
                }
                visit(from, to);
            }
            StreamState::End => return Ok(()),
            StreamState::Error | StreamState::Init => {
                return Err(PageDbError::Corruption("link stream failed".into()))
            }
        }
    }
}

fn l1_delta(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}
