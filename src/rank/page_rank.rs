use tracing::{debug, warn};

use super::{l1_delta, sweep, RankOptions};
use crate::error::Result;
use crate::link_stream::LinkSource;

/// Damped power iteration over the edge stream.
///
/// Dangling pages (no outbound links) redistribute their mass uniformly, so
/// the vector keeps summing to one. Iterates until the L1 delta between
/// sweeps drops under the tolerance or the iteration cap is hit.
pub fn page_rank(
    stream: &mut dyn LinkSource,
    n_pages: usize,
    opts: &RankOptions,
) -> Result<Vec<f32>> {
    if n_pages == 0 {
        return Ok(Vec::new());
    }

    let mut out_degree = vec![0u64; n_pages];
    sweep(stream, n_pages, |from, _| out_degree[from] += 1)?;

    let n = n_pages as f32;
    let mut value = vec![1.0 / n; n_pages];
    let mut next = vec![0.0f32; n_pages];

    for iteration in 0..opts.max_iterations {
        let dangling: f32 = value
            .iter()
            .zip(&out_degree)
            .filter(|(_, &deg)| deg == 0)
            .map(|(v, _)| v)
            .sum();
        let base = (1.0 - opts.damping) / n + opts.damping * dangling / n;
        next.fill(base);

        sweep(stream, n_pages, |from, to| {
            next[to] += opts.damping * value[from] / out_degree[from] as f32;
        })?;

        let delta = l1_delta(&value, &next);
        std::mem::swap(&mut value, &mut next);
        debug!(iteration, delta, "page_rank.sweep");
        if delta < opts.tolerance {
            debug!(iteration, "page_rank.converged");
            return Ok(value);
        }
    }

    warn!(
        max_iterations = opts.max_iterations,
        "page_rank.iteration_cap"
    );
    Ok(value)
}
