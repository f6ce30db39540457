use tracing::{debug, warn};

use super::{l1_delta, sweep, RankOptions};
use crate::error::Result;
use crate::link_stream::LinkSource;

/// Hub and authority vectors produced by [`hits`].
#[derive(Clone, Debug)]
pub struct HitsScores {
    pub hub: Vec<f32>,
    pub authority: Vec<f32>,
}

/// Mutual-reinforcement iteration: a page's authority grows with the hub
/// scores pointing at it, its hub score with the authorities it points at.
/// Both vectors are L1-normalised every pass; the damping option is unused
/// here, only the tolerance and iteration cap apply.
pub fn hits(stream: &mut dyn LinkSource, n_pages: usize, opts: &RankOptions) -> Result<HitsScores> {
    if n_pages == 0 {
        return Ok(HitsScores {
            hub: Vec::new(),
            authority: Vec::new(),
        });
    }

    let n = n_pages as f32;
    let mut hub = vec![1.0 / n; n_pages];
    let mut authority = vec![1.0 / n; n_pages];

    for iteration in 0..opts.max_iterations {
        let mut new_hub = vec![0.0f32; n_pages];
        let mut new_authority = vec![0.0f32; n_pages];

        sweep(stream, n_pages, |from, to| {
            new_authority[to] += hub[from];
            new_hub[from] += authority[to];
        })?;

        normalize(&mut new_hub, n);
        normalize(&mut new_authority, n);

        let delta = l1_delta(&hub, &new_hub) + l1_delta(&authority, &new_authority);
        hub = new_hub;
        authority = new_authority;
        debug!(iteration, delta, "hits.sweep");
        if delta < opts.tolerance {
            debug!(iteration, "hits.converged");
            return Ok(HitsScores { hub, authority });
        }
    }

    warn!(max_iterations = opts.max_iterations, "hits.iteration_cap");
    Ok(HitsScores { hub, authority })
}

/// L1-normalises in place; a zero vector falls back to uniform mass.
fn normalize(values: &mut [f32], n: f32) {
    let total: f32 = values.iter().sum();
    if total > 0.0 {
        for value in values.iter_mut() {
            *value /= total;
        }
    } else {
        values.fill(1.0 / n);
    }
}
