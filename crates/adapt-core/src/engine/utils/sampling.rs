use rand::prelude::*;
use std::collections::HashSet;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SamplingError {
    #[error("Candidate list is empty, cannot perform sampling")]
    EmptyCandidates,
    #[error("Every one of the {0} candidates has already been observed")]
    AllObserved(usize),
    #[error("Cannot draw a bootstrap resample from an empty population")]
    EmptyPopulation,
}

/// Mixes the campaign seed with the search state so that a given state
/// always replays the same random stream.
pub fn round_seed(seed: u64, cached: usize, remaining_budget: usize) -> u64 {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    for word in [cached as u64, remaining_budget as u64] {
        state ^= word
            .wrapping_add(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(state << 6)
            .wrapping_add(state >> 2);
        state = state.rotate_left(17).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    }
    state
}

/// Picks uniformly among the candidate indices not yet in `observed`.
#[instrument(level = "trace", skip_all, fields(candidates = candidates.len()))]
pub fn draw_unobserved<T: Eq + std::hash::Hash>(
    candidates: &[T],
    observed: &HashSet<T>,
    rng: &mut impl Rng,
) -> Result<usize, SamplingError> {
    if candidates.is_empty() {
        return Err(SamplingError::EmptyCandidates);
    }
    let open: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !observed.contains(*c))
        .map(|(idx, _)| idx)
        .collect();
    open.choose(rng)
        .copied()
        .ok_or(SamplingError::AllObserved(candidates.len()))
}

/// Indices of a resample of size `n` drawn with replacement.
pub fn bootstrap_indices(n: usize, rng: &mut impl Rng) -> Result<Vec<usize>, SamplingError> {
    if n == 0 {
        return Err(SamplingError::EmptyPopulation);
    }
    Ok((0..n).map(|_| rng.gen_range(0..n)).collect())
}
