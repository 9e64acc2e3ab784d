// Resampling validators: percentile bootstrap and sign-flip permutation
//
// Draws are split into chunks of RESAMPLE_CHUNK. Each chunk owns a StdRng
// seeded from (master seed, chunk index), so the output depends only on the
// seed and the input, never on how rayon schedules the chunks.

use crate::analysis::descriptive::{mean, percentile};
use crate::analysis::distributions::clamp_probability;
use crate::analysis::paired::{CiMethod, ConfidenceInterval};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Draws per independently seeded chunk
pub const RESAMPLE_CHUNK: usize = 1000;

/// Derive the sub-seed of one chunk (SplitMix64 finalizer)
pub fn chunk_seed(master: u64, chunk: usize) -> u64 {
    let mut z = master ^ (chunk as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// (chunk index, draws in chunk) covering `total` draws
fn chunks(total: usize) -> Vec<(usize, usize)> {
    (0..total.div_ceil(RESAMPLE_CHUNK))
        .map(|c| (c, RESAMPLE_CHUNK.min(total - c * RESAMPLE_CHUNK)))
        .collect()
}

/// Means of `resamples` bootstrap resamples of `sample`, in chunk order
pub fn bootstrap_means(sample: &[f64], resamples: usize, seed: u64) -> Vec<f64> {
    let n = sample.len();
    if n == 0 {
        return Vec::new();
    }

    chunks(resamples)
        .into_par_iter()
        .map(|(chunk, draws)| {
            let mut rng = StdRng::seed_from_u64(chunk_seed(seed, chunk));
            (0..draws)
                .map(|_| {
                    let sum: f64 = (0..n).map(|_| sample[rng.gen_range(0..n)]).sum();
                    sum / n as f64
                })
                .collect::<Vec<f64>>()
        })
        .collect::<Vec<Vec<f64>>>()
        .into_iter()
        .flatten()
        .collect()
}

/// Percentile bootstrap interval for the mean of `sample`
///
/// With fewer than two values the interval degrades to the sample's
/// min/max and is tagged `insufficient_data`.
pub fn bootstrap_ci(sample: &[f64], level: f64, resamples: usize, seed: u64) -> ConfidenceInterval {
    let observed = mean(sample);

    if sample.len() < 2 || resamples == 0 {
        let min = sample.iter().copied().reduce(f64::min);
        let max = sample.iter().copied().reduce(f64::max);
        return ConfidenceInterval {
            level,
            lower: min,
            upper: max,
            mean_difference: observed,
            method: CiMethod::InsufficientData,
            n_resamples: None,
        };
    }

    let mut means = bootstrap_means(sample, resamples, seed);
    means.sort_by(|a, b| a.total_cmp(b));

    let tail = (1.0 - level) / 2.0 * 100.0;
    ConfidenceInterval {
        level,
        lower: Some(percentile(&means, tail)),
        upper: Some(percentile(&means, 100.0 - tail)),
        mean_difference: observed,
        method: CiMethod::PercentileBootstrap,
        n_resamples: Some(resamples),
    }
}

/// Sign-flip permutation test on paired differences (H1: mean > 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationTest {
    pub test_name: String,
    pub observed_mean_diff: f64,
    pub p_value: f64,
    pub reject_h0: bool,
    pub n_permutations: usize,
    pub seed: u64,
}

crate::impl_sanitize!(PermutationTest {});

/// Fraction of sign-flipped means >= the observed mean difference
pub fn permutation_test(
    diff: &[f64],
    permutations: usize,
    seed: u64,
    alpha: f64,
) -> PermutationTest {
    let n = diff.len();
    let observed = mean(diff);
    // Sign flips of equal magnitudes can reorder the summation
    let tolerance = 1e-12 * observed.abs().max(1.0);

    let exceed: usize = if n == 0 {
        permutations
    } else {
        chunks(permutations)
            .into_par_iter()
            .map(|(chunk, draws)| {
                let mut rng = StdRng::seed_from_u64(chunk_seed(seed, chunk));
                (0..draws)
                    .filter(|_| {
                        let sum: f64 = diff
                            .iter()
                            .map(|d| if rng.gen::<bool>() { *d } else { -*d })
                            .sum();
                        sum / n as f64 >= observed - tolerance
                    })
                    .count()
            })
            .sum()
    };

    let p_value = if permutations == 0 {
        1.0
    } else {
        clamp_probability(exceed as f64 / permutations as f64)
    };

    tracing::debug!(observed, p_value, permutations, "permutation test");

    PermutationTest {
        test_name: "Sign-flip permutation test (one-sided)".to_string(),
        observed_mean_diff: observed,
        p_value,
        reject_h0: p_value < alpha,
        n_permutations: permutations,
        seed,
    }
}
