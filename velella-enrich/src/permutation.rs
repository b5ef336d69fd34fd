//! Permutation null estimator.
//!
//! Runs `n_permutations` independent trials, each permuting the feature axis
//! of the per-feature statistic matrix (the feature rows of the loading
//! matrix, position-for-position against the data ordering) and recomputing
//! the unadjusted parametric set statistic. The empirical two-sided p-value
//! for each (set, factor) cell is the exact fraction of trials whose absolute
//! null statistic exceeds the absolute observed statistic — including the
//! boundary case of zero exceeding trials (p = 0).
//!
//! Trials share only read-only inputs; each draws its permutation from a
//! trial-local generator whose seed derives deterministically from the global
//! seed and the trial index, so results are bit-identical at any parallelism.
//! With the `parallel` feature the trials fan out over a rayon pool and are
//! collected by trial index, never by arrival order.

use velella_core::{Result, VelellaError};

use crate::feature_sets::FeatureSetIndex;
use crate::matrix::NamedMatrix;
use crate::set_statistics::{set_statistics, SetStatistic, SetTestMatrices};

/// Permutation counts below this trigger an advisory about unstable tail
/// estimates.
const STABLE_TAIL_PERMUTATIONS: usize = 1000;

/// Estimate empirical p-values by permuting the feature axis.
///
/// - `feature_stats`: observed features × factors statistics.
/// - `sets`: canonical member-position index per retained feature set.
/// - `n_threads`: worker count for the trial fan-out (`parallel` feature
///   only; 0 means one worker per available core). Ignored in sequential
///   builds.
///
/// Returns the observed unadjusted statistics alongside the empirical
/// p-values. Small `n_permutations` yields an unreliable tail estimate near
/// zero; this is surfaced as a warning, not an error.
pub fn permutation_test(
    feature_stats: &NamedMatrix,
    sets: &[FeatureSetIndex],
    method: SetStatistic,
    n_permutations: usize,
    n_threads: usize,
    seed: u64,
) -> Result<SetTestMatrices> {
    if n_permutations == 0 {
        return Err(VelellaError::InvalidConfig(
            "permutation test: n_permutations must be > 0".into(),
        ));
    }
    if n_permutations < STABLE_TAIL_PERMUTATIONS {
        log::warn!(
            "permutation test: {n_permutations} trials may be too few for a stable \
             tail-probability estimate; consider at least {STABLE_TAIL_PERMUTATIONS}",
        );
    }

    // Observed statistics, computed the same way as every null trial.
    let observed = set_statistics(feature_stats, sets, method, false, None)?;
    let n_features = feature_stats.n_rows();

    let trial = |t: usize| -> Result<Vec<f64>> {
        let mut rng = Xorshift64::new(derive_seed(seed, t as u64));
        let mut perm: Vec<usize> = (0..n_features).collect();
        fisher_yates_shuffle(&mut perm, &mut rng);

        let permuted = feature_stats.select_rows(&perm)?;
        let null = set_statistics(&permuted, sets, method, false, None)?;
        Ok(null.statistics.as_slice().iter().map(|v| v.abs()).collect())
    };

    // Null statistic matrices, indexed by trial number.
    #[cfg(feature = "parallel")]
    let null_trials: Vec<Vec<f64>> = {
        use rayon::prelude::*;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| VelellaError::Other(format!("permutation test: thread pool: {e}")))?;
        pool.install(|| {
            (0..n_permutations)
                .into_par_iter()
                .map(trial)
                .collect::<Result<Vec<_>>>()
        })?
    };
    #[cfg(not(feature = "parallel"))]
    let null_trials: Vec<Vec<f64>> = {
        let _ = n_threads;
        (0..n_permutations).map(trial).collect::<Result<Vec<_>>>()?
    };

    // Empirical tail: fraction of trials with |null| > |observed|, per cell.
    let observed_flat = observed.statistics.as_slice();
    let mut exceed = vec![0usize; observed_flat.len()];
    for null in &null_trials {
        for (count, (&null_v, obs_v)) in exceed.iter_mut().zip(null.iter().zip(observed_flat)) {
            if null_v > obs_v.abs() {
                *count += 1;
            }
        }
    }
    let p_flat: Vec<f64> = exceed
        .iter()
        .map(|&c| c as f64 / n_permutations as f64)
        .collect();
    let p_values = NamedMatrix::from_flat(
        p_flat,
        observed.statistics.row_names().to_vec(),
        observed.statistics.col_names().to_vec(),
    )?;

    Ok(SetTestMatrices {
        statistics: observed.statistics,
        p_values,
    })
}

// ── Seeded PRNG ────────────────────────────────────────────────────────────

/// Derive a trial-local seed from the global seed and trial index
/// (SplitMix64 finalizer).
fn derive_seed(seed: u64, trial: u64) -> u64 {
    let mut z = seed.wrapping_add((trial + 1).wrapping_mul(0x9E3779B97F4A7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Minimal xorshift64 PRNG for reproducible permutations without external deps.
struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

/// Fisher-Yates shuffle of index positions.
fn fisher_yates_shuffle(slice: &mut [usize], rng: &mut Xorshift64) {
    let n = slice.len();
    for i in (1..n).rev() {
        let j = (rng.next_u64() as usize) % (i + 1);
        slice.swap(i, j);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn stats_matrix(values: Vec<f64>) -> NamedMatrix {
        let n = values.len();
        NamedMatrix::from_flat(values, names("f", n), vec!["factor1".into()]).unwrap()
    }

    fn set(name: &str, members: &[usize]) -> FeatureSetIndex {
        FeatureSetIndex {
            name: name.into(),
            members: members.to_vec(),
        }
    }

    /// 20 features; the first three carry a strong signal.
    fn enriched_fixture() -> (NamedMatrix, Vec<FeatureSetIndex>) {
        let mut values: Vec<f64> = (0..20).map(|i| (i as f64) * 0.01).collect();
        values[0] = 10.0;
        values[1] = 11.0;
        values[2] = 12.0;
        (stats_matrix(values), vec![set("signal", &[0, 1, 2])])
    }

    #[test]
    fn p_values_are_exact_trial_fractions() {
        let (fs, sets) = enriched_fixture();
        let out = permutation_test(&fs, &sets, SetStatistic::MeanDiff, 50, 1, 7).unwrap();
        let p = out.p_values.get(0, 0).unwrap();
        assert!((0.0..=1.0).contains(&p));
        let scaled = p * 50.0;
        assert!((scaled - scaled.round()).abs() < 1e-9, "p={p} not a multiple of 1/50");
    }

    #[test]
    fn strong_enrichment_hits_zero_boundary() {
        let (fs, sets) = enriched_fixture();
        let out = permutation_test(&fs, &sets, SetStatistic::MeanDiff, 100, 1, 7).unwrap();
        // Only a permutation reproducing the exact member assignment can
        // match the observed statistic, and matching does not exceed.
        assert!(out.p_values.get(0, 0).unwrap() < 0.05);
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let (fs, sets) = enriched_fixture();
        let a = permutation_test(&fs, &sets, SetStatistic::RankSum, 60, 1, 42).unwrap();
        let b = permutation_test(&fs, &sets, SetStatistic::RankSum, 60, 1, 42).unwrap();
        assert_eq!(a.p_values.as_slice(), b.p_values.as_slice());
        assert_eq!(a.statistics.as_slice(), b.statistics.as_slice());
    }

    #[test]
    fn different_seeds_differ() {
        let (fs, sets) = enriched_fixture();
        // Unenriched set: null statistics vary, so tail counts should too.
        let sets = [sets[0].clone(), set("noise", &[5, 9, 13])];
        let a = permutation_test(&fs, &sets, SetStatistic::MeanDiff, 40, 1, 1).unwrap();
        let b = permutation_test(&fs, &sets, SetStatistic::MeanDiff, 40, 1, 2).unwrap();
        assert_ne!(a.p_values.as_slice(), b.p_values.as_slice());
    }

    #[test]
    fn observed_statistics_match_parametric_engine() {
        let (fs, sets) = enriched_fixture();
        let perm = permutation_test(&fs, &sets, SetStatistic::MeanDiff, 10, 1, 3).unwrap();
        let para = set_statistics(&fs, &sets, SetStatistic::MeanDiff, false, None).unwrap();
        assert_eq!(perm.statistics.as_slice(), para.statistics.as_slice());
    }

    #[test]
    fn zero_permutations_rejected() {
        let (fs, sets) = enriched_fixture();
        assert!(permutation_test(&fs, &sets, SetStatistic::MeanDiff, 0, 1, 7).is_err());
    }

    #[test]
    fn trial_seeds_are_distinct() {
        let s0 = derive_seed(42, 0);
        let s1 = derive_seed(42, 1);
        let s2 = derive_seed(43, 0);
        assert_ne!(s0, s1);
        assert_ne!(s0, s2);
    }
}
