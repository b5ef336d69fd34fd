//! Competitive feature-set enrichment against a latent factor decomposition.
//!
//! [`run_enrichment`] is the top-level entry point: it aligns the data,
//! loading and factor-score matrices to a shared feature ordering, filters
//! degenerate feature sets, computes per-feature association statistics,
//! dispatches to the parametric or permutation significance procedure, and
//! assembles an immutable [`EnrichmentResults`] bundle with raw and adjusted
//! p-values plus per-factor significant-set lists.
//!
//! ```
//! use velella_enrich::enrichment::{run_enrichment, EnrichmentConfig, FactorSelection};
//! use velella_enrich::feature_sets::FeatureSets;
//! use velella_enrich::matrix::NamedMatrix;
//!
//! // 6 features × 4 samples; the first three features track the factor.
//! let data = NamedMatrix::new(
//!     vec![
//!         vec![1.0, 2.0, 3.0, 4.0],
//!         vec![2.0, 4.0, 6.0, 8.0],
//!         vec![1.5, 2.5, 3.5, 4.5],
//!         vec![4.0, 1.0, 3.0, 2.0],
//!         vec![0.0, 5.0, 1.0, 2.0],
//!         vec![3.0, 3.0, 1.0, 4.0],
//!     ],
//!     (0..6).map(|i| format!("f{i}")).collect(),
//!     (0..4).map(|i| format!("s{i}")).collect(),
//! ).unwrap();
//! let loadings = NamedMatrix::new(
//!     vec![vec![0.9], vec![0.8], vec![0.7], vec![0.1], vec![0.0], vec![0.2]],
//!     (0..6).map(|i| format!("f{i}")).collect(),
//!     vec!["factor1".into()],
//! ).unwrap();
//! let scores = NamedMatrix::new(
//!     vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
//!     (0..4).map(|i| format!("s{i}")).collect(),
//!     vec!["factor1".into()],
//! ).unwrap();
//! let sets = FeatureSets::Named(vec![
//!     ("tracking".into(), vec!["f0".into(), "f1".into(), "f2".into()]),
//!     ("background".into(), vec!["f3".into(), "f4".into(), "f5".into()]),
//! ]);
//!
//! let config = EnrichmentConfig { min_size: 2, ..Default::default() };
//! let results = run_enrichment(&data, &loadings, &scores, &sets,
//!                              &FactorSelection::All, &config).unwrap();
//! assert_eq!(results.p_values.shape(), (2, 1));
//! ```

use velella_core::{Result, Summarizable, VelellaError};

use crate::correction::{correct, CorrectionMethod};
use crate::descriptive::variance;
use crate::feature_sets::{build_index, FeatureSets};
use crate::feature_stats::{feature_statistics, FeatureStatistic, Transform};
use crate::matrix::NamedMatrix;
use crate::permutation::permutation_test;
use crate::set_statistics::{set_statistics, SetStatistic};

// ── Configuration ──────────────────────────────────────────────────────────

/// Significance derivation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TestMode {
    /// Closed-form parametric test, no correlation adjustment.
    Parametric,
    /// Closed-form parametric test with intra-set correlation adjustment.
    CorAdjParametric,
    /// Empirical permutation null (unadjusted parametric statistic).
    Permutation,
}

/// Which factors of the decomposition to analyze.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FactorSelection {
    /// Every factor in the loading matrix.
    All,
    /// Factors selected by name.
    Names(Vec<String>),
    /// Factors selected by column index.
    Indices(Vec<usize>),
}

/// Configuration for [`run_enrichment`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnrichmentConfig {
    /// Per-feature association statistic.
    pub statistic: FeatureStatistic,
    /// Transform applied to feature statistics.
    pub transform: Transform,
    /// Set-level two-sample comparison.
    pub set_statistic: SetStatistic,
    /// Significance derivation strategy.
    pub test: TestMode,
    /// Minimum feature-set size after restriction to overlapping features.
    pub min_size: usize,
    /// Number of permutation trials (permutation mode only).
    pub n_permutations: usize,
    /// Worker count for the permutation fan-out (`parallel` feature only).
    pub n_threads: usize,
    /// Multiple-testing correction, applied independently per factor.
    pub correction: CorrectionMethod,
    /// Significance threshold for the per-factor significant-set lists.
    pub alpha: f64,
    /// Global seed for the permutation null (permutation mode only).
    pub seed: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            statistic: FeatureStatistic::Cor,
            transform: Transform::AbsValue,
            set_statistic: SetStatistic::MeanDiff,
            test: TestMode::Parametric,
            min_size: 10,
            n_permutations: 1000,
            n_threads: 1,
            correction: CorrectionMethod::BenjaminiHochberg,
            alpha: 0.1,
            seed: 42,
        }
    }
}

// ── Result bundle ──────────────────────────────────────────────────────────

/// Immutable result bundle of one enrichment run.
///
/// All matrices are keyed by feature-set name (rows) and factor name
/// (columns); feature-level statistics by feature name (rows).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnrichmentResults {
    /// Per-feature association statistics (features × factors).
    pub feature_statistics: NamedMatrix,
    /// Set-level test statistics (sets × factors).
    pub set_statistics: NamedMatrix,
    /// Raw p-values (sets × factors).
    pub p_values: NamedMatrix,
    /// Adjusted p-values (sets × factors).
    pub p_adjusted: NamedMatrix,
    /// Per factor, the feature-set names with adjusted p-value ≤ α, keyed in
    /// factor column order.
    significant: Vec<(String, Vec<String>)>,
    /// Significance threshold the lists were extracted at.
    pub alpha: f64,
}

impl EnrichmentResults {
    /// Significant feature-set names for one factor, or `None` for an
    /// unknown factor name. An empty slice means nothing passed α.
    pub fn significant_sets(&self, factor: &str) -> Option<&[String]> {
        self.significant
            .iter()
            .find(|(name, _)| name == factor)
            .map(|(_, sets)| sets.as_slice())
    }

    /// All per-factor significant-set lists, in factor column order.
    pub fn significant(&self) -> &[(String, Vec<String>)] {
        &self.significant
    }
}

impl Summarizable for EnrichmentResults {
    fn summary(&self) -> String {
        let (n_sets, n_factors) = self.p_values.shape();
        let n_hits: usize = self.significant.iter().map(|(_, s)| s.len()).sum();
        format!(
            "EnrichmentResults: {n_sets} sets x {n_factors} factors, {n_hits} significant at alpha={}",
            self.alpha,
        )
    }
}

// ── Orchestrator ───────────────────────────────────────────────────────────

/// Run a competitive feature-set enrichment analysis.
///
/// - `data`: features × samples training data.
/// - `loadings`: features × factors loading matrix; rows keyed by the same
///   feature identifiers as `data`.
/// - `scores`: samples × factors factor-score matrix; columns aligned with
///   `loadings`.
/// - `feature_sets`: membership in either supported form (permutation mode
///   requires the binary-matrix form).
///
/// All fatal conditions (unknown or constant factors, empty feature overlap,
/// incompatible configuration) are validated before any statistic is
/// computed, so no partial result bundle is ever returned.
///
/// # Errors
///
/// - [`VelellaError::InvalidConfig`] — α outside (0,1); `Loading` statistic
///   or named-list feature sets combined with the permutation test; zero
///   permutations in permutation mode.
/// - [`VelellaError::InvalidInput`] — shape mismatches, unknown factors,
///   constant factors, no overlapping features.
/// - [`VelellaError::Degenerate`] — no feature set meets `min_size` after
///   restriction to overlapping features.
pub fn run_enrichment(
    data: &NamedMatrix,
    loadings: &NamedMatrix,
    scores: &NamedMatrix,
    feature_sets: &FeatureSets,
    factors: &FactorSelection,
    config: &EnrichmentConfig,
) -> Result<EnrichmentResults> {
    validate_config(config, feature_sets)?;

    if scores.n_rows() != data.n_cols() {
        return Err(VelellaError::InvalidInput(format!(
            "run_enrichment: scores have {} samples, data has {}",
            scores.n_rows(),
            data.n_cols(),
        )));
    }
    if loadings.n_cols() != scores.n_cols() {
        return Err(VelellaError::InvalidInput(format!(
            "run_enrichment: loadings have {} factors, scores have {}",
            loadings.n_cols(),
            scores.n_cols(),
        )));
    }

    // Resolve the factor selection against the loading columns.
    let factor_cols = resolve_factors(loadings, factors)?;

    // Reject constant factors before any statistic is computed.
    for &k in &factor_cols {
        let col = scores
            .column(k)
            .ok_or_else(|| VelellaError::Other("run_enrichment: factor column".into()))?;
        let var = variance(&col, 0).map_err(|_| {
            VelellaError::InvalidInput("run_enrichment: need at least 1 sample".into())
        })?;
        if var == 0.0 {
            return Err(VelellaError::InvalidInput(format!(
                "run_enrichment: factor '{}' is constant across samples",
                loadings.col_names()[k],
            )));
        }
    }

    // Shared feature ordering: data row order restricted to the feature-set
    // universe.
    let membership = feature_sets.to_membership()?;
    let mut shared_rows = Vec::new();
    let mut shared_names = Vec::new();
    for (i, name) in data.row_names().iter().enumerate() {
        if membership.feature_names().iter().any(|f| f == name) {
            shared_rows.push(i);
            shared_names.push(name.clone());
        }
    }
    if shared_rows.is_empty() {
        return Err(VelellaError::InvalidInput(
            "run_enrichment: data features share no identifiers with the feature sets".into(),
        ));
    }

    // Realign loadings to the shared ordering.
    let loading_rows: Vec<usize> = shared_names
        .iter()
        .map(|name| {
            loadings.row_index(name).ok_or_else(|| {
                VelellaError::InvalidInput(format!(
                    "run_enrichment: feature '{name}' missing from the loading matrix",
                ))
            })
        })
        .collect::<Result<_>>()?;

    let data_aligned = data.select_rows(&shared_rows)?;
    let loadings_aligned = loadings.select_rows(&loading_rows)?.select_cols(&factor_cols)?;
    let scores_selected = scores.select_cols(&factor_cols)?;

    // Canonical index form; sets below min_size are silently dropped.
    let index = build_index(&membership, &shared_names, config.min_size);
    if index.is_empty() {
        return Err(VelellaError::Degenerate(format!(
            "run_enrichment: no feature set has at least {} overlapping features",
            config.min_size,
        )));
    }

    let feature_stats = feature_statistics(
        &data_aligned,
        &loadings_aligned,
        &scores_selected,
        config.statistic,
        config.transform,
    )?;

    let set_results = match config.test {
        TestMode::Parametric => set_statistics(
            &feature_stats,
            &index,
            config.set_statistic,
            false,
            None,
        )?,
        TestMode::CorAdjParametric => set_statistics(
            &feature_stats,
            &index,
            config.set_statistic,
            true,
            Some(&data_aligned),
        )?,
        TestMode::Permutation => permutation_test(
            &feature_stats,
            &index,
            config.set_statistic,
            config.n_permutations,
            config.n_threads,
            config.seed,
        )?,
    };

    // Correction and significant-set extraction, independently per factor.
    let mut p_adjusted = NamedMatrix::zeros(
        set_results.p_values.row_names().to_vec(),
        set_results.p_values.col_names().to_vec(),
    );
    let mut significant = Vec::with_capacity(factor_cols.len());
    for (k, factor) in set_results.p_values.col_names().to_vec().iter().enumerate() {
        let raw = set_results
            .p_values
            .column(k)
            .ok_or_else(|| VelellaError::Other("run_enrichment: p-value column".into()))?;
        let adjusted = correct(&raw, config.correction)?;
        let mut hits = Vec::new();
        for (s, &adj) in adjusted.iter().enumerate() {
            p_adjusted.set(s, k, adj)?;
            if adj <= config.alpha {
                hits.push(set_results.p_values.row_names()[s].clone());
            }
        }
        significant.push((factor.clone(), hits));
    }

    Ok(EnrichmentResults {
        feature_statistics: feature_stats,
        set_statistics: set_results.statistics,
        p_values: set_results.p_values,
        p_adjusted,
        significant,
        alpha: config.alpha,
    })
}

fn validate_config(config: &EnrichmentConfig, feature_sets: &FeatureSets) -> Result<()> {
    if !(config.alpha > 0.0 && config.alpha < 1.0) {
        return Err(VelellaError::InvalidConfig(format!(
            "alpha must lie in (0, 1), got {}",
            config.alpha,
        )));
    }
    if config.test == TestMode::Permutation {
        if config.statistic == FeatureStatistic::Loading {
            return Err(VelellaError::InvalidConfig(
                "the loading feature statistic is not resampling-sensitive and cannot be \
                 combined with the permutation test"
                    .into(),
            ));
        }
        if !feature_sets.is_matrix() {
            return Err(VelellaError::InvalidConfig(
                "the permutation test requires feature sets in binary-matrix form".into(),
            ));
        }
        if config.n_permutations == 0 {
            return Err(VelellaError::InvalidConfig(
                "n_permutations must be > 0 in permutation mode".into(),
            ));
        }
    }
    Ok(())
}

fn resolve_factors(loadings: &NamedMatrix, factors: &FactorSelection) -> Result<Vec<usize>> {
    let cols = match factors {
        FactorSelection::All => (0..loadings.n_cols()).collect(),
        FactorSelection::Names(names) => names
            .iter()
            .map(|name| {
                loadings.col_index(name).ok_or_else(|| {
                    VelellaError::InvalidInput(format!("unknown factor '{name}'"))
                })
            })
            .collect::<Result<Vec<usize>>>()?,
        FactorSelection::Indices(indices) => {
            for &idx in indices {
                if idx >= loadings.n_cols() {
                    return Err(VelellaError::InvalidInput(format!(
                        "factor index {idx} out of range for {} factors",
                        loadings.n_cols(),
                    )));
                }
            }
            indices.clone()
        }
    };
    if cols.is_empty() {
        return Err(VelellaError::InvalidInput(
            "run_enrichment: no factors selected".into(),
        ));
    }
    Ok(cols)
}

// ── Tests ──────────────────────────────────────────────────────────────────
