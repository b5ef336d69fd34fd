//! Per-feature factor-association statistics.
//!
//! For each requested factor, produces one scalar per feature quantifying
//! the feature–factor association, under a selectable method
//! ([`FeatureStatistic`]) and optional transform ([`Transform`]).

use velella_core::{Result, VelellaError};

use crate::correlation::pearson_pairwise_complete;
use crate::matrix::NamedMatrix;

/// How the per-feature association statistic is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeatureStatistic {
    /// The factor's loading value for the feature. Ignores the data matrix;
    /// incompatible with the permutation test.
    Loading,
    /// Pearson correlation between the feature's observed values and the
    /// factor's score vector, on complete cases.
    Cor,
    /// Fisher's variance-stabilized correlation, `z = sqrt(n-3) · atanh(r)`
    /// with n the total sample count — approximately normal, suitable for
    /// normal-theory comparisons.
    Z,
}

/// Optional transform applied to every feature statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transform {
    /// Pass statistics through unchanged.
    None,
    /// Take absolute values, keeping only the magnitude of association.
    AbsValue,
}

/// Compute the features × factors statistic matrix.
///
/// - `data`: features × samples, rows aligned with `loadings`.
/// - `loadings`: features × factors.
/// - `scores`: samples × factors, columns aligned with `loadings`.
///
/// No side effects; returns a fresh matrix carrying the feature and factor
/// names of the inputs.
pub fn feature_statistics(
    data: &NamedMatrix,
    loadings: &NamedMatrix,
    scores: &NamedMatrix,
    statistic: FeatureStatistic,
    transform: Transform,
) -> Result<NamedMatrix> {
    let n_features = data.n_rows();
    let n_samples = data.n_cols();
    let n_factors = loadings.n_cols();

    if loadings.n_rows() != n_features {
        return Err(VelellaError::InvalidInput(format!(
            "feature_statistics: loadings have {} rows, data has {n_features} features",
            loadings.n_rows(),
        )));
    }
    if scores.n_rows() != n_samples {
        return Err(VelellaError::InvalidInput(format!(
            "feature_statistics: scores have {} rows, data has {n_samples} samples",
            scores.n_rows(),
        )));
    }
    if scores.n_cols() != n_factors {
        return Err(VelellaError::InvalidInput(format!(
            "feature_statistics: scores have {} factors, loadings have {n_factors}",
            scores.n_cols(),
        )));
    }
    if statistic == FeatureStatistic::Z && n_samples <= 3 {
        return Err(VelellaError::InvalidInput(format!(
            "feature_statistics: Fisher's z needs more than 3 samples, got {n_samples}",
        )));
    }

    let mut out = NamedMatrix::zeros(data.row_names().to_vec(), loadings.col_names().to_vec());

    for k in 0..n_factors {
        // Factor score column, fetched once per factor.
        let z_k = scores
            .column(k)
            .ok_or_else(|| VelellaError::Other("feature_statistics: factor column".into()))?;

        for i in 0..n_features {
            let value = match statistic {
                FeatureStatistic::Loading => loadings.get(i, k).unwrap_or(f64::NAN),
                FeatureStatistic::Cor => {
                    let row = data.row(i).expect("feature row in range");
                    pearson_pairwise_complete(row, &z_k)?
                }
                FeatureStatistic::Z => {
                    let row = data.row(i).expect("feature row in range");
                    let r = pearson_pairwise_complete(row, &z_k)?;
                    ((n_samples - 3) as f64).sqrt() * r.atanh()
                }
            };
            let value = match transform {
                Transform::None => value,
                Transform::AbsValue => value.abs(),
            };
            out.set(i, k, value)?;
        }
    }

    Ok(out)
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    /// 2 features × 4 samples; feature 0 tracks the score, feature 1 opposes it.
    fn fixture() -> (NamedMatrix, NamedMatrix, NamedMatrix) {
        let data = NamedMatrix::new(
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![4.0, 3.0, 2.0, 1.0]],
            names("f", 2),
            names("s", 4),
        )
        .unwrap();
        let loadings = NamedMatrix::new(
            vec![vec![0.9], vec![-0.7]],
            names("f", 2),
            vec!["factor1".into()],
        )
        .unwrap();
        let scores = NamedMatrix::new(
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
            names("s", 4),
            vec!["factor1".into()],
        )
        .unwrap();
        (data, loadings, scores)
    }

    #[test]
    fn loading_copies_loading_column() {
        let (data, loadings, scores) = fixture();
        let stats = feature_statistics(
            &data,
            &loadings,
            &scores,
            FeatureStatistic::Loading,
            Transform::None,
        )
        .unwrap();
        assert_eq!(stats.get(0, 0), Some(0.9));
        assert_eq!(stats.get(1, 0), Some(-0.7));
    }

    #[test]
    fn cor_tracks_sign() {
        let (data, loadings, scores) = fixture();
        let stats = feature_statistics(
            &data,
            &loadings,
            &scores,
            FeatureStatistic::Cor,
            Transform::None,
        )
        .unwrap();
        assert!((stats.get(0, 0).unwrap() - 1.0).abs() < 1e-10);
        assert!((stats.get(1, 0).unwrap() + 1.0).abs() < 1e-10);
    }

    #[test]
    fn abs_value_discards_sign() {
        let (data, loadings, scores) = fixture();
        let stats = feature_statistics(
            &data,
            &loadings,
            &scores,
            FeatureStatistic::Loading,
            Transform::AbsValue,
        )
        .unwrap();
        assert_eq!(stats.get(1, 0), Some(0.7));
    }

    #[test]
    fn z_is_scaled_atanh() {
        let data = NamedMatrix::new(
            vec![vec![1.0, 2.0, 2.5, 4.0, 4.5]],
            names("f", 1),
            names("s", 5),
        )
        .unwrap();
        let loadings =
            NamedMatrix::new(vec![vec![0.5]], names("f", 1), vec!["factor1".into()]).unwrap();
        let scores = NamedMatrix::new(
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![6.0]],
            names("s", 5),
            vec!["factor1".into()],
        )
        .unwrap();

        let r = feature_statistics(&data, &loadings, &scores, FeatureStatistic::Cor, Transform::None)
            .unwrap()
            .get(0, 0)
            .unwrap();
        let z = feature_statistics(&data, &loadings, &scores, FeatureStatistic::Z, Transform::None)
            .unwrap()
            .get(0, 0)
            .unwrap();
        assert!((z - (5.0_f64 - 3.0).sqrt() * r.atanh()).abs() < 1e-10);
    }

    #[test]
    fn z_rejects_tiny_sample_count() {
        let data = NamedMatrix::new(vec![vec![1.0, 2.0, 3.0]], names("f", 1), names("s", 3)).unwrap();
        let loadings =
            NamedMatrix::new(vec![vec![0.5]], names("f", 1), vec!["factor1".into()]).unwrap();
        let scores = NamedMatrix::new(
            vec![vec![1.0], vec![2.0], vec![3.0]],
            names("s", 3),
            vec!["factor1".into()],
        )
        .unwrap();
        assert!(feature_statistics(
            &data,
            &loadings,
            &scores,
            FeatureStatistic::Z,
            Transform::None
        )
        .is_err());
    }

    #[test]
    fn shape_mismatches_rejected() {
        let (data, loadings, scores) = fixture();
        let bad_loadings =
            NamedMatrix::new(vec![vec![0.9]], names("f", 1), vec!["factor1".into()]).unwrap();
        assert!(feature_statistics(
            &data,
            &bad_loadings,
            &scores,
            FeatureStatistic::Cor,
            Transform::None
        )
        .is_err());

        let bad_scores = NamedMatrix::new(
            vec![vec![1.0], vec![2.0]],
            names("s", 2),
            vec!["factor1".into()],
        )
        .unwrap();
        assert!(feature_statistics(
            &data,
            &loadings,
            &bad_scores,
            FeatureStatistic::Cor,
            Transform::None
        )
        .is_err());
    }

    #[test]
    fn missing_values_use_complete_cases() {
        let data = NamedMatrix::new(
            vec![vec![1.0, f64::NAN, 3.0, 4.0, 5.0]],
            names("f", 1),
            names("s", 5),
        )
        .unwrap();
        let loadings =
            NamedMatrix::new(vec![vec![0.5]], names("f", 1), vec!["factor1".into()]).unwrap();
        let scores = NamedMatrix::new(
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0], vec![5.0]],
            names("s", 5),
            vec!["factor1".into()],
        )
        .unwrap();
        let stats =
            feature_statistics(&data, &loadings, &scores, FeatureStatistic::Cor, Transform::None)
                .unwrap();
        assert!((stats.get(0, 0).unwrap() - 1.0).abs() < 1e-10);
    }
}
