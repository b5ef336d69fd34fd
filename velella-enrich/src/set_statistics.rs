//! Competitive set-level test statistic engines.
//!
//! Both engines partition the per-feature statistics into "in-set" (m1
//! members) and "out-of-set" (m2 = total − m1) groups and run a two-sample
//! comparison per (feature set, factor) pair:
//!
//! - [`SetStatistic::MeanDiff`] — mean-difference t-test with pooled
//!   standard deviation.
//! - [`SetStatistic::RankSum`] — Wilcoxon rank-sum statistic under the
//!   normal approximation (average-tie midranks, no continuity correction).
//!
//! With correlation adjustment, the mean pairwise Pearson correlation among
//! in-set features (estimated from the raw data) inflates the variance term:
//! a VIF of `1 + (m1−1)·mean_cor` for the t-test, and a closed-form arcsine
//! correction for the rank-sum variance. When the mean correlation is
//! exactly zero both adjusted formulas reduce to their unadjusted
//! counterparts.

use std::f64::consts::PI;

use velella_core::{Result, VelellaError};

use crate::correlation::mean_pairwise_correlation;
use crate::descriptive::{mean, variance};
use crate::distribution::{normal_two_sided_p, t_two_sided_p};
use crate::feature_sets::FeatureSetIndex;
use crate::matrix::NamedMatrix;
use crate::rank::midranks;

/// Which two-sample comparison the set engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetStatistic {
    /// Mean difference with a pooled-variance t-test.
    MeanDiff,
    /// Wilcoxon rank-sum with the normal approximation.
    RankSum,
}

/// Paired statistic and p-value matrices (feature sets × factors).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetTestMatrices {
    /// Test statistic per (set, factor) cell.
    pub statistics: NamedMatrix,
    /// Two-sided p-value per (set, factor) cell.
    pub p_values: NamedMatrix,
}

/// Run a set statistic engine over every (feature set, factor) pair.
///
/// - `feature_stats`: features × factors per-feature statistics.
/// - `sets`: canonical member-position index per retained feature set; every
///   set needs at least 2 members and at least 2 non-members (callers enforce
///   the minimum-size filter before this point).
/// - `cor_adjusted`: apply the intra-set correlation variance adjustment;
///   requires `data` (features × samples, rows aligned with
///   `feature_stats`) to estimate the mean pairwise correlation.
///
/// Returns fresh statistic and p-value matrices; nothing is mutated in place.
pub fn set_statistics(
    feature_stats: &NamedMatrix,
    sets: &[FeatureSetIndex],
    method: SetStatistic,
    cor_adjusted: bool,
    data: Option<&NamedMatrix>,
) -> Result<SetTestMatrices> {
    let n_features = feature_stats.n_rows();
    let n_factors = feature_stats.n_cols();

    if sets.is_empty() {
        return Err(VelellaError::InvalidInput(
            "set_statistics: no feature sets to test".into(),
        ));
    }
    for set in sets {
        let m1 = set.members.len();
        let m2 = n_features - m1;
        if m1 < 2 || m2 < 2 {
            return Err(VelellaError::InvalidInput(format!(
                "set_statistics: set '{}' has {m1} members and {m2} non-members; \
                 both sides need at least 2",
                set.name,
            )));
        }
        if let Some(&max) = set.members.iter().max() {
            if max >= n_features {
                return Err(VelellaError::InvalidInput(format!(
                    "set_statistics: set '{}' member position {max} out of range for \
                     {n_features} features",
                    set.name,
                )));
            }
        }
    }

    // Correlation adjustment inputs, estimated once per set.
    let adjustment = if cor_adjusted {
        let data = data.ok_or_else(|| {
            VelellaError::InvalidInput(
                "set_statistics: correlation adjustment requires the raw data matrix".into(),
            )
        })?;
        if data.n_rows() != n_features {
            return Err(VelellaError::InvalidInput(format!(
                "set_statistics: data has {} rows, feature statistics have {n_features}",
                data.n_rows(),
            )));
        }
        let mut per_set = Vec::with_capacity(sets.len());
        for set in sets {
            let rows: Vec<&[f64]> = set
                .members
                .iter()
                .map(|&i| data.row(i).expect("member position validated"))
                .collect();
            per_set.push(Adjustment {
                mean_cor: mean_pairwise_correlation(&rows)?,
                n_samples: data.n_cols(),
            });
        }
        Some(per_set)
    } else {
        None
    };

    let set_names: Vec<String> = sets.iter().map(|s| s.name.clone()).collect();
    let factor_names = feature_stats.col_names().to_vec();
    let mut statistics = NamedMatrix::zeros(set_names.clone(), factor_names.clone());
    let mut p_values = NamedMatrix::zeros(set_names, factor_names);

    for k in 0..n_factors {
        let column = feature_stats
            .column(k)
            .ok_or_else(|| VelellaError::Other("set_statistics: factor column".into()))?;
        // Midranks over the whole feature universe, once per factor.
        let ranks = match method {
            SetStatistic::RankSum => Some(midranks(&column)),
            SetStatistic::MeanDiff => None,
        };

        for (s, set) in sets.iter().enumerate() {
            let adjust = adjustment.as_ref().map(|a| a[s]);
            let (stat, p) = match method {
                SetStatistic::MeanDiff => {
                    let mut is_member = vec![false; n_features];
                    for &m in &set.members {
                        is_member[m] = true;
                    }
                    let mut in_group = Vec::with_capacity(set.members.len());
                    let mut out_group = Vec::with_capacity(n_features - set.members.len());
                    for (i, &v) in column.iter().enumerate() {
                        if is_member[i] {
                            in_group.push(v);
                        } else {
                            out_group.push(v);
                        }
                    }
                    mean_diff_t(&in_group, &out_group, adjust)?
                }
                SetStatistic::RankSum => {
                    let ranks = ranks.as_ref().expect("ranks computed for RankSum");
                    let r1: f64 = set.members.iter().map(|&i| ranks[i]).sum();
                    rank_sum_z(r1, set.members.len(), n_features - set.members.len(), adjust)
                }
            };
            statistics.set(s, k, stat)?;
            p_values.set(s, k, p)?;
        }
    }

    Ok(SetTestMatrices {
        statistics,
        p_values,
    })
}

/// Per-set correlation adjustment inputs.
#[derive(Debug, Clone, Copy)]
struct Adjustment {
    mean_cor: f64,
    n_samples: usize,
}

/// Pooled-variance mean-difference t statistic and two-sided p-value.
///
/// Unadjusted: `t = mean.diff / (pooled.sd · sqrt(1/m1 + 1/m2))` with
/// `df = m1 + m2 − 2`. Adjusted: the in-set variance term is inflated by
/// `vif = 1 + (m1−1)·mean_cor` and `df = n_samples − 2`.
fn mean_diff_t(in_group: &[f64], out_group: &[f64], adjust: Option<Adjustment>) -> Result<(f64, f64)> {
    let m1 = in_group.len() as f64;
    let m2 = out_group.len() as f64;

    let mean_diff = mean(in_group)? - mean(out_group)?;
    let pooled_sd = (((m1 - 1.0) * variance(in_group, 1)? + (m2 - 1.0) * variance(out_group, 1)?)
        / (m1 + m2 - 2.0))
        .sqrt();

    let (t, df) = match adjust {
        Some(adj) => {
            let vif = 1.0 + (m1 - 1.0) * adj.mean_cor;
            let t = mean_diff / (pooled_sd * (vif / m1 + 1.0 / m2).sqrt());
            (t, adj.n_samples as f64 - 2.0)
        }
        None => {
            let t = mean_diff / (pooled_sd * (1.0 / m1 + 1.0 / m2).sqrt());
            (t, m1 + m2 - 2.0)
        }
    };

    Ok((t, t_two_sided_p(t, df)))
}

/// Rank-sum z statistic and two-sided p-value.
///
/// `r1` is the midrank sum of the in-set group over the combined ranking.
/// The statistic is the Mann-Whitney `W = r1 − m1(m1+1)/2`, standardized
/// against mean `m1·m2/2` and either the textbook variance
/// `m1·m2·(m1+m2+1)/12` or the arcsine correlation-adjusted variance.
fn rank_sum_z(r1: f64, m1: usize, m2: usize, adjust: Option<Adjustment>) -> (f64, f64) {
    let m1f = m1 as f64;
    let m2f = m2 as f64;
    let w = r1 - m1f * (m1f + 1.0) / 2.0;

    let var = match adjust {
        Some(adj) => {
            let rho = adj.mean_cor;
            (m1f * m2f / (2.0 * PI))
                * (1.0_f64.asin()
                    + (m2f - 1.0) * 0.5_f64.asin()
                    + (m1f - 1.0) * (m2f - 1.0) * (rho / 2.0).asin()
                    + (m1f - 1.0) * ((rho + 1.0) / 2.0).asin())
        }
        None => m1f * m2f * (m1f + m2f + 1.0) / 12.0,
    };

    let z = (w - m1f * m2f / 2.0) / var.sqrt();
    (z, normal_two_sided_p(z))
}

// ── Tests ──────────────────────────────────────────────────────────────────
