//! Multiple testing correction.
//!
//! When running many hypothesis tests simultaneously, p-values must be
//! adjusted to control the family-wise error rate or false discovery rate.
//! The enrichment orchestrator applies these procedures independently per
//! factor (column-wise over the raw p-value matrix).

use velella_core::{Result, VelellaError};

/// Multiple testing correction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CorrectionMethod {
    /// Bonferroni correction — controls family-wise error rate (FWER).
    Bonferroni,
    /// Holm step-down procedure — uniformly more powerful FWER control.
    Holm,
    /// Hochberg step-up procedure — FWER control under independence.
    Hochberg,
    /// Benjamini-Hochberg procedure — controls false discovery rate (FDR).
    BenjaminiHochberg,
    /// Benjamini-Yekutieli procedure — FDR control under arbitrary dependence.
    BenjaminiYekutieli,
    /// No correction; p-values pass through unchanged.
    None,
}

/// Apply a multiple testing correction to `p_values`.
///
/// Returns a new `Vec<f64>` of adjusted p-values in the same order as the
/// input.
pub fn correct(p_values: &[f64], method: CorrectionMethod) -> Result<Vec<f64>> {
    match method {
        CorrectionMethod::Bonferroni => bonferroni(p_values),
        CorrectionMethod::Holm => holm(p_values),
        CorrectionMethod::Hochberg => hochberg(p_values),
        CorrectionMethod::BenjaminiHochberg => benjamini_hochberg(p_values),
        CorrectionMethod::BenjaminiYekutieli => benjamini_yekutieli(p_values),
        CorrectionMethod::None => {
            validate_p_values(p_values)?;
            Ok(p_values.to_vec())
        }
    }
}

/// Bonferroni correction: `p_adj = min(p * n, 1.0)`.
pub fn bonferroni(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len() as f64;
    Ok(p_values.iter().map(|&p| (p * n).min(1.0)).collect())
}

/// Holm step-down procedure: `p_(i) * (n - i + 1)` with a running maximum
/// from the smallest p-value up.
pub fn holm(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let indices = sorted_indices(p_values);
    let mut adjusted = vec![0.0; n];
    let mut running_max = 0.0_f64;
    for (i, &idx) in indices.iter().enumerate() {
        let adj = (p_values[idx] * (n - i) as f64).min(1.0);
        running_max = running_max.max(adj);
        adjusted[idx] = running_max;
    }
    Ok(adjusted)
}

/// Hochberg step-up procedure: `p_(i) * (n - i + 1)` with a running minimum
/// from the largest p-value down.
pub fn hochberg(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let n = p_values.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let indices = sorted_indices(p_values);
    let mut adjusted = vec![0.0; n];
    let mut running_min = f64::INFINITY;
    for i in (0..n).rev() {
        let adj = (p_values[indices[i]] * (n - i) as f64).min(1.0);
        running_min = running_min.min(adj);
        adjusted[indices[i]] = running_min;
    }
    Ok(adjusted)
}

/// Benjamini-Hochberg procedure for controlling the false discovery rate.
///
/// Sorts p-values, adjusts as `p * n / rank`, enforces monotonicity
/// from right to left, and clamps to [0, 1].
pub fn benjamini_hochberg(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    Ok(fdr_adjust(p_values, 1.0))
}

/// Benjamini-Yekutieli procedure: BH with the harmonic-sum penalty
/// `c(n) = Σ_{i=1}^{n} 1/i`, valid under arbitrary dependence.
pub fn benjamini_yekutieli(p_values: &[f64]) -> Result<Vec<f64>> {
    validate_p_values(p_values)?;
    let c: f64 = (1..=p_values.len()).map(|i| 1.0 / i as f64).sum();
    Ok(fdr_adjust(p_values, c))
}

/// Shared step-up FDR adjustment: `p * n * scale / rank`, right-to-left
/// running minimum, clamped to [0, 1].
fn fdr_adjust(p_values: &[f64], scale: f64) -> Vec<f64> {
    let n = p_values.len();
    if n == 0 {
        return Vec::new();
    }

    let indices = sorted_indices(p_values);
    let n_f = n as f64;
    let mut adjusted = vec![0.0; n];
    let mut prev = f64::INFINITY;
    for i in (0..n).rev() {
        let rank = (i + 1) as f64;
        let adj = (p_values[indices[i]] * n_f * scale / rank).min(1.0);
        let adj = adj.min(prev);
        adjusted[indices[i]] = adj;
        prev = adj;
    }
    adjusted
}

fn sorted_indices(p_values: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..p_values.len()).collect();
    indices.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    indices
}

fn validate_p_values(p_values: &[f64]) -> Result<()> {
    for (i, &p) in p_values.iter().enumerate() {
        if !(0.0..=1.0).contains(&p) {
            return Err(VelellaError::InvalidInput(format!(
                "p-value at index {} is out of range [0, 1]: {}",
                i, p,
            )));
        }
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────
