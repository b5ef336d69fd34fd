//! Pearson correlation, including the missing-value-aware variant used for
//! feature–factor association and the mean pairwise correlation behind the
//! variance-inflation adjustment.

use velella_core::{Result, VelellaError};

/// Pearson product-moment correlation coefficient between `x` and `y`.
///
/// Returns 0.0 if either series is constant (zero variance).
pub fn pearson(x: &[f64], y: &[f64]) -> Result<f64> {
    validate_paired(x, y)?;

    let n = x.len() as f64;
    let mean_x: f64 = x.iter().sum::<f64>() / n;
    let mean_y: f64 = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return Ok(0.0);
    }
    Ok(cov / denom)
}

/// Pearson correlation on complete cases only.
///
/// Observation pairs where either value is NaN are dropped before the
/// correlation is computed. Errors if fewer than 2 complete pairs remain.
pub fn pearson_pairwise_complete(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(VelellaError::InvalidInput(format!(
            "correlation: x and y must have the same length ({} vs {})",
            x.len(),
            y.len(),
        )));
    }

    let (cx, cy): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(&a, &b)| (a, b))
        .unzip();

    if cx.len() < 2 {
        return Err(VelellaError::InvalidInput(format!(
            "correlation: only {} complete observation pairs, need at least 2",
            cx.len(),
        )));
    }
    pearson(&cx, &cy)
}

/// Mean pairwise Pearson correlation among a collection of variables,
/// excluding self-correlation.
///
/// Equals `(Σ R − m) / (m·(m−1))` where R is the full m×m correlation matrix.
/// Requires at least 2 variables.
pub fn mean_pairwise_correlation(rows: &[&[f64]]) -> Result<f64> {
    let m = rows.len();
    if m < 2 {
        return Err(VelellaError::InvalidInput(
            "mean_pairwise_correlation: need at least 2 variables".into(),
        ));
    }

    // Off-diagonal sum over the upper triangle, doubled by symmetry.
    #[cfg(feature = "parallel")]
    let upper_sum: f64 = {
        use rayon::prelude::*;
        (0..m)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..m)
                    .map(|j| pearson(rows[i], rows[j]).unwrap_or(0.0))
                    .sum::<f64>()
            })
            .sum()
    };
    #[cfg(not(feature = "parallel"))]
    let upper_sum: f64 = {
        let mut sum = 0.0;
        for i in 0..m {
            for j in (i + 1)..m {
                sum += pearson(rows[i], rows[j])?;
            }
        }
        sum
    };

    Ok(2.0 * upper_sum / (m * (m - 1)) as f64)
}

fn validate_paired(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(VelellaError::InvalidInput(format!(
            "correlation: x and y must have the same length ({} vs {})",
            x.len(),
            y.len(),
        )));
    }
    if x.len() < 2 {
        return Err(VelellaError::InvalidInput(
            "correlation: need at least 2 observations".into(),
        ));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────
