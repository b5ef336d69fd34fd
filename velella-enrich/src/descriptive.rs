//! Basic descriptive statistics used by the set statistic engines.

use velella_core::{Result, VelellaError};

/// Arithmetic mean of `data`.
///
/// Errors on empty input.
pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(VelellaError::InvalidInput(
            "mean: data must be non-empty".into(),
        ));
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Variance of `data` with `ddof` delta degrees of freedom.
///
/// `ddof = 0` gives the population variance, `ddof = 1` the sample variance.
pub fn variance(data: &[f64], ddof: usize) -> Result<f64> {
    let n = data.len();
    if n <= ddof {
        return Err(VelellaError::InvalidInput(format!(
            "variance: need more than {ddof} observations, got {n}",
        )));
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    Ok(ss / (n - ddof) as f64)
}

/// Standard deviation of `data` with `ddof` delta degrees of freedom.
pub fn std_dev(data: &[f64], ddof: usize) -> Result<f64> {
    Ok(variance(data, ddof)?.sqrt())
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    #[test]
    fn mean_basic() {
        assert!((mean(&[1.0, 2.0, 3.0, 4.0]).unwrap() - 2.5).abs() < TOL);
    }

    #[test]
    fn mean_empty() {
        assert!(mean(&[]).is_err());
    }

    #[test]
    fn variance_sample_vs_population() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((variance(&data, 0).unwrap() - 4.0).abs() < TOL);
        assert!((variance(&data, 1).unwrap() - 32.0 / 7.0).abs() < TOL);
    }

    #[test]
    fn variance_too_few() {
        assert!(variance(&[1.0], 1).is_err());
    }

    #[test]
    fn std_dev_matches_variance() {
        let data = [1.0, 3.0, 5.0];
        let v = variance(&data, 1).unwrap();
        assert!((std_dev(&data, 1).unwrap() - v.sqrt()).abs() < TOL);
    }
}
