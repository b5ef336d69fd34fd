//! Midrank computation for the rank-sum engine.

/// Assign average-tie midranks to `data` (1-based).
///
/// Tied values receive the average of their would-be ranks, the convention
/// the Wilcoxon rank-sum statistic expects. Empty input produces empty
/// output.
pub fn midranks(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }

    // Sort (value, original_index) pairs by value.
    let mut indexed: Vec<(f64, usize)> =
        data.iter().copied().enumerate().map(|(i, v)| (v, i)).collect();
    indexed.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        // Find the end of the tie group.
        let mut j = i + 1;
        while j < n && indexed[j].0.total_cmp(&indexed[i].0).is_eq() {
            j += 1;
        }

        // Ranks in the group are (i+1)..=j (1-based); average them.
        let rank_val = (i + j + 1) as f64 / 2.0;
        for k in i..j {
            ranks[indexed[k].1] = rank_val;
        }

        i = j;
    }

    ranks
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ties() {
        assert_eq!(midranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn ties_averaged() {
        // sorted: 1(1), 2(2), 2(3), 3(4) → ties at 2 get (2+3)/2 = 2.5
        assert_eq!(midranks(&[3.0, 1.0, 2.0, 2.0]), vec![4.0, 1.0, 2.5, 2.5]);
    }

    #[test]
    fn all_equal() {
        assert_eq!(midranks(&[5.0, 5.0, 5.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn empty() {
        assert_eq!(midranks(&[]), Vec::<f64>::new());
    }
}
