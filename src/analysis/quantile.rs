//! The single quantile definition used throughout the crate
//!
//! Linear interpolation between order statistics at `h = (n - 1) * p`
//! (the R type-7 rule). At `p = 0.5` and even `n` this reduces to the
//! average of the two middle order statistics, which is the median tie
//! rule the standardizer documents.

use super::AnalysisError;

/// Type-7 quantile of an already-sorted, non-empty slice
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=1.0).contains(&p));

    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Type-7 quantile of an arbitrary sample
///
/// # Errors
///
/// [`AnalysisError::EmptyInput`] for an empty sample,
/// [`AnalysisError::InvalidProbability`] for `p` outside [0, 1].
pub fn quantile(values: &[f64], p: f64) -> Result<f64, AnalysisError> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(AnalysisError::InvalidProbability { p });
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(quantile_sorted(&sorted, p))
}

/// Sample median under the shared quantile rule
///
/// For even-sized samples this is the average of the two middle order
/// statistics.
pub fn median(values: &[f64]) -> Result<f64, AnalysisError> {
    quantile(values, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn odd_median_is_middle_order_statistic() {
        assert_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
    }

    #[test]
    fn even_median_averages_the_middle_two() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
    }

    #[test]
    fn interpolates_between_order_statistics() {
        // h = (5 - 1) * 0.25 = 1 exactly, h = 4 * 0.1 = 0.4 interpolates
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(quantile(&values, 0.25).unwrap(), 20.0);
        assert_relative_eq!(quantile(&values, 0.1).unwrap(), 14.0, max_relative = 1e-12);
    }

    #[test]
    fn extremes_are_min_and_max() {
        let values = [7.0, 3.0, 9.0, 1.0];
        assert_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_eq!(quantile(&values, 1.0).unwrap(), 9.0);
    }

    #[test]
    fn single_value_is_its_own_quantile() {
        assert_eq!(quantile(&[42.0], 0.73).unwrap(), 42.0);
    }

    #[test]
    fn empty_input_and_bad_probability_fail() {
        assert_eq!(quantile(&[], 0.5), Err(AnalysisError::EmptyInput));
        assert!(matches!(
            quantile(&[1.0], 1.5),
            Err(AnalysisError::InvalidProbability { .. })
        ));
    }

    #[test]
    fn quantile_is_permutation_invariant() {
        let a = [5.0, 1.0, 4.0, 2.0, 3.0];
        let b = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&a, 0.35).unwrap(), quantile(&b, 0.35).unwrap());
    }
}
