//! Numerically-stable division and smoothed objective helpers.
//!
//! Every place the crate divides by a quantity that may legitimately be
//! zero (demand in early years, storage capacity before build-out) goes
//! through [`safe_ratio`]. The epsilon bias is a deliberate, documented
//! approximation: for any economically meaningful denominator the bias is
//! negligible, and at zero it trades an undefined quotient for a finite,
//! differentiable one.

/// Smoothing offset added to denominators in [`safe_ratio`].
pub const EPSILON: f64 = 1e-6;

/// Smoothing radius squared used by [`smoothed_objective`].
///
/// Chosen so the smoothing is invisible at typical objective magnitudes
/// (order 1e-2 and above) while keeping the function differentiable at zero.
pub const OBJECTIVE_EPS2: f64 = 1e-4;

/// Division that stays finite when the denominator reaches zero.
///
/// Computes `numerator / (denominator + EPSILON)`. Finite for any finite
/// non-negative inputs; no branch, so the result is differentiable in both
/// arguments everywhere.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / (denominator + EPSILON)
}

/// Element-wise [`safe_ratio`] over two equally long slices.
///
/// # Panics
///
/// Panics if the slices have different lengths; callers align series via
/// [`crate::series::YearSpan`] checks before reaching this point.
pub fn safe_ratio_slice(numerator: &[f64], denominator: &[f64]) -> Vec<f64> {
    assert_eq!(
        numerator.len(),
        denominator.len(),
        "safe_ratio_slice operands must be aligned"
    );
    numerator
        .iter()
        .zip(denominator.iter())
        .map(|(&n, &d)| safe_ratio(n, d))
        .collect()
}

/// Smoothed absolute mean: `sqrt(mean(delta)^2 + OBJECTIVE_EPS2)`.
///
/// Numerically equal to `|mean(delta)|` away from zero but differentiable
/// at zero, unlike the absolute value, so gradient-based optimizers remain
/// well-behaved when production exactly meets demand.
///
/// Returns `sqrt(OBJECTIVE_EPS2)` for an empty slice (mean taken as zero).
pub fn smoothed_objective(delta: &[f64]) -> f64 {
    let mean = mean_of(delta);
    (mean * mean + OBJECTIVE_EPS2).sqrt()
}

/// Analytic gradient of [`smoothed_objective`] with respect to each delta.
///
/// `d obj / d delta_i = mean / (n * sqrt(mean^2 + OBJECTIVE_EPS2))`,
/// identical for every element since only the mean enters the objective.
pub fn smoothed_objective_gradient(delta: &[f64]) -> Vec<f64> {
    if delta.is_empty() {
        return Vec::new();
    }
    let n = delta.len() as f64;
    let mean = mean_of(delta);
    let per_element = mean / (n * (mean * mean + OBJECTIVE_EPS2).sqrt());
    vec![per_element; delta.len()]
}

fn mean_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_ratio_finite_at_zero_denominator() {
        let r = safe_ratio(5.0, 0.0);
        assert!(r.is_finite());
        assert!((r - 5.0 / EPSILON).abs() < 1.0);
    }

    #[test]
    fn safe_ratio_zero_over_zero_is_zero() {
        assert_eq!(safe_ratio(0.0, 0.0), 0.0);
    }

    #[test]
    fn safe_ratio_bias_negligible_for_large_denominator() {
        let r = safe_ratio(50.0, 100.0);
        assert!((r - 0.5).abs() < 1e-8);
    }

    #[test]
    fn safe_ratio_slice_elementwise() {
        let r = safe_ratio_slice(&[1.0, 2.0, 0.0], &[2.0, 4.0, 0.0]);
        assert!((r[0] - 0.5).abs() < 1e-8);
        assert!((r[1] - 0.5).abs() < 1e-8);
        assert_eq!(r[2], 0.0);
    }

    #[test]
    fn objective_finite_and_small_at_zero() {
        let obj = smoothed_objective(&[0.0, 0.0, 0.0]);
        assert!(obj.is_finite());
        assert!((obj - OBJECTIVE_EPS2.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn objective_matches_abs_mean_away_from_zero() {
        let obj = smoothed_objective(&[2.0, 4.0, 6.0]); // mean 4.0
        assert!((obj - 4.0).abs() < 1e-4);

        let neg = smoothed_objective(&[-2.0, -4.0, -6.0]);
        assert!((neg - 4.0).abs() < 1e-4);
    }

    #[test]
    fn objective_differentiable_at_zero() {
        // Symmetric finite difference around zero mean: the two one-sided
        // slopes must agree, which they do not for |mean(delta)|.
        let h = 1e-7;
        let f = |x: f64| smoothed_objective(&[x]);
        let forward = (f(h) - f(0.0)) / h;
        let backward = (f(0.0) - f(-h)) / h;
        assert!((forward - backward).abs() < 1e-3, "{forward} vs {backward}");
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let delta = [0.3, -0.1, 0.7, 0.2];
        let grad = smoothed_objective_gradient(&delta);
        let h = 1e-6;
        for i in 0..delta.len() {
            let mut plus = delta;
            plus[i] += h;
            let mut minus = delta;
            minus[i] -= h;
            let fd = (smoothed_objective(&plus) - smoothed_objective(&minus)) / (2.0 * h);
            assert!(
                (grad[i] - fd).abs() < 1e-6,
                "component {i}: analytic {} vs fd {fd}",
                grad[i]
            );
        }
    }

    #[test]
    fn gradient_of_empty_is_empty() {
        assert!(smoothed_objective_gradient(&[]).is_empty());
    }
}
