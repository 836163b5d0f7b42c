// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Knee detection for concave, increasing curves.
//!
//! Both axes are min-max normalized, the curve is replaced by its
//! difference to the diagonal, and the knee is the last local maximum of
//! that difference curve before it drops below a sensitivity-scaled
//! threshold.

/// Index of the knee point of `(x, y)`, or `None` when the curve has none.
///
/// `x` must be strictly increasing. A larger `sensitivity` waits for a
/// deeper drop after the candidate maximum before accepting it.
pub fn find_knee(x: &[f64], y: &[f64], sensitivity: f64) -> Option<usize> {
    let n = x.len();
    if n < 3 || y.len() != n {
        return None;
    }

    let x_norm = normalize(x)?;
    let y_norm = normalize(y)?;
    let difference: Vec<f64> = y_norm
        .iter()
        .zip(&x_norm)
        .map(|(yv, xv)| yv - xv)
        .collect();

    let maxima = local_extrema(&difference, |center, side| center >= side);
    let minima = local_extrema(&difference, |center, side| center <= side);
    let first_maximum = *maxima.first()?;

    let mean_step =
        x_norm.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (n - 1) as f64;
    let thresholds: Vec<f64> = maxima
        .iter()
        .map(|&idx| difference[idx] - sensitivity * mean_step)
        .collect();

    let mut threshold = 0.0;
    let mut threshold_index = first_maximum;
    let mut next_maximum = 0;
    for idx in first_maximum..n - 1 {
        if maxima.get(next_maximum) == Some(&idx) {
            threshold = thresholds[next_maximum];
            threshold_index = idx;
            next_maximum += 1;
        }
        if minima.binary_search(&idx).is_ok() {
            threshold = 0.0;
        }
        if difference[idx + 1] < threshold {
            return Some(threshold_index);
        }
    }
    None
}

fn normalize(values: &[f64]) -> Option<Vec<f64>> {
    let (lo, hi) = sigrec_core::stats::min_max(values)?;
    let span = hi - lo;
    if !span.is_finite() || span <= 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - lo) / span).collect())
}

/// Indices whose value satisfies `keep` against both neighbours; edges compare with themselves.
fn local_extrema(values: &[f64], keep: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let last = values.len() - 1;
    (0..values.len())
        .filter(|&idx| {
            let left = values[idx.saturating_sub(1)];
            let right = values[(idx + 1).min(last)];
            keep(values[idx], left) && keep(values[idx], right)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::find_knee;

    #[test]
    fn saturating_curve_has_knee_at_the_bend() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [0.0, 0.8, 0.9, 0.95, 0.97, 1.0];
        assert_eq!(find_knee(&x, &y, 1.0), Some(1));
    }

    #[test]
    fn straight_line_has_no_knee() {
        let x = [2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(find_knee(&x, &y, 1.0), None);
    }

    #[test]
    fn flat_or_short_curves_have_no_knee() {
        assert_eq!(find_knee(&[1.0, 2.0, 3.0], &[0.5, 0.5, 0.5], 1.0), None);
        assert_eq!(find_knee(&[1.0, 2.0], &[0.0, 1.0], 1.0), None);
        assert_eq!(find_knee(&[1.0, 2.0, 3.0], &[0.0, 1.0], 1.0), None);
    }

    #[test]
    fn high_sensitivity_can_suppress_a_shallow_knee() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [0.0, 0.8, 0.9, 0.95, 0.97, 1.0];
        assert_eq!(find_knee(&x, &y, 10.0), None);
    }
}
