// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use sigrec_core::{AnalysisError, BreakSet, stats};

/// Optimal 1-D partitions for every class count up to `max_classes`.
///
/// One dynamic-programming sweep over the sorted values minimizes the
/// within-class sum of squares; back-pointers allow reconstructing the
/// optimal partition for any class count without re-running the sweep.
#[derive(Clone, Debug)]
pub struct JenksSweep {
    sorted: Vec<f64>,
    /// `backpointers[k][j]`: start index of the last class when `sorted[..j]` is split into `k` classes.
    backpointers: Vec<Vec<usize>>,
    /// Optimal within-class sum of squares per class count (index 0 unused).
    ssw_by_classes: Vec<f64>,
}

struct PrefixMoments {
    shift: f64,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl PrefixMoments {
    fn new(sorted: &[f64]) -> Self {
        // centering keeps the sum-of-squares subtraction well conditioned
        let shift = stats::mean(sorted).unwrap_or(0.0);
        let mut sum = vec![0.0; sorted.len() + 1];
        let mut sum_sq = vec![0.0; sorted.len() + 1];
        for (idx, &v) in sorted.iter().enumerate() {
            let centered = v - shift;
            sum[idx + 1] = sum[idx] + centered;
            sum_sq[idx + 1] = sum_sq[idx] + centered * centered;
        }
        Self { shift, sum, sum_sq }
    }

    /// Sum of squared deviations of `sorted[start..end]`.
    fn cost(&self, start: usize, end: usize) -> f64 {
        let len = (end - start) as f64;
        let s = self.sum[end] - self.sum[start];
        let sq = self.sum_sq[end] - self.sum_sq[start];
        (sq - s * s / len).max(0.0)
    }
}

impl JenksSweep {
    pub fn new(values: &[f64], max_classes: usize) -> Result<Self, AnalysisError> {
        if max_classes == 0 {
            return Err(AnalysisError::invalid_input(
                "natural breaks require max_classes >= 1; got 0",
            ));
        }
        if values.len() < max_classes {
            return Err(AnalysisError::invalid_input(format!(
                "natural breaks for {max_classes} classes require at least {max_classes} values; got {}",
                values.len()
            )));
        }
        if let Some((idx, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(AnalysisError::invalid_input(format!(
                "natural breaks input must be finite: index {idx} has {value}"
            )));
        }

        let sorted = stats::sorted(values);
        let n = sorted.len();
        let moments = PrefixMoments::new(&sorted);
        tracing::trace!(shift = moments.shift, n, max_classes, "jenks sweep");

        let inf = f64::INFINITY;
        let mut backpointers = vec![vec![usize::MAX; n + 1]; max_classes + 1];
        let mut ssw_by_classes = vec![inf; max_classes + 1];

        let mut dp_prev: Vec<f64> = (0..=n)
            .map(|j| if j == 0 { 0.0 } else { moments.cost(0, j) })
            .collect();
        backpointers[1].iter_mut().skip(1).for_each(|bp| *bp = 0);
        ssw_by_classes[1] = dp_prev[n];

        for classes in 2..=max_classes {
            let mut dp_curr = vec![inf; n + 1];
            let mut row = vec![usize::MAX; n + 1];
            fill_row(
                &moments,
                &dp_prev,
                &mut dp_curr,
                &mut row,
                classes,
                (classes, n),
                (classes - 1, n - 1),
            );
            ssw_by_classes[classes] = dp_curr[n];
            backpointers[classes] = row;
            dp_prev = dp_curr;
        }

        Ok(Self {
            sorted,
            backpointers,
            ssw_by_classes,
        })
    }

    pub fn max_classes(&self) -> usize {
        self.backpointers.len() - 1
    }

    /// Optimal within-class sum of squares for `classes`.
    pub fn ssw(&self, classes: usize) -> Option<f64> {
        self.ssw_by_classes
            .get(classes)
            .copied()
            .filter(|_| classes >= 1)
    }

    /// Interior boundaries for `classes`: the maximum of every class but the last.
    pub fn breaks(&self, classes: usize) -> Result<BreakSet, AnalysisError> {
        if classes == 0 || classes > self.max_classes() {
            return Err(AnalysisError::invalid_input(format!(
                "classes={classes} outside the swept range 1..={}",
                self.max_classes()
            )));
        }

        let mut starts = Vec::with_capacity(classes - 1);
        let mut cursor = self.sorted.len();
        for current in (2..=classes).rev() {
            let start = self.backpointers[current][cursor];
            if start == usize::MAX || start == 0 || start >= cursor {
                return Err(AnalysisError::numerical_issue(format!(
                    "natural breaks backtracking failed at classes={current}, end={cursor}"
                )));
            }
            starts.push(start);
            cursor = start;
        }
        starts.reverse();

        Ok(starts.into_iter().map(|start| self.sorted[start - 1]).collect())
    }
}

/// Divide-and-conquer fill of one DP row.
///
/// The optimal last-class start is monotone in the end index for the
/// sum-of-squares cost, so each midpoint only scans the window its
/// neighbours allow.
fn fill_row(
    moments: &PrefixMoments,
    dp_prev: &[f64],
    dp_curr: &mut [f64],
    row: &mut [usize],
    classes: usize,
    ends: (usize, usize),
    starts: (usize, usize),
) {
    let mut stack = vec![(ends, starts)];
    while let Some(((end_lo, end_hi), (opt_lo, opt_hi))) = stack.pop() {
        if end_lo > end_hi {
            continue;
        }
        let mid = end_lo + (end_hi - end_lo) / 2;
        let lo = opt_lo.max(classes - 1);
        let hi = opt_hi.min(mid - 1);

        let mut best = f64::INFINITY;
        let mut best_start = lo;
        for start in lo..=hi {
            let candidate = dp_prev[start] + moments.cost(start, mid);
            if candidate < best {
                best = candidate;
                best_start = start;
            }
        }
        dp_curr[mid] = best;
        row[mid] = best_start;

        if mid > end_lo {
            stack.push(((end_lo, mid - 1), (opt_lo, best_start)));
        }
        stack.push(((mid + 1, end_hi), (best_start, opt_hi)));
    }
}
