//! Linear trend estimation over monthly buckets
//!
//! The independent variable is the zero-based bucket index, not the calendar
//! date, so the fit runs over however many buckets exist regardless of gaps.

use rust_decimal::prelude::ToPrimitive;

use crate::models::{MonthlyBucket, RegressionResult};

/// Fit `y = slope * x + intercept` over `(index, value)` points.
///
/// Returns `None` for fewer than two points. A constant series is a flat
/// line with no coefficient of determination.
pub fn fit_points(values: &[f64]) -> Option<RegressionResult> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    // Float sums would leave a residual variance on fractional constants
    let first = values[0];
    if values.iter().all(|y| *y == first) {
        return Some(RegressionResult {
            slope: 0.0,
            intercept: first,
            r_squared: None,
            predicted_next: first,
            point_count: values.len(),
        });
    }

    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_xy) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_xy += x * y;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mean_y = sum_y / n;
    let mut ss_tot = 0.0;
    let mut ss_res = 0.0;
    for (i, y) in values.iter().enumerate() {
        let predicted = slope * i as f64 + intercept;
        ss_tot += (y - mean_y).powi(2);
        ss_res += (y - predicted).powi(2);
    }
    let r_squared = (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot);

    Some(RegressionResult {
        slope,
        intercept,
        r_squared,
        predicted_next: slope * n + intercept,
        point_count: values.len(),
    })
}

/// Fit a trend over ordered monthly buckets
pub fn fit(buckets: &[MonthlyBucket]) -> Option<RegressionResult> {
    let values: Vec<f64> = buckets
        .iter()
        .map(|b| b.total_quantity.to_f64().unwrap_or(0.0))
        .collect();
    fit_points(&values)
}
