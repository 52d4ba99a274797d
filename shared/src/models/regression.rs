//! Linear trend results

use serde::{Deserialize, Serialize};

/// Ordinary-least-squares line fitted over bucket indices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// `None` when every observed value is identical (R² is 0/0)
    pub r_squared: Option<f64>,
    /// Value at the first unobserved index, full precision
    pub predicted_next: f64,
    pub point_count: usize,
}

impl RegressionResult {
    /// Line value at bucket index `x`
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Forecast rounded for display
    pub fn predicted_next_rounded(&self) -> i64 {
        self.predicted_next.round() as i64
    }

    /// Line values over the observed indices, for chart overlays
    pub fn fitted_values(&self) -> Vec<f64> {
        (0..self.point_count)
            .map(|i| self.value_at(i as f64))
            .collect()
    }

    /// Human-readable equation, e.g. `y = -7.00x + 15.00`
    pub fn equation(&self) -> String {
        let sign = if self.intercept < 0.0 { '-' } else { '+' };
        format!("y = {:.2}x {} {:.2}", self.slope, sign, self.intercept.abs())
    }

    /// R² formatted for display, `"N/A"` when not applicable
    pub fn r_squared_label(&self) -> String {
        match self.r_squared {
            Some(r2) => format!("{:.4}", r2),
            None => "N/A".to_string(),
        }
    }
}

/// Whether a trend could be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendStatus {
    Available,
    InsufficientData,
}

impl TrendStatus {
    pub fn of(result: &Option<RegressionResult>) -> Self {
        match result {
            Some(_) => TrendStatus::Available,
            None => TrendStatus::InsufficientData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equation_formatting() {
        let result = RegressionResult {
            slope: -7.0,
            intercept: 15.0,
            r_squared: Some(1.0),
            predicted_next: 1.0,
            point_count: 2,
        };
        assert_eq!(result.equation(), "y = -7.00x + 15.00");
        assert_eq!(result.fitted_values(), vec![15.0, 8.0]);
        assert_eq!(result.r_squared_label(), "1.0000");
    }

    #[test]
    fn test_negative_intercept_and_missing_r2() {
        let result = RegressionResult {
            slope: 2.5,
            intercept: -1.25,
            r_squared: None,
            predicted_next: 6.25,
            point_count: 3,
        };
        assert_eq!(result.equation(), "y = 2.50x - 1.25");
        assert_eq!(result.r_squared_label(), "N/A");
        assert_eq!(result.predicted_next_rounded(), 6);
    }
}
