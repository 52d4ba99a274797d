//! Aggregation and trend tests
//!
//! Tests for the consumption analytics including:
//! - Monthly buckets are ordered with exact sums
//! - Trend absent below two buckets
//! - Constant series has no coefficient of determination
//! - The projected point lies on the fitted line

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::aggregation::{aggregate_monthly, fill_month_gaps};
use shared::{trend, ConsumptionEvent, Language, MonthlyBucket};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn event(id: i64, date: &str, qty: &str) -> ConsumptionEvent {
    ConsumptionEvent::new(
        id,
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        dec(qty),
        "ART-1",
    )
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test the reference three-event scenario end to end
    #[test]
    fn test_reference_scenario() {
        let events = vec![
            event(1, "2025-01-05", "10"),
            event(2, "2025-01-20", "5"),
            event(3, "2025-02-02", "8"),
        ];
        let buckets = aggregate_monthly(&events, Language::Spanish);
        let summary: Vec<(&str, Decimal)> = buckets
            .iter()
            .map(|b| (b.period_key.as_str(), b.total_quantity))
            .collect();
        assert_eq!(summary, vec![("2025-01", dec("15")), ("2025-02", dec("8"))]);

        let fit = trend::fit(&buckets).unwrap();
        assert!((fit.slope + 7.0).abs() < 1e-9);
        assert!((fit.intercept - 15.0).abs() < 1e-9);
        assert!((fit.predicted_next - 1.0).abs() < 1e-9);
    }

    /// Test decimal quantities are summed exactly
    #[test]
    fn test_decimal_sums_exact() {
        let events = vec![
            event(1, "2025-03-01", "0.1"),
            event(2, "2025-03-02", "0.2"),
        ];
        let buckets = aggregate_monthly(&events, Language::English);
        assert_eq!(buckets[0].total_quantity, dec("0.3"));
        assert_eq!(buckets[0].label, "Mar 2025");
    }

    /// Test gap filling changes the trend input
    #[test]
    fn test_gap_filled_trend() {
        let events = vec![event(1, "2025-01-10", "10"), event(2, "2025-03-10", "10")];
        let sparse = aggregate_monthly(&events, Language::Spanish);
        let filled = fill_month_gaps(&sparse, Language::Spanish);

        let sparse_fit = trend::fit(&sparse).unwrap();
        let filled_fit = trend::fit(&filled).unwrap();
        assert_eq!(sparse_fit.point_count, 2);
        assert!(sparse_fit.r_squared.is_none());
        assert_eq!(filled_fit.point_count, 3);
        assert_eq!(filled_fit.r_squared, Some(0.0));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn arb_event() -> impl Strategy<Value = ConsumptionEvent> {
    (2020i32..2027, 1u32..=12, 1u32..=28, 0i64..100_000, 1i64..500).prop_map(
        |(year, month, day, cents, id)| {
            ConsumptionEvent::new(
                id,
                NaiveDate::from_ymd_opt(year, month, day).unwrap(),
                Decimal::new(cents, 2),
                "ART-1",
            )
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Bucket keys strictly increase and each total equals its events' sum
    #[test]
    fn prop_buckets_ordered_with_exact_sums(events in prop::collection::vec(arb_event(), 0..200)) {
        let buckets = aggregate_monthly(&events, Language::Spanish);

        for pair in buckets.windows(2) {
            prop_assert!(pair[0].period_key < pair[1].period_key);
        }

        let mut expected: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
        for e in &events {
            let entry = expected.entry(e.month_key()).or_insert((Decimal::ZERO, 0));
            entry.0 += e.quantity;
            entry.1 += 1;
        }
        prop_assert_eq!(buckets.len(), expected.len());
        for bucket in &buckets {
            let (total, count) = expected[&bucket.period_key];
            prop_assert_eq!(bucket.total_quantity, total);
            prop_assert_eq!(bucket.event_count, count);
        }
    }

    /// Gap filling keeps every observed bucket and leaves no missing month
    #[test]
    fn prop_gap_fill_is_contiguous(events in prop::collection::vec(arb_event(), 1..50)) {
        let buckets = aggregate_monthly(&events, Language::Spanish);
        let filled = fill_month_gaps(&buckets, Language::Spanish);

        let observed_total: Decimal = buckets.iter().map(|b| b.total_quantity).sum();
        let filled_total: Decimal = filled.iter().map(|b| b.total_quantity).sum();
        prop_assert_eq!(observed_total, filled_total);
        prop_assert!(filled.len() >= buckets.len());
        prop_assert_eq!(&filled.first().unwrap().period_key, &buckets.first().unwrap().period_key);
        prop_assert_eq!(&filled.last().unwrap().period_key, &buckets.last().unwrap().period_key);
    }

    /// Fewer than two points never produce a trend
    #[test]
    fn prop_no_trend_below_two_points(values in prop::collection::vec(-1000.0f64..1000.0, 0..2)) {
        prop_assert!(trend::fit_points(&values).is_none());
    }

    /// A constant series has slope zero and no r squared
    #[test]
    fn prop_constant_series(value in 0i64..10_000, n in 2usize..40) {
        let values = vec![value as f64; n];
        let fit = trend::fit_points(&values).unwrap();
        prop_assert!(fit.r_squared.is_none());
        prop_assert!(fit.slope.abs() < 1e-6);
    }

    /// A constant fractional quantity over monthly buckets has no r squared
    #[test]
    fn prop_constant_fractional_buckets(cents in 1i64..1_000_000, n in 2usize..40) {
        let quantity = Decimal::new(cents, 2);
        let buckets: Vec<MonthlyBucket> = (0..n)
            .map(|i| MonthlyBucket {
                period_key: format!("{:04}-{:02}", 2000 + i / 12, i % 12 + 1),
                label: String::new(),
                total_quantity: quantity,
                event_count: 1,
            })
            .collect();

        let fit = trend::fit(&buckets).unwrap();
        prop_assert!(fit.r_squared.is_none());
        prop_assert_eq!(fit.slope, 0.0);
        prop_assert_eq!(fit.point_count, n);
    }

    /// Appending the projected point and refitting leaves the line unchanged
    #[test]
    fn prop_refit_with_prediction_is_stable(values in prop::collection::vec(0i64..10_000, 2..40)) {
        let values: Vec<f64> = values.into_iter().map(|v| v as f64).collect();
        let fit = trend::fit_points(&values).unwrap();

        let mut extended = values.clone();
        extended.push(fit.predicted_next);
        let refit = trend::fit_points(&extended).unwrap();

        let tolerance = 1e-6 * (1.0 + fit.intercept.abs() + fit.slope.abs());
        prop_assert!((refit.slope - fit.slope).abs() < tolerance);
        prop_assert!((refit.intercept - fit.intercept).abs() < tolerance);
    }

    /// R squared stays within [0, 1] when defined
    #[test]
    fn prop_r_squared_bounded(values in prop::collection::vec(0i64..10_000, 2..40)) {
        let values: Vec<f64> = values.into_iter().map(|v| v as f64).collect();
        if let Some(r2) = trend::fit_points(&values).unwrap().r_squared {
            prop_assert!(r2 >= -1e-9 && r2 <= 1.0 + 1e-9);
        }
    }
}
