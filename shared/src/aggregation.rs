//! Period bucketing of consumption events
//!
//! Buckets are keyed by zero-padded `YYYY-MM` / `YYYY-MM-DD` strings and
//! emitted in ascending lexicographic order, which equals calendar order only
//! because of the zero padding. Months without events produce no bucket unless
//! [`fill_month_gaps`] is applied explicitly.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{ConsumptionEvent, DailyBucket, MonthlyBucket};
use crate::types::Language;

/// Running total for one period
#[derive(Default)]
struct PeriodTotal {
    quantity: Decimal,
    events: usize,
}

fn group_by<F>(events: &[ConsumptionEvent], key: F) -> BTreeMap<String, PeriodTotal>
where
    F: Fn(&ConsumptionEvent) -> String,
{
    let mut groups: BTreeMap<String, PeriodTotal> = BTreeMap::new();
    for event in events {
        let total = groups.entry(key(event)).or_default();
        total.quantity += event.quantity;
        total.events += 1;
    }
    groups
}

/// Localised label for a `YYYY-MM` key
pub fn month_label(period_key: &str, language: Language) -> String {
    let mut parts = period_key.splitn(2, '-');
    let year = parts.next().unwrap_or_default();
    let month = parts
        .next()
        .and_then(|m| m.parse::<u32>().ok())
        .unwrap_or(1);
    format!("{} {}", language.month_abbrev(month), year)
}

/// Localised label for a day
pub fn day_label(date: NaiveDate, language: Language) -> String {
    match language {
        Language::Spanish => date.format("%d/%m/%Y").to_string(),
        Language::English => date.format("%m/%d/%Y").to_string(),
    }
}

/// Sum quantities per calendar month
pub fn aggregate_monthly(events: &[ConsumptionEvent], language: Language) -> Vec<MonthlyBucket> {
    group_by(events, ConsumptionEvent::month_key)
        .into_iter()
        .map(|(period_key, total)| MonthlyBucket {
            label: month_label(&period_key, language),
            period_key,
            total_quantity: total.quantity,
            event_count: total.events,
        })
        .collect()
}

/// Sum quantities per day
pub fn aggregate_daily(events: &[ConsumptionEvent], language: Language) -> Vec<DailyBucket> {
    let mut labels: BTreeMap<String, NaiveDate> = BTreeMap::new();
    for event in events {
        labels.entry(event.day_key()).or_insert(event.occurred_on);
    }

    group_by(events, ConsumptionEvent::day_key)
        .into_iter()
        .map(|(period_key, total)| {
            let label = labels
                .get(&period_key)
                .map(|date| day_label(*date, language))
                .unwrap_or_else(|| period_key.clone());
            DailyBucket {
                label,
                period_key,
                total_quantity: total.quantity,
                event_count: total.events,
            }
        })
        .collect()
}

fn parse_month_key(key: &str) -> Option<(i32, u32)> {
    let (year, month) = key.split_once('-')?;
    let year = year.parse().ok()?;
    let month = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// Insert zero buckets for calendar months missing between the first and the
/// last bucket. Input must already be sorted ascending.
pub fn fill_month_gaps(buckets: &[MonthlyBucket], language: Language) -> Vec<MonthlyBucket> {
    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return Vec::new();
    };
    let (Some(mut cursor), Some(end)) = (
        parse_month_key(&first.period_key),
        parse_month_key(&last.period_key),
    ) else {
        return buckets.to_vec();
    };

    let existing: BTreeMap<&str, &MonthlyBucket> =
        buckets.iter().map(|b| (b.period_key.as_str(), b)).collect();
    let mut filled = Vec::with_capacity(buckets.len());

    while cursor <= end {
        let key = format!("{:04}-{:02}", cursor.0, cursor.1);
        match existing.get(key.as_str()) {
            Some(bucket) => filled.push((*bucket).clone()),
            None => filled.push(MonthlyBucket {
                label: month_label(&key, language),
                period_key: key,
                total_quantity: Decimal::ZERO,
                event_count: 0,
            }),
        }
        cursor = if cursor.1 == 12 {
            (cursor.0 + 1, 1)
        } else {
            (cursor.0, cursor.1 + 1)
        };
    }

    filled
}

/// Number of distinct issuance documents among the events
pub fn distinct_event_count(events: &[ConsumptionEvent]) -> usize {
    events
        .iter()
        .map(|e| e.event_id)
        .collect::<std::collections::BTreeSet<_>>()
        .len()
}

/// Average quantity per calendar month over an inclusive date range
pub fn monthly_average(total: Decimal, start: NaiveDate, end: NaiveDate) -> Decimal {
    let months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32 + 1;
    if months <= 0 {
        return Decimal::ZERO;
    }
    (total / Decimal::from(months)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, y: i32, m: u32, d: u32, qty: i64) -> ConsumptionEvent {
        ConsumptionEvent::new(
            id,
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            Decimal::from(qty),
            "ART-1",
        )
    }

    #[test]
    fn test_monthly_scenario() {
        let events = vec![
            event(1, 2025, 1, 5, 10),
            event(2, 2025, 1, 20, 5),
            event(3, 2025, 2, 2, 8),
        ];
        let buckets = aggregate_monthly(&events, Language::Spanish);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period_key, "2025-01");
        assert_eq!(buckets[0].total_quantity, Decimal::from(15));
        assert_eq!(buckets[0].event_count, 2);
        assert_eq!(buckets[0].label, "ene 2025");
        assert_eq!(buckets[1].period_key, "2025-02");
        assert_eq!(buckets[1].total_quantity, Decimal::from(8));
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let events = vec![
            event(1, 2025, 11, 1, 1),
            event(2, 2024, 3, 1, 2),
            event(3, 2025, 2, 1, 3),
        ];
        let keys: Vec<_> = aggregate_monthly(&events, Language::English)
            .into_iter()
            .map(|b| b.period_key)
            .collect();
        assert_eq!(keys, vec!["2024-03", "2025-02", "2025-11"]);
    }

    #[test]
    fn test_no_implicit_gap_filling() {
        let events = vec![event(1, 2025, 1, 1, 1), event(2, 2025, 4, 1, 1)];
        assert_eq!(aggregate_monthly(&events, Language::Spanish).len(), 2);
    }

    #[test]
    fn test_fill_month_gaps_across_year() {
        let events = vec![event(1, 2024, 11, 3, 4), event(2, 2025, 2, 1, 6)];
        let buckets = aggregate_monthly(&events, Language::Spanish);
        let filled = fill_month_gaps(&buckets, Language::Spanish);

        let keys: Vec<_> = filled.iter().map(|b| b.period_key.as_str()).collect();
        assert_eq!(keys, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
        assert_eq!(filled[1].total_quantity, Decimal::ZERO);
        assert_eq!(filled[1].label, "dic 2024");
        assert_eq!(filled[3].total_quantity, Decimal::from(6));
    }

    #[test]
    fn test_daily_buckets() {
        let events = vec![
            event(1, 2025, 1, 5, 2),
            event(1, 2025, 1, 5, 3),
            event(2, 2025, 1, 6, 1),
        ];
        let days = aggregate_daily(&events, Language::Spanish);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].period_key, "2025-01-05");
        assert_eq!(days[0].label, "05/01/2025");
        assert_eq!(days[0].total_quantity, Decimal::from(5));
        assert_eq!(distinct_event_count(&events), 2);
    }

    #[test]
    fn test_monthly_average() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        assert_eq!(monthly_average(Decimal::from(30), start, end), Decimal::from(10));
    }
}
