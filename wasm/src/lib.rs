//! WebAssembly module for the warehouse analytics engine
//!
//! Provides client-side computation for:
//! - Monthly bucketing of consumption events
//! - Trend fitting and the chart trend line
//! - Suggested purchase quantities
//! - Projection parameter validation before a query is sent

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use shared::aggregation::{aggregate_monthly, fill_month_gaps};
use shared::replenishment::{self, ReorderInputs};
use shared::validation::validate_projection_parameters;
use shared::{
    trend, ConsumptionEvent, Language, MonthlyBucket, ProjectionParameters, RegressionResult,
    TrendStatus,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::debug_1(&JsValue::from_str("almacen-wasm ready"));
}

fn to_js_error(message: String) -> JsValue {
    JsValue::from_str(&message)
}

fn aggregate(events_json: &str, lang: &str, gap_fill: bool) -> Result<String, String> {
    let events: Vec<ConsumptionEvent> =
        serde_json::from_str(events_json).map_err(|e| format!("Invalid events JSON: {}", e))?;
    let language = Language::from_code(lang);

    let mut buckets = aggregate_monthly(&events, language);
    if gap_fill {
        buckets = fill_month_gaps(&buckets, language);
    }
    serde_json::to_string(&buckets).map_err(|e| e.to_string())
}

/// Bucket consumption events by month
#[wasm_bindgen]
pub fn aggregate_monthly_json(
    events_json: &str,
    lang: &str,
    gap_fill: bool,
) -> Result<String, JsValue> {
    aggregate(events_json, lang, gap_fill).map_err(to_js_error)
}

#[derive(Serialize)]
struct TrendSummary {
    trend: Option<RegressionResult>,
    trend_status: TrendStatus,
    equation: Option<String>,
    r_squared_label: Option<String>,
    predicted_next_rounded: Option<i64>,
}

fn parse_buckets(buckets_json: &str) -> Result<Vec<MonthlyBucket>, String> {
    serde_json::from_str(buckets_json).map_err(|e| format!("Invalid buckets JSON: {}", e))
}

fn summarize_trend(buckets_json: &str) -> Result<String, String> {
    let fitted = trend::fit(&parse_buckets(buckets_json)?);
    let summary = TrendSummary {
        trend: fitted,
        trend_status: TrendStatus::of(&fitted),
        equation: fitted.map(|t| t.equation()),
        r_squared_label: fitted.map(|t| t.r_squared_label()),
        predicted_next_rounded: fitted.map(|t| t.predicted_next_rounded()),
    };
    serde_json::to_string(&summary).map_err(|e| e.to_string())
}

/// Fit a linear trend over ordered monthly buckets
#[wasm_bindgen]
pub fn fit_trend_json(buckets_json: &str) -> Result<String, JsValue> {
    summarize_trend(buckets_json).map_err(to_js_error)
}

fn trend_line(buckets_json: &str) -> Result<String, String> {
    let line = trend::fit(&parse_buckets(buckets_json)?)
        .map(|t| t.fitted_values())
        .unwrap_or_default();
    serde_json::to_string(&line).map_err(|e| e.to_string())
}

/// Fitted values over the observed bucket indices, `[]` without a trend
#[wasm_bindgen]
pub fn trend_line_json(buckets_json: &str) -> Result<String, JsValue> {
    trend_line(buckets_json).map_err(to_js_error)
}

/// Suggested purchase quantity for one item, previewed while editing parameters
#[wasm_bindgen]
pub fn suggest_purchase_quantity(
    current_stock: f64,
    monthly_average: f64,
    lead_time_months: u32,
    cycle_months: u32,
    safety_factor: f64,
) -> f64 {
    let decimal = |value: f64| value.to_string().parse().unwrap_or(Decimal::ZERO);
    let params = ProjectionParameters {
        lead_time_months,
        cycle_months,
        safety_factor: decimal(safety_factor),
        ..ProjectionParameters::default()
    };
    let inputs = ReorderInputs {
        current_stock: decimal(current_stock),
        monthly_average: decimal(monthly_average),
        unit_cost: Decimal::ZERO,
    };
    replenishment::compute(&inputs, &params)
        .suggested_quantity
        .to_f64()
        .unwrap_or(0.0)
}

#[derive(Serialize)]
struct ValidationOutcome {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_es: Option<String>,
}

fn validate_parameters(params_json: &str) -> ValidationOutcome {
    let params: ProjectionParameters = match serde_json::from_str(params_json) {
        Ok(params) => params,
        Err(e) => {
            return ValidationOutcome {
                valid: false,
                field: None,
                message_en: Some(format!("Invalid parameters JSON: {}", e)),
                message_es: Some(format!("JSON de parámetros no válido: {}", e)),
            }
        }
    };
    match validate_projection_parameters(&params) {
        Ok(()) => ValidationOutcome {
            valid: true,
            field: None,
            message_en: None,
            message_es: None,
        },
        Err(err) => ValidationOutcome {
            valid: false,
            field: Some(err.field.to_string()),
            message_en: Some(err.message_en),
            message_es: Some(err.message_es),
        },
    }
}

/// Validate projection parameters, returning `{"valid": bool, ...}` JSON
#[wasm_bindgen]
pub fn validate_projection_parameters_json(params_json: &str) -> String {
    serde_json::to_string(&validate_parameters(params_json))
        .unwrap_or_else(|_| r#"{"valid":false}"#.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENTS: &str = r#"[
        {"event_id": 1, "occurred_on": "2025-01-05", "quantity": "10", "item_code": "A"},
        {"event_id": 2, "occurred_on": "2025-01-20", "quantity": "5", "item_code": "A"},
        {"event_id": 3, "occurred_on": "2025-02-02", "quantity": "8", "item_code": "A"}
    ]"#;

    #[test]
    fn test_aggregate_monthly_json() {
        let json = aggregate(EVENTS, "es", false).unwrap();
        let buckets: Vec<MonthlyBucket> = serde_json::from_str(&json).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].period_key, "2025-01");
        assert_eq!(buckets[0].total_quantity, Decimal::from(15));
        assert_eq!(buckets[1].label, "feb 2025");
    }

    #[test]
    fn test_fit_trend_json() {
        let buckets = aggregate(EVENTS, "en", false).unwrap();
        let summary: serde_json::Value =
            serde_json::from_str(&summarize_trend(&buckets).unwrap()).unwrap();
        assert_eq!(summary["trend_status"], "available");
        assert_eq!(summary["equation"], "y = -7.00x + 15.00");
        assert_eq!(summary["predicted_next_rounded"], 1);

        let line: Vec<f64> = serde_json::from_str(&trend_line(&buckets).unwrap()).unwrap();
        assert_eq!(line.len(), 2);
        assert!((line[1] - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_insufficient_data() {
        let summary: serde_json::Value =
            serde_json::from_str(&summarize_trend("[]").unwrap()).unwrap();
        assert_eq!(summary["trend_status"], "insufficient_data");
        assert!(summary["trend"].is_null());
        assert_eq!(trend_line("[]").unwrap(), "[]");
    }

    #[test]
    fn test_suggest_purchase_quantity() {
        assert_eq!(suggest_purchase_quantity(5.0, 10.0, 2, 12, 1.1), 132.0);
        assert_eq!(suggest_purchase_quantity(500.0, 10.0, 1, 6, 1.0), 0.0);
    }

    #[test]
    fn test_validate_projection_parameters_json() {
        let ok = validate_projection_parameters_json(
            r#"{"history_months":12,"lead_time_months":2,"cycle_months":12,"safety_factor":"1.2"}"#,
        );
        assert_eq!(ok, r#"{"valid":true}"#);

        let bad: serde_json::Value = serde_json::from_str(&validate_projection_parameters_json(
            r#"{"history_months":12,"lead_time_months":2,"cycle_months":12,"safety_factor":"4"}"#,
        ))
        .unwrap();
        assert_eq!(bad["valid"], false);
        assert_eq!(bad["field"], "safety_factor");
    }
}
