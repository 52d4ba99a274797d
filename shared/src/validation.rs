//! Parameter validation for the query-driven views
//!
//! Every check runs before any request reaches the store and reports the
//! offending field so the UI can attach the message to the right control.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::ProjectionParameters;
use crate::types::DateRange;

/// Longest range accepted by the consumption views
pub const MAX_RANGE_DAYS: i64 = 366 * 10;

pub const HISTORY_MONTHS_RANGE: (u32, u32) = (1, 60);
pub const LEAD_TIME_MONTHS_RANGE: (u32, u32) = (0, 24);
pub const CYCLE_MONTHS_RANGE: (u32, u32) = (1, 36);

/// A rejected input field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message_en}")]
pub struct FieldError {
    pub field: &'static str,
    pub message_en: String,
    pub message_es: String,
}

impl FieldError {
    pub fn new(
        field: &'static str,
        message_en: impl Into<String>,
        message_es: impl Into<String>,
    ) -> Self {
        Self {
            field,
            message_en: message_en.into(),
            message_es: message_es.into(),
        }
    }
}

// ============================================================================
// Consumption views
// ============================================================================

/// Both ends present, start not after end, span within limits
pub fn validate_date_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<DateRange, FieldError> {
    let start = start.ok_or_else(|| {
        FieldError::new("start", "Start date is required", "La fecha inicial es obligatoria")
    })?;
    let end = end.ok_or_else(|| {
        FieldError::new("end", "End date is required", "La fecha final es obligatoria")
    })?;
    if start > end {
        return Err(FieldError::new(
            "end",
            "End date must not be before start date",
            "La fecha final no puede ser anterior a la fecha inicial",
        ));
    }

    let range = DateRange::new(start, end);
    if range.days() > MAX_RANGE_DAYS {
        return Err(FieldError::new(
            "start",
            format!("Date range must not exceed {} days", MAX_RANGE_DAYS),
            format!("El rango de fechas no puede superar {} días", MAX_RANGE_DAYS),
        ));
    }
    Ok(range)
}

/// Article codes: non-empty, at most 50 chars, no characters that would break
/// a store filter
pub fn validate_item_code(code: &str) -> Result<String, FieldError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(FieldError::new(
            "item_code",
            "An article must be selected",
            "Debe seleccionar un artículo",
        ));
    }
    if code.len() > 50 {
        return Err(FieldError::new(
            "item_code",
            "Article code is too long",
            "El código de artículo es demasiado largo",
        ));
    }
    if code.chars().any(|c| matches!(c, ',' | '(' | ')' | '"' | '\\') || c.is_control()) {
        return Err(FieldError::new(
            "item_code",
            "Article code contains invalid characters",
            "El código de artículo contiene caracteres no válidos",
        ));
    }
    Ok(code.to_string())
}

// ============================================================================
// Purchase projection
// ============================================================================

fn check_months(field: &'static str, value: u32, (min, max): (u32, u32)) -> Result<(), FieldError> {
    if value < min || value > max {
        return Err(FieldError::new(
            field,
            format!("Must be between {} and {} months", min, max),
            format!("Debe estar entre {} y {} meses", min, max),
        ));
    }
    Ok(())
}

pub fn validate_projection_parameters(params: &ProjectionParameters) -> Result<(), FieldError> {
    check_months("history_months", params.history_months, HISTORY_MONTHS_RANGE)?;
    check_months("lead_time_months", params.lead_time_months, LEAD_TIME_MONTHS_RANGE)?;
    check_months("cycle_months", params.cycle_months, CYCLE_MONTHS_RANGE)?;

    if params.safety_factor < Decimal::ONE || params.safety_factor > Decimal::from(3) {
        return Err(FieldError::new(
            "safety_factor",
            "Safety factor must be between 1.0 and 3.0",
            "El factor de seguridad debe estar entre 1.0 y 3.0",
        ));
    }
    Ok(())
}
