//! Consumption (salida) models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::keys::deserialize_key;

/// One issuance line as stored in the `detalle_salidas` table.
///
/// Fields the store may omit are defaulted here, at the boundary, so that the
/// rest of the pipeline only sees typed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalidaLineRow {
    #[serde(default)]
    pub id: i64,
    pub numero_solicitud: i64,
    #[serde(deserialize_with = "deserialize_key")]
    pub codigo_articulo: String,
    #[serde(default)]
    pub cantidad: Option<Decimal>,
    pub fecha: NaiveDate,
}

/// A dated, quantified consumption of one article.
///
/// Several events share an `event_id` when a single issuance document has
/// more than one line; document-level figures must be counted once per id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumptionEvent {
    pub event_id: i64,
    pub occurred_on: NaiveDate,
    pub quantity: Decimal,
    pub item_code: String,
}

impl ConsumptionEvent {
    pub fn new(
        event_id: i64,
        occurred_on: NaiveDate,
        quantity: Decimal,
        item_code: impl Into<String>,
    ) -> Self {
        Self {
            event_id,
            occurred_on,
            quantity,
            item_code: item_code.into(),
        }
    }

    /// Zero-padded `YYYY-MM` key
    pub fn month_key(&self) -> String {
        self.occurred_on.format("%Y-%m").to_string()
    }

    /// Zero-padded `YYYY-MM-DD` key
    pub fn day_key(&self) -> String {
        self.occurred_on.format("%Y-%m-%d").to_string()
    }
}

impl From<SalidaLineRow> for ConsumptionEvent {
    /// Missing quantities count as zero and negative ones are clamped to zero
    fn from(row: SalidaLineRow) -> Self {
        let quantity = row.cantidad.unwrap_or(Decimal::ZERO).max(Decimal::ZERO);
        Self {
            event_id: row.numero_solicitud,
            occurred_on: row.fecha,
            quantity,
            item_code: row.codigo_articulo,
        }
    }
}

/// Consumption total for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    /// `YYYY-MM`
    pub period_key: String,
    /// Localised month/year, e.g. `ene 2025`
    pub label: String,
    pub total_quantity: Decimal,
    pub event_count: usize,
}

/// Consumption total for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBucket {
    /// `YYYY-MM-DD`
    pub period_key: String,
    pub label: String,
    pub total_quantity: Decimal,
    pub event_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_conversion_defaults_quantity() {
        let row: SalidaLineRow = serde_json::from_value(serde_json::json!({
            "numero_solicitud": 42,
            "codigo_articulo": "ART-9",
            "fecha": "2025-03-04"
        }))
        .unwrap();

        let event = ConsumptionEvent::from(row);
        assert_eq!(event.event_id, 42);
        assert_eq!(event.quantity, Decimal::ZERO);
        assert_eq!(event.month_key(), "2025-03");
        assert_eq!(event.day_key(), "2025-03-04");
    }

    #[test]
    fn test_row_conversion_clamps_negative() {
        let row = SalidaLineRow {
            id: 1,
            numero_solicitud: 7,
            codigo_articulo: "ART-1".to_string(),
            cantidad: Some(Decimal::from(-3)),
            fecha: NaiveDate::from_ymd_opt(2025, 1, 9).unwrap(),
        };
        assert_eq!(ConsumptionEvent::from(row).quantity, Decimal::ZERO);
    }
}
