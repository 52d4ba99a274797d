//! Purchase projection models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::keys::deserialize_key;

/// Tunable inputs of the purchase projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectionParameters {
    /// Look-back window used for the monthly average
    pub history_months: u32,
    /// Expected supplier delay
    pub lead_time_months: u32,
    /// Months of consumption one purchase should cover
    pub cycle_months: u32,
    /// Multiplier applied to the suggested quantity (1.0 = no buffer)
    pub safety_factor: Decimal,
}

impl Default for ProjectionParameters {
    fn default() -> Self {
        Self {
            history_months: 12,
            lead_time_months: 2,
            cycle_months: 12,
            safety_factor: Decimal::ONE,
        }
    }
}

impl ProjectionParameters {
    /// Named arguments for the store procedure
    pub fn to_procedure_args(&self) -> serde_json::Value {
        serde_json::json!({
            "p_meses_historial": self.history_months,
            "p_meses_entrega": self.lead_time_months,
            "p_meses_ciclo": self.cycle_months,
            "p_factor_seguridad": self.safety_factor.to_string(),
        })
    }
}

/// Raw row returned by the projection procedure.
///
/// Every numeric field is optional: the procedure is authoritative for the
/// values it returns, and anything missing is derived locally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectionRecord {
    #[serde(deserialize_with = "deserialize_key")]
    pub codigo: String,
    #[serde(default)]
    pub stock_actual: Option<Decimal>,
    #[serde(default)]
    pub promedio_mensual: Option<Decimal>,
    #[serde(default)]
    pub consumo_entrega: Option<Decimal>,
    #[serde(default)]
    pub stock_residual: Option<Decimal>,
    #[serde(default)]
    pub demanda_ciclo: Option<Decimal>,
    #[serde(default)]
    pub cantidad_sugerida: Option<Decimal>,
    #[serde(default)]
    pub costo_unitario: Option<Decimal>,
    #[serde(default)]
    pub costo_estimado: Option<Decimal>,
    #[serde(default)]
    pub categoria_gasto_id: Option<i64>,
    #[serde(default)]
    pub instalacion_id: Option<i64>,
}

/// One projected purchase line, one per distinct article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub item_code: String,
    pub item_name: String,
    pub unit: Option<String>,
    pub current_stock: Decimal,
    pub monthly_average: Decimal,
    pub lead_time_consumption: Decimal,
    pub residual_stock: Decimal,
    pub cycle_demand: Decimal,
    /// Never negative
    pub suggested_quantity: Decimal,
    pub unit_cost: Decimal,
    /// Always `suggested_quantity * unit_cost`
    pub estimated_cost: Decimal,
    pub expense_category_id: Option<i64>,
    pub expense_category: String,
    pub installation: String,
}

impl ProjectionRow {
    pub fn needs_purchase(&self) -> bool {
        self.suggested_quantity > Decimal::ZERO
    }
}

/// Estimated spend for one expense category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub expense_category: String,
    pub item_count: usize,
    pub estimated_cost: Decimal,
}

/// Aggregate figures over a projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionTotals {
    pub item_count: usize,
    pub items_to_purchase: usize,
    pub total_estimated_cost: Decimal,
    pub by_category: Vec<CategoryTotal>,
}

impl ProjectionTotals {
    /// Sum rows; categories are sorted by label so the output is stable
    pub fn from_rows(rows: &[ProjectionRow]) -> Self {
        let mut by_category: std::collections::BTreeMap<&str, (usize, Decimal)> =
            std::collections::BTreeMap::new();
        for row in rows.iter().filter(|r| r.needs_purchase()) {
            let entry = by_category
                .entry(row.expense_category.as_str())
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += row.estimated_cost;
        }

        Self {
            item_count: rows.len(),
            items_to_purchase: rows.iter().filter(|r| r.needs_purchase()).count(),
            total_estimated_cost: rows.iter().map(|r| r.estimated_cost).sum(),
            by_category: by_category
                .into_iter()
                .map(|(label, (count, cost))| CategoryTotal {
                    expense_category: label.to_string(),
                    item_count: count,
                    estimated_cost: cost,
                })
                .collect(),
        }
    }
}
