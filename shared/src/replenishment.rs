//! Reorder arithmetic
//!
//! The projection procedure in the store is authoritative. These formulas
//! reproduce its published fields so that rows with missing values can be
//! completed and every row can be held to the same invariants:
//!
//! * `lead_time_consumption = monthly_average * lead_time_months`
//! * `residual_stock = max(0, current_stock - lead_time_consumption)`
//! * `cycle_demand = monthly_average * cycle_months`
//! * `suggested_quantity = ceil(max(0, cycle_demand - residual_stock) * safety_factor)`
//! * `estimated_cost = suggested_quantity * unit_cost`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::ProjectionParameters;

/// Per-item inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReorderInputs {
    pub current_stock: Decimal,
    pub monthly_average: Decimal,
    pub unit_cost: Decimal,
}

/// Derived reorder figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReorderFigures {
    pub lead_time_consumption: Decimal,
    pub residual_stock: Decimal,
    pub cycle_demand: Decimal,
    pub suggested_quantity: Decimal,
    pub estimated_cost: Decimal,
}

pub fn lead_time_consumption(monthly_average: Decimal, lead_time_months: u32) -> Decimal {
    monthly_average * Decimal::from(lead_time_months)
}

/// Stock left when the order arrives, never negative
pub fn residual_stock(current_stock: Decimal, lead_time_consumption: Decimal) -> Decimal {
    (current_stock - lead_time_consumption).max(Decimal::ZERO)
}

pub fn cycle_demand(monthly_average: Decimal, cycle_months: u32) -> Decimal {
    monthly_average * Decimal::from(cycle_months)
}

/// Whole units to buy, never negative
pub fn suggested_quantity(
    cycle_demand: Decimal,
    residual_stock: Decimal,
    safety_factor: Decimal,
) -> Decimal {
    let shortfall = (cycle_demand - residual_stock).max(Decimal::ZERO);
    (shortfall * safety_factor).ceil().max(Decimal::ZERO)
}

pub fn estimated_cost(suggested_quantity: Decimal, unit_cost: Decimal) -> Decimal {
    suggested_quantity * unit_cost
}

/// Run the whole formula for one item
pub fn compute(inputs: &ReorderInputs, params: &ProjectionParameters) -> ReorderFigures {
    let lead = lead_time_consumption(inputs.monthly_average, params.lead_time_months);
    let residual = residual_stock(inputs.current_stock, lead);
    let cycle = cycle_demand(inputs.monthly_average, params.cycle_months);
    let suggested = suggested_quantity(cycle, residual, params.safety_factor);

    ReorderFigures {
        lead_time_consumption: lead,
        residual_stock: residual,
        cycle_demand: cycle,
        suggested_quantity: suggested,
        estimated_cost: estimated_cost(suggested, inputs.unit_cost),
    }
}
