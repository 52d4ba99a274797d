//! Purchase projection handler

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::validation::validate_projection_parameters;
use shared::{FieldError, ProjectionParameters, QueryState};

use super::{language, parse_param, view_session};
use crate::error::AppResult;
use crate::services::projection::ProjectionReport;
use crate::services::{ProjectionService, ViewKind};
use crate::AppState;

#[derive(Deserialize)]
pub struct ProjectionQuery {
    pub history_months: Option<String>,
    pub lead_time_months: Option<String>,
    pub cycle_months: Option<String>,
    pub safety_factor: Option<String>,
    pub lang: Option<String>,
}

impl ProjectionQuery {
    /// Missing parameters take their defaults
    fn parameters(&self) -> Result<ProjectionParameters, FieldError> {
        let defaults = ProjectionParameters::default();
        Ok(ProjectionParameters {
            history_months: parse_param("history_months", self.history_months.as_deref())?
                .unwrap_or(defaults.history_months),
            lead_time_months: parse_param("lead_time_months", self.lead_time_months.as_deref())?
                .unwrap_or(defaults.lead_time_months),
            cycle_months: parse_param("cycle_months", self.cycle_months.as_deref())?
                .unwrap_or(defaults.cycle_months),
            safety_factor: parse_param::<Decimal>("safety_factor", self.safety_factor.as_deref())?
                .unwrap_or(defaults.safety_factor),
        })
    }
}

/// Suggested purchases for the configured horizon.
///
/// Parameter changes are debounced per view session so that only the last
/// of a burst of requests reaches the store.
pub async fn get_purchase_projection(
    State(state): State<AppState>,
    Query(query): Query<ProjectionQuery>,
    headers: HeaderMap,
) -> AppResult<Json<QueryState<ProjectionReport>>> {
    let params = query.parameters()?;
    validate_projection_parameters(&params)?;
    let language = language(query.lang.as_deref(), &state);

    let session = view_session(&headers);
    let view = state
        .views
        .controller(session.as_deref(), ViewKind::PurchaseProjection)
        .await;
    let ticket = view.begin();
    view.debounce(&ticket).await?;

    let service = ProjectionService::new(state.store.clone(), &state.config);
    let result = view
        .run(&ticket, service.project(params, language), |report| {
            report.is_empty()
        })
        .await?;
    Ok(Json(result))
}
