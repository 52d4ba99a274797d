//! Issuance summary handler

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use shared::QueryState;

use super::{language, parse_param, view_session};
use crate::error::AppResult;
use crate::services::salidas_summary::{SummaryParams, SummaryReport};
use crate::services::{SalidasSummaryService, ViewKind};
use crate::AppState;

#[derive(Deserialize)]
pub struct SummaryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub instalacion_id: Option<String>,
    pub identificacion: Option<String>,
    pub lang: Option<String>,
}

/// Issuances in a date range grouped by document, article and day
pub async fn get_issue_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
    headers: HeaderMap,
) -> AppResult<Json<QueryState<SummaryReport>>> {
    let params = SummaryParams {
        start: parse_param("start", query.start.as_deref())?,
        end: parse_param("end", query.end.as_deref())?,
        installation_id: parse_param("instalacion_id", query.instalacion_id.as_deref())?,
        requester_id: query.identificacion.clone(),
        language: language(query.lang.as_deref(), &state),
    };

    let session = view_session(&headers);
    let view = state
        .views
        .controller(session.as_deref(), ViewKind::IssueSummary)
        .await;
    let ticket = view.begin();

    let service = SalidasSummaryService::new(state.store.clone(), &state.config);
    let result = view
        .run(&ticket, service.summary(params), |report| report.is_empty())
        .await?;
    Ok(Json(result))
}
