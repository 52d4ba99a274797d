//! Item history handler

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use shared::QueryState;

use super::{language, parse_param, view_session};
use crate::error::AppResult;
use crate::services::item_history::{ItemHistoryParams, ItemHistoryReport};
use crate::services::{ItemHistoryService, ViewKind};
use crate::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub gap_fill: Option<String>,
    pub lang: Option<String>,
}

/// Monthly consumption history of one article
pub async fn get_item_history(
    State(state): State<AppState>,
    Path(codigo): Path<String>,
    Query(query): Query<HistoryQuery>,
    headers: HeaderMap,
) -> AppResult<Json<QueryState<ItemHistoryReport>>> {
    let params = ItemHistoryParams {
        item_code: codigo,
        start: parse_param("start", query.start.as_deref())?,
        end: parse_param("end", query.end.as_deref())?,
        gap_fill: parse_param("gap_fill", query.gap_fill.as_deref())?.unwrap_or(false),
        language: language(query.lang.as_deref(), &state),
    };

    let session = view_session(&headers);
    let view = state
        .views
        .controller(session.as_deref(), ViewKind::ItemHistory)
        .await;
    let ticket = view.begin();

    let service = ItemHistoryService::new(state.store.clone(), &state.config);
    let result = view
        .run(&ticket, service.history(params), |report| report.is_empty())
        .await?;
    Ok(Json(result))
}
