//! HTTP handlers

pub mod health;
pub mod history;
pub mod projection;
pub mod summary;

use std::str::FromStr;

use axum::http::HeaderMap;
use shared::{FieldError, Language};

use crate::AppState;

pub use health::health_check;
pub use history::get_item_history;
pub use projection::get_purchase_projection;
pub use summary::get_issue_summary;

/// Header identifying the client-side view instance
pub const VIEW_SESSION_HEADER: &str = "x-view-session";

pub(crate) fn view_session(headers: &HeaderMap) -> Option<String> {
    headers
        .get(VIEW_SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub(crate) fn language(raw: Option<&str>, state: &AppState) -> Language {
    raw.map(Language::from_code)
        .unwrap_or_else(|| state.config.default_language())
}

/// Parse an optional query parameter, blank counts as absent
pub(crate) fn parse_param<T: FromStr>(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, FieldError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            FieldError::new(
                field,
                format!("Invalid value '{}'", value),
                format!("Valor no válido '{}'", value),
            )
        }),
    }
}
