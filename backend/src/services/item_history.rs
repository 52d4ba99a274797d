//! Consumption history of a single article
//!
//! Drains every issuance line of the article in the date range, joins the
//! issuance headers, requesters and installations, buckets the quantities by
//! month and fits a trend over the buckets.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::aggregation::{
    aggregate_monthly, day_label, distinct_event_count, fill_month_gaps, monthly_average,
};
use shared::validation::{validate_date_range, validate_item_code};
use shared::{
    trend, Articulo, ConsumptionEvent, Instalacion, Language, MonthlyBucket, Personal,
    QueryDescriptor, ReferenceEntity, RegressionResult, SalidaHeader, SalidaLineRow, TrendStatus,
    NOT_AVAILABLE_LABEL, UNIDENTIFIED_LABEL,
};

use super::key_batch::{key_set, KeyBatchResolver, Lookup};
use super::paged_fetcher::PagedFetcher;
use crate::config::{CollectionsConfig, Config};
use crate::error::AppResult;
use crate::external::BackingStore;

pub const LINE_COLUMNS: &str = "id,numero_solicitud,codigo_articulo,cantidad,fecha";

/// Input of one history query
#[derive(Debug, Clone)]
pub struct ItemHistoryParams {
    pub item_code: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub gap_fill: bool,
    pub language: Language,
}

/// One issuance line of the article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub date_label: String,
    pub document: i64,
    pub quantity: Decimal,
    pub requester: String,
    pub installation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemHistoryReport {
    pub item_code: String,
    pub item_name: String,
    pub unit: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub entries: Vec<HistoryEntry>,
    pub buckets: Vec<MonthlyBucket>,
    pub trend: Option<RegressionResult>,
    pub trend_status: TrendStatus,
    pub trend_line: Vec<f64>,
    pub total_quantity: Decimal,
    pub document_count: usize,
    pub monthly_average: Decimal,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

impl ItemHistoryReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Item history service
#[derive(Clone)]
pub struct ItemHistoryService {
    fetcher: PagedFetcher,
    resolver: KeyBatchResolver,
    collections: CollectionsConfig,
}

impl ItemHistoryService {
    pub fn new(store: Arc<dyn BackingStore>, config: &Config) -> Self {
        let fetcher = PagedFetcher::from_config(store, &config.store);
        Self {
            resolver: KeyBatchResolver::from_config(fetcher.clone(), &config.store),
            fetcher,
            collections: config.collections.clone(),
        }
    }

    pub async fn history(&self, params: ItemHistoryParams) -> AppResult<ItemHistoryReport> {
        let item_code = validate_item_code(&params.item_code)?;
        let range = validate_date_range(params.start, params.end)?;
        let language = params.language;

        tracing::info!(
            item = %item_code,
            start = %range.start,
            end = %range.end,
            "Loading item history"
        );

        let query = QueryDescriptor::table(&self.collections.issue_lines)
            .select(LINE_COLUMNS)
            .eq("codigo_articulo", &item_code)
            .gte("fecha", range.start)
            .lte("fecha", range.end)
            .order_by("fecha")
            .order_by("id")
            .with_exact_count();
        let drained = self.fetcher.drain::<SalidaLineRow>(&query).await?;

        let mut warnings = Vec::new();
        if let Some(warning) = drained.truncation_warning(language) {
            warnings.push(warning);
        }
        let truncated = drained.truncated;
        let events = to_events(drained.rows);

        // Headers first: requesters and installations hang off them
        let headers: HashMap<String, SalidaHeader> = self
            .resolver
            .resolve(
                &Lookup::new(&self.collections.issue_headers, "numero_solicitud"),
                &key_set(events.iter().map(|e| e.event_id)),
            )
            .await;

        let requester_keys = key_set(headers.values().filter_map(|h| h.identificacion.clone()));
        let installation_keys = key_set(headers.values().filter_map(|h| h.instalacion_id));
        let item_keys = key_set([item_code.clone()]);

        let personnel_lookup = Lookup::new(&self.collections.personnel, "identificacion");
        let installation_lookup = Lookup::new(&self.collections.installations, "id");
        let article_lookup = Lookup::new(&self.collections.articles, "codigo");
        let (requesters, installations, articles) = tokio::join!(
            self.resolver.resolve::<Personal>(&personnel_lookup, &requester_keys),
            self.resolver.resolve::<Instalacion>(&installation_lookup, &installation_keys),
            self.resolver.resolve::<Articulo>(&article_lookup, &item_keys),
        );

        let entries = events
            .iter()
            .map(|event| {
                let header = headers.get(&event.event_id.to_string());
                HistoryEntry {
                    date: event.occurred_on,
                    date_label: day_label(event.occurred_on, language),
                    document: event.event_id,
                    quantity: event.quantity,
                    requester: requester_label(header, &requesters),
                    installation: installation_label(header, &installations),
                }
            })
            .collect();

        let mut buckets = aggregate_monthly(&events, language);
        if params.gap_fill {
            buckets = fill_month_gaps(&buckets, language);
        }
        let trend = trend::fit(&buckets);
        let trend_line = trend.map(|t| t.fitted_values()).unwrap_or_default();
        let total_quantity: Decimal = events.iter().map(|e| e.quantity).sum();

        let article = articles.get(&item_code);
        let report = ItemHistoryReport {
            item_name: article
                .map(|a| a.display_label())
                .unwrap_or_else(|| NOT_AVAILABLE_LABEL.to_string()),
            unit: article.and_then(|a| a.unidad.clone()),
            item_code,
            start: range.start,
            end: range.end,
            entries,
            trend_status: TrendStatus::of(&trend),
            trend,
            trend_line,
            total_quantity,
            document_count: distinct_event_count(&events),
            monthly_average: monthly_average(total_quantity, range.start, range.end),
            buckets,
            truncated,
            warnings,
        };

        tracing::info!(
            item = %report.item_code,
            lines = report.entries.len(),
            buckets = report.buckets.len(),
            truncated = report.truncated,
            "Item history ready"
        );

        Ok(report)
    }
}

/// Type the drained lines, logging quantities that had to be clamped
pub fn to_events(rows: Vec<SalidaLineRow>) -> Vec<ConsumptionEvent> {
    rows.into_iter()
        .map(|row| {
            if row.cantidad.map_or(false, |q| q < Decimal::ZERO) {
                tracing::warn!(
                    document = row.numero_solicitud,
                    item = %row.codigo_articulo,
                    "Negative quantity clamped to zero"
                );
            }
            ConsumptionEvent::from(row)
        })
        .collect()
}

pub fn requester_label(
    header: Option<&SalidaHeader>,
    requesters: &HashMap<String, Personal>,
) -> String {
    header
        .and_then(|h| h.identificacion.as_ref())
        .and_then(|id| requesters.get(id))
        .map(|p| p.display_label())
        .unwrap_or_else(|| UNIDENTIFIED_LABEL.to_string())
}

pub fn installation_label(
    header: Option<&SalidaHeader>,
    installations: &HashMap<String, Instalacion>,
) -> String {
    header
        .and_then(|h| h.instalacion_id)
        .and_then(|id| installations.get(&id.to_string()))
        .map(|i| i.display_label())
        .unwrap_or_else(|| NOT_AVAILABLE_LABEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(identificacion: Option<&str>, instalacion_id: Option<i64>) -> SalidaHeader {
        SalidaHeader {
            numero_solicitud: 1,
            fecha: None,
            identificacion: identificacion.map(String::from),
            instalacion_id,
            observaciones: None,
        }
    }

    #[test]
    fn test_labels_fall_back() {
        let requesters = HashMap::new();
        let installations = HashMap::new();

        assert_eq!(requester_label(None, &requesters), UNIDENTIFIED_LABEL);
        let h = header(Some("77"), Some(4));
        assert_eq!(requester_label(Some(&h), &requesters), UNIDENTIFIED_LABEL);
        assert_eq!(installation_label(Some(&h), &installations), NOT_AVAILABLE_LABEL);
    }

    #[test]
    fn test_labels_resolve() {
        let mut requesters = HashMap::new();
        requesters.insert(
            "77".to_string(),
            Personal {
                identificacion: "77".to_string(),
                nombre: "Luis".to_string(),
                apellido: Some("Paz".to_string()),
                cargo: None,
            },
        );
        let h = header(Some("77"), None);
        assert_eq!(requester_label(Some(&h), &requesters), "Luis Paz");
    }
}
