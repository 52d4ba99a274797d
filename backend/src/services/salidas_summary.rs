//! Issuance summary over a date range
//!
//! Groups every issuance line in the range by document, by article and by
//! day. Installation and requester filters apply to the issuance header, so
//! they are evaluated after the headers are joined.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::aggregation::aggregate_daily;
use shared::validation::validate_date_range;
use shared::{
    Articulo, DailyBucket, Instalacion, Language, Personal, QueryDescriptor, ReferenceEntity,
    SalidaHeader, SalidaLineRow, NOT_AVAILABLE_LABEL,
};

use super::item_history::{installation_label, requester_label, to_events, LINE_COLUMNS};
use super::key_batch::{key_set, KeyBatchResolver, Lookup};
use super::paged_fetcher::PagedFetcher;
use crate::config::{CollectionsConfig, Config};
use crate::error::AppResult;
use crate::external::BackingStore;

/// Input of one summary query
#[derive(Debug, Clone, Default)]
pub struct SummaryParams {
    pub start: Option<NaiveDate>,
    /// Defaults to `start`
    pub end: Option<NaiveDate>,
    pub installation_id: Option<i64>,
    pub requester_id: Option<String>,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentLine {
    pub item_code: String,
    pub item_name: String,
    pub unit: Option<String>,
    pub quantity: Decimal,
}

/// One issuance document with its lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub number: i64,
    pub date: NaiveDate,
    pub requester: String,
    pub installation: String,
    pub notes: Option<String>,
    pub total_quantity: Decimal,
    pub lines: Vec<DocumentLine>,
}

/// Consumption of one article across documents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSummary {
    pub item_code: String,
    pub item_name: String,
    pub unit: Option<String>,
    pub total_quantity: Decimal,
    pub document_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub documents: Vec<DocumentSummary>,
    pub articles: Vec<ArticleSummary>,
    pub daily: Vec<DailyBucket>,
    pub document_count: usize,
    pub line_count: usize,
    pub total_quantity: Decimal,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

impl SummaryReport {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Issuance summary service
#[derive(Clone)]
pub struct SalidasSummaryService {
    fetcher: PagedFetcher,
    resolver: KeyBatchResolver,
    collections: CollectionsConfig,
}

impl SalidasSummaryService {
    pub fn new(store: Arc<dyn BackingStore>, config: &Config) -> Self {
        let fetcher = PagedFetcher::from_config(store, &config.store);
        Self {
            resolver: KeyBatchResolver::from_config(fetcher.clone(), &config.store),
            fetcher,
            collections: config.collections.clone(),
        }
    }

    pub async fn summary(&self, params: SummaryParams) -> AppResult<SummaryReport> {
        let range = validate_date_range(params.start, params.end.or(params.start))?;
        let language = params.language;

        tracing::info!(
            start = %range.start,
            end = %range.end,
            installation = ?params.installation_id,
            requester = ?params.requester_id,
            "Loading issuance summary"
        );

        let query = QueryDescriptor::table(&self.collections.issue_lines)
            .select(LINE_COLUMNS)
            .gte("fecha", range.start)
            .lte("fecha", range.end)
            .order_by("fecha")
            .order_by("numero_solicitud")
            .order_by("id")
            .with_exact_count();
        let drained = self.fetcher.drain::<SalidaLineRow>(&query).await?;

        let mut warnings = Vec::new();
        if let Some(warning) = drained.truncation_warning(language) {
            warnings.push(warning);
        }
        let truncated = drained.truncated;
        let events = to_events(drained.rows);

        let headers: HashMap<String, SalidaHeader> = self
            .resolver
            .resolve(
                &Lookup::new(&self.collections.issue_headers, "numero_solicitud"),
                &key_set(events.iter().map(|e| e.event_id)),
            )
            .await;

        let requester_filter = params
            .requester_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let events: Vec<_> = events
            .into_iter()
            .filter(|event| {
                let header = headers.get(&event.event_id.to_string());
                let installation_ok = params.installation_id.map_or(true, |wanted| {
                    header.and_then(|h| h.instalacion_id) == Some(wanted)
                });
                let requester_ok = requester_filter.map_or(true, |wanted| {
                    header.and_then(|h| h.identificacion.as_deref()) == Some(wanted)
                });
                installation_ok && requester_ok
            })
            .collect();

        let kept_headers: Vec<&SalidaHeader> = key_set(events.iter().map(|e| e.event_id))
            .iter()
            .filter_map(|k| headers.get(k))
            .collect();
        let requester_keys = key_set(kept_headers.iter().filter_map(|h| h.identificacion.clone()));
        let installation_keys = key_set(kept_headers.iter().filter_map(|h| h.instalacion_id));
        let article_keys = key_set(events.iter().map(|e| e.item_code.clone()));

        let personnel_lookup = Lookup::new(&self.collections.personnel, "identificacion");
        let installation_lookup = Lookup::new(&self.collections.installations, "id");
        let article_lookup = Lookup::new(&self.collections.articles, "codigo");
        let (requesters, installations, articles) = tokio::join!(
            self.resolver.resolve::<Personal>(&personnel_lookup, &requester_keys),
            self.resolver.resolve::<Instalacion>(&installation_lookup, &installation_keys),
            self.resolver.resolve::<Articulo>(&article_lookup, &article_keys),
        );

        let article_name = |code: &str| {
            articles
                .get(code)
                .map(|a| a.display_label())
                .unwrap_or_else(|| NOT_AVAILABLE_LABEL.to_string())
        };
        let article_unit = |code: &str| articles.get(code).and_then(|a| a.unidad.clone());

        // Per document; header fields are taken once
        let mut documents: BTreeMap<(NaiveDate, i64), DocumentSummary> = BTreeMap::new();
        let mut first_dates: HashMap<i64, NaiveDate> = HashMap::new();
        for event in &events {
            let header = headers.get(&event.event_id.to_string());
            let date = *first_dates
                .entry(event.event_id)
                .or_insert_with(|| header.and_then(|h| h.fecha).unwrap_or(event.occurred_on));
            let document = documents
                .entry((date, event.event_id))
                .or_insert_with(|| DocumentSummary {
                    number: event.event_id,
                    date,
                    requester: requester_label(header, &requesters),
                    installation: installation_label(header, &installations),
                    notes: header.and_then(|h| h.observaciones.clone()),
                    total_quantity: Decimal::ZERO,
                    lines: Vec::new(),
                });
            document.total_quantity += event.quantity;
            document.lines.push(DocumentLine {
                item_code: event.item_code.clone(),
                item_name: article_name(&event.item_code),
                unit: article_unit(&event.item_code),
                quantity: event.quantity,
            });
        }

        // Per article
        let mut per_article: BTreeMap<&str, (Decimal, BTreeSet<i64>)> = BTreeMap::new();
        for event in &events {
            let entry = per_article
                .entry(event.item_code.as_str())
                .or_insert_with(|| (Decimal::ZERO, BTreeSet::new()));
            entry.0 += event.quantity;
            entry.1.insert(event.event_id);
        }
        let mut article_rows: Vec<ArticleSummary> = per_article
            .into_iter()
            .map(|(code, (quantity, docs))| ArticleSummary {
                item_code: code.to_string(),
                item_name: article_name(code),
                unit: article_unit(code),
                total_quantity: quantity,
                document_count: docs.len(),
            })
            .collect();
        article_rows.sort_by(|a, b| {
            b.total_quantity
                .cmp(&a.total_quantity)
                .then_with(|| a.item_code.cmp(&b.item_code))
        });

        let report = SummaryReport {
            start: range.start,
            end: range.end,
            document_count: documents.len(),
            line_count: events.len(),
            total_quantity: events.iter().map(|e| e.quantity).sum(),
            documents: documents.into_values().collect(),
            articles: article_rows,
            daily: aggregate_daily(&events, language),
            truncated,
            warnings,
        };

        tracing::info!(
            documents = report.document_count,
            lines = report.line_count,
            articles = report.articles.len(),
            truncated = report.truncated,
            "Issuance summary ready"
        );

        Ok(report)
    }
}
