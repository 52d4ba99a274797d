//! Purchase projection
//!
//! The store procedure computes per-item reorder figures from consumption
//! history. Its rows are completed where fields are missing, held to the
//! reorder invariants, enriched with article, category and installation
//! labels and totalled. Nothing is written back to the store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use shared::replenishment::{self, ReorderInputs};
use shared::validation::validate_projection_parameters;
use shared::{
    Articulo, CategoriaGasto, Instalacion, Language, ProjectionParameters, ProjectionRecord,
    ProjectionRow, ProjectionTotals, QueryDescriptor, ReferenceEntity, NOT_AVAILABLE_LABEL,
};

use super::key_batch::{key_set, KeyBatchResolver, Lookup};
use super::paged_fetcher::PagedFetcher;
use crate::config::{CollectionsConfig, Config};
use crate::error::AppResult;
use crate::external::BackingStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionReport {
    pub parameters: ProjectionParameters,
    pub rows: Vec<ProjectionRow>,
    pub totals: ProjectionTotals,
    pub truncated: bool,
    pub warnings: Vec<String>,
}

impl ProjectionReport {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Labels joined onto a projection record
#[derive(Debug, Default)]
pub struct Enrichment {
    pub articles: HashMap<String, Articulo>,
    pub categories: HashMap<String, CategoriaGasto>,
    pub installations: HashMap<String, Instalacion>,
}

/// Replenishment projection service
#[derive(Clone)]
pub struct ProjectionService {
    fetcher: PagedFetcher,
    resolver: KeyBatchResolver,
    collections: CollectionsConfig,
}

impl ProjectionService {
    pub fn new(store: Arc<dyn BackingStore>, config: &Config) -> Self {
        let fetcher = PagedFetcher::from_config(store, &config.store);
        Self {
            resolver: KeyBatchResolver::from_config(fetcher.clone(), &config.store),
            fetcher,
            collections: config.collections.clone(),
        }
    }

    pub async fn project(
        &self,
        params: ProjectionParameters,
        language: Language,
    ) -> AppResult<ProjectionReport> {
        validate_projection_parameters(&params)?;

        tracing::info!(
            history_months = params.history_months,
            lead_time_months = params.lead_time_months,
            cycle_months = params.cycle_months,
            safety_factor = %params.safety_factor,
            "Running purchase projection"
        );

        let query = QueryDescriptor::procedure(
            &self.collections.projection_procedure,
            params.to_procedure_args(),
        )
        .order_by("codigo");
        let drained = self.fetcher.drain::<ProjectionRecord>(&query).await?;

        let mut warnings = Vec::new();
        if let Some(warning) = drained.truncation_warning(language) {
            warnings.push(warning);
        }
        let truncated = drained.truncated;

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(drained.rows.len());
        for record in drained.rows {
            if seen.insert(record.codigo.clone()) {
                records.push(record);
            } else {
                tracing::warn!(item = %record.codigo, "Duplicate projection row ignored");
                warnings.push(duplicate_warning(&record.codigo, language));
            }
        }

        let enrichment = self.enrich(&records).await;

        let mut rows: Vec<ProjectionRow> = records
            .iter()
            .map(|record| normalize(record, &params, &enrichment))
            .collect();
        rows.sort_by(|a, b| a.item_code.cmp(&b.item_code));
        let totals = ProjectionTotals::from_rows(&rows);

        tracing::info!(
            items = totals.item_count,
            to_purchase = totals.items_to_purchase,
            total_cost = %totals.total_estimated_cost,
            truncated,
            "Purchase projection ready"
        );

        Ok(ProjectionReport {
            parameters: params,
            rows,
            totals,
            truncated,
            warnings,
        })
    }

    async fn enrich(&self, records: &[ProjectionRecord]) -> Enrichment {
        let article_keys = key_set(records.iter().map(|r| r.codigo.clone()));
        let installation_keys = key_set(records.iter().filter_map(|r| r.instalacion_id));

        let article_lookup = Lookup::new(&self.collections.articles, "codigo");
        let installation_lookup = Lookup::new(&self.collections.installations, "id");
        let (articles, installations) = tokio::join!(
            self.resolver.resolve::<Articulo>(&article_lookup, &article_keys),
            self.resolver.resolve::<Instalacion>(&installation_lookup, &installation_keys),
        );

        // Categories come from the record or, failing that, the article
        let category_keys = key_set(
            records
                .iter()
                .filter_map(|r| category_id(r, articles.get(&r.codigo))),
        );
        let categories = self
            .resolver
            .resolve::<CategoriaGasto>(
                &Lookup::new(&self.collections.expense_categories, "id"),
                &category_keys,
            )
            .await;

        Enrichment {
            articles,
            categories,
            installations,
        }
    }
}

fn category_id(record: &ProjectionRecord, article: Option<&Articulo>) -> Option<i64> {
    record
        .categoria_gasto_id
        .or_else(|| article.and_then(|a| a.categoria_gasto_id))
}

fn duplicate_warning(code: &str, language: Language) -> String {
    match language {
        Language::Spanish => format!(
            "Artículo {} duplicado en la proyección; se conservó la primera fila",
            code
        ),
        Language::English => format!(
            "Item {} appeared more than once; the first row was kept",
            code
        ),
    }
}

/// Complete one record and enforce the reorder invariants.
///
/// Store values win where present; missing fields are derived with the
/// reorder formula. Negative suggestions are floored to zero and the
/// estimated cost is always `suggested_quantity * unit_cost`.
pub fn normalize(
    record: &ProjectionRecord,
    params: &ProjectionParameters,
    enrichment: &Enrichment,
) -> ProjectionRow {
    let article = enrichment.articles.get(&record.codigo);

    let inputs = ReorderInputs {
        current_stock: record.stock_actual.unwrap_or(Decimal::ZERO),
        monthly_average: record.promedio_mensual.unwrap_or(Decimal::ZERO),
        unit_cost: record
            .costo_unitario
            .or_else(|| article.and_then(|a| a.costo_unitario))
            .unwrap_or(Decimal::ZERO),
    };
    let derived = replenishment::compute(&inputs, params);

    let lead_time_consumption = record
        .consumo_entrega
        .unwrap_or(derived.lead_time_consumption);
    let residual_stock = record
        .stock_residual
        .unwrap_or(derived.residual_stock)
        .max(Decimal::ZERO);
    let cycle_demand = record.demanda_ciclo.unwrap_or(derived.cycle_demand);

    let mut suggested_quantity = record
        .cantidad_sugerida
        .unwrap_or(derived.suggested_quantity);
    if suggested_quantity < Decimal::ZERO {
        tracing::warn!(
            item = %record.codigo,
            suggested = %suggested_quantity,
            "Negative suggestion floored to zero"
        );
        suggested_quantity = Decimal::ZERO;
    }

    let estimated_cost = replenishment::estimated_cost(suggested_quantity, inputs.unit_cost);
    if let Some(reported) = record.costo_estimado {
        if reported != estimated_cost {
            tracing::debug!(
                item = %record.codigo,
                %reported,
                recomputed = %estimated_cost,
                "Estimated cost recomputed"
            );
        }
    }

    let category = category_id(record, article);
    let expense_category = category
        .and_then(|id| enrichment.categories.get(&id.to_string()))
        .map(|c| c.display_label())
        .unwrap_or_else(|| NOT_AVAILABLE_LABEL.to_string());
    let installation = record
        .instalacion_id
        .and_then(|id| enrichment.installations.get(&id.to_string()))
        .map(|i| i.display_label())
        .unwrap_or_else(|| NOT_AVAILABLE_LABEL.to_string());

    ProjectionRow {
        item_code: record.codigo.clone(),
        item_name: article
            .map(|a| a.display_label())
            .unwrap_or_else(|| NOT_AVAILABLE_LABEL.to_string()),
        unit: article.and_then(|a| a.unidad.clone()),
        current_stock: inputs.current_stock,
        monthly_average: inputs.monthly_average,
        lead_time_consumption,
        residual_stock,
        cycle_demand,
        suggested_quantity,
        unit_cost: inputs.unit_cost,
        estimated_cost,
        expense_category_id: category,
        expense_category,
        installation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ProjectionParameters {
        ProjectionParameters {
            history_months: 12,
            lead_time_months: 2,
            cycle_months: 12,
            safety_factor: Decimal::new(11, 1),
        }
    }

    #[test]
    fn test_missing_fields_are_derived() {
        let record = ProjectionRecord {
            codigo: "ART-1".to_string(),
            stock_actual: Some(Decimal::from(5)),
            promedio_mensual: Some(Decimal::from(10)),
            costo_unitario: Some(Decimal::new(250, 2)),
            ..Default::default()
        };
        let row = normalize(&record, &params(), &Enrichment::default());

        assert_eq!(row.lead_time_consumption, Decimal::from(20));
        assert_eq!(row.residual_stock, Decimal::ZERO);
        assert_eq!(row.cycle_demand, Decimal::from(120));
        assert_eq!(row.suggested_quantity, Decimal::from(132));
        assert_eq!(row.estimated_cost, Decimal::from(330));
        assert_eq!(row.item_name, NOT_AVAILABLE_LABEL);
        assert_eq!(row.expense_category, NOT_AVAILABLE_LABEL);
    }

    #[test]
    fn test_store_values_win_and_invariants_hold() {
        let record = ProjectionRecord {
            codigo: "ART-2".to_string(),
            stock_actual: Some(Decimal::from(5)),
            promedio_mensual: Some(Decimal::from(10)),
            cantidad_sugerida: Some(Decimal::from(-4)),
            costo_unitario: Some(Decimal::from(3)),
            costo_estimado: Some(Decimal::from(999)),
            stock_residual: Some(Decimal::from(-2)),
            ..Default::default()
        };
        let row = normalize(&record, &params(), &Enrichment::default());

        assert_eq!(row.suggested_quantity, Decimal::ZERO);
        assert_eq!(row.residual_stock, Decimal::ZERO);
        assert_eq!(row.estimated_cost, Decimal::ZERO);
    }

    #[test]
    fn test_category_falls_back_to_article() {
        let mut enrichment = Enrichment::default();
        enrichment.articles.insert(
            "ART-3".to_string(),
            Articulo {
                codigo: "ART-3".to_string(),
                nombre: "Guantes".to_string(),
                unidad: Some("par".to_string()),
                categoria_gasto_id: Some(7),
                costo_unitario: Some(Decimal::from(4)),
            },
        );
        enrichment.categories.insert(
            "7".to_string(),
            CategoriaGasto {
                id: 7,
                nombre: "Seguridad".to_string(),
            },
        );
        let record = ProjectionRecord {
            codigo: "ART-3".to_string(),
            cantidad_sugerida: Some(Decimal::from(2)),
            ..Default::default()
        };
        let row = normalize(&record, &params(), &enrichment);

        assert_eq!(row.item_name, "Guantes");
        assert_eq!(row.expense_category, "Seguridad");
        assert_eq!(row.unit_cost, Decimal::from(4));
        assert_eq!(row.estimated_cost, Decimal::from(8));
    }
}
