//! REST client for the backing store
//!
//! Speaks the PostgREST dialect: tables are read with `GET /rest/v1/{table}`
//! and procedures are invoked with `POST /rest/v1/rpc/{name}`. Filters,
//! ordering and the page window travel as query parameters; the exact row
//! count comes back in `Content-Range`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use shared::{Filter, FilterOp, PageRange, QueryDescriptor, QuerySource};

use super::{BackingStore, Page};
use crate::config::StoreConfig;
use crate::error::{AppError, AppResult};

/// Backing store client
#[derive(Clone)]
pub struct StoreClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl StoreClient {
    /// Create a client from the store configuration
    pub fn new(config: &StoreConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, source: &QuerySource) -> String {
        match source {
            QuerySource::Table { name } => format!("{}/rest/v1/{}", self.base_url, name),
            QuerySource::Procedure { name, .. } => {
                format!("{}/rest/v1/rpc/{}", self.base_url, name)
            }
        }
    }
}

/// Quote a value for use inside `in.(...)`
fn quote_list_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Render one filter as a `(column, operator.value)` pair
pub fn render_filter(filter: &Filter) -> (String, String) {
    let rendered = match &filter.op {
        FilterOp::Eq(v) => format!("eq.{}", v),
        FilterOp::Neq(v) => format!("neq.{}", v),
        FilterOp::Gt(v) => format!("gt.{}", v),
        FilterOp::Gte(v) => format!("gte.{}", v),
        FilterOp::Lt(v) => format!("lt.{}", v),
        FilterOp::Lte(v) => format!("lte.{}", v),
        FilterOp::Like(v) => format!("like.{}", v),
        FilterOp::ILike(v) => format!("ilike.{}", v),
        FilterOp::In(values) => {
            let list: Vec<String> = values.iter().map(|v| quote_list_value(v)).collect();
            format!("in.({})", list.join(","))
        }
        FilterOp::IsNull => "is.null".to_string(),
    };
    (filter.column.clone(), rendered)
}

/// All query parameters for one page request
pub fn query_params(query: &QueryDescriptor, range: PageRange) -> Vec<(String, String)> {
    let mut params = Vec::with_capacity(query.filters.len() + 4);
    if let Some(select) = &query.select {
        params.push(("select".to_string(), select.clone()));
    }
    params.extend(query.filters.iter().map(render_filter));
    if !query.order.is_empty() {
        let order: Vec<String> = query
            .order
            .iter()
            .map(|o| format!("{}.{}", o.column, if o.descending { "desc" } else { "asc" }))
            .collect();
        params.push(("order".to_string(), order.join(",")));
    }
    params.push(("offset".to_string(), range.offset.to_string()));
    params.push(("limit".to_string(), range.limit.to_string()));
    params
}

/// Total from a `Content-Range` header such as `0-999/2500` or `*/0`
pub fn parse_content_range(value: &str) -> Option<u64> {
    let (_, total) = value.trim().split_once('/')?;
    match total {
        "*" => None,
        n => n.parse().ok(),
    }
}

#[async_trait]
impl BackingStore for StoreClient {
    async fn fetch_page(&self, query: &QueryDescriptor, range: PageRange) -> AppResult<Page> {
        let url = self.endpoint(&query.source);
        let params = query_params(query, range);

        let request = match &query.source {
            QuerySource::Table { .. } => self.client.get(&url),
            QuerySource::Procedure { args, .. } => self.client.post(&url).json(args),
        };
        let mut request = request
            .query(&params)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, "application/json");
        if query.count_exact {
            request = request.header("Prefer", "count=exact");
        }

        let response = request.send().await.map_err(|e| {
            AppError::Store(format!("{} request failed: {}", query.source_name(), e))
        })?;

        let total = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range);

        // Offset past the last row
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(Page {
                rows: Vec::new(),
                total,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StoreStatus {
                source_name: query.source_name().to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<serde_json::Value> = response.json().await.map_err(|e| {
            AppError::Store(format!(
                "Failed to parse {} response: {}",
                query.source_name(),
                e
            ))
        })?;

        tracing::debug!(
            source = query.source_name(),
            offset = range.offset,
            limit = range.limit,
            rows = rows.len(),
            "Fetched page"
        );

        Ok(Page { rows, total })
    }
}
