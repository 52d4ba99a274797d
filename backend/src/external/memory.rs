//! In-memory backing store
//!
//! Serves fixture tables and procedures with the same filter, ordering and
//! paging semantics as the REST store. Every request is recorded, and failures
//! or latency can be injected per collection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use shared::{FilterOp, OrderBy, PageRange, QueryDescriptor, QuerySource};

use super::{BackingStore, Page};
use crate::error::{AppError, AppResult};

type ProcedureFn = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

/// A request as seen by the store
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub source: String,
    pub range: PageRange,
    pub query: QueryDescriptor,
}

#[derive(Debug, Clone)]
enum FailureRule {
    /// The first `succeed` requests to `source` work, later ones fail
    AfterRequests { source: String, succeed: usize },
    /// Requests to `source` whose `IN` list contains `key` fail
    OnKey { source: String, key: String },
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: HashMap<String, Vec<Value>>,
    procedures: HashMap<String, ProcedureFn>,
    failures: Vec<FailureRule>,
    latency: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Value>) -> Self {
        self.tables.insert(name.into(), rows);
        self
    }

    /// Register a procedure computing its rows from the JSON arguments
    pub fn with_procedure<F>(mut self, name: impl Into<String>, procedure: F) -> Self
    where
        F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
    {
        self.procedures.insert(name.into(), Arc::new(procedure));
        self
    }

    /// Let the first `succeed` requests to `source` through, then fail
    pub fn fail_after(mut self, source: impl Into<String>, succeed: usize) -> Self {
        self.failures.push(FailureRule::AfterRequests {
            source: source.into(),
            succeed,
        });
        self
    }

    /// Fail any lookup against `source` whose key list contains `key`
    pub fn fail_on_key(mut self, source: impl Into<String>, key: impl Into<String>) -> Self {
        self.failures.push(FailureRule::OnKey {
            source: source.into(),
            key: key.into(),
        });
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log().clone()
    }

    pub fn request_count(&self, source: &str) -> usize {
        self.log().iter().filter(|r| r.source == source).count()
    }

    pub fn total_requests(&self) -> usize {
        self.log().len()
    }

    fn should_fail(&self, query: &QueryDescriptor, seen_before: usize) -> bool {
        self.failures.iter().any(|rule| match rule {
            FailureRule::AfterRequests { source, succeed } => {
                source == query.source_name() && seen_before >= *succeed
            }
            FailureRule::OnKey { source, key } => {
                source == query.source_name()
                    && query.filters.iter().any(|f| match &f.op {
                        FilterOp::In(values) => values.contains(key),
                        _ => false,
                    })
            }
        })
    }

    fn source_rows(&self, source: &QuerySource) -> AppResult<Vec<Value>> {
        match source {
            QuerySource::Table { name } => self
                .tables
                .get(name)
                .cloned()
                .ok_or_else(|| AppError::StoreStatus {
                    source_name: name.clone(),
                    status: 404,
                    body: "relation does not exist".to_string(),
                }),
            QuerySource::Procedure { name, args } => self
                .procedures
                .get(name)
                .map(|procedure| procedure(args))
                .ok_or_else(|| AppError::StoreStatus {
                    source_name: name.clone(),
                    status: 404,
                    body: "function does not exist".to_string(),
                }),
        }
    }
}

/// Plain-text form of a scalar cell
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Numeric comparison when both sides are numbers, text otherwise
fn compare_text(left: &str, right: &str) -> Ordering {
    match (left.parse::<f64>(), right.parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

/// `*` matches any run of characters
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

fn matches(row: &Value, column: &str, op: &FilterOp) -> bool {
    let cell = row.get(column).and_then(cell_text);
    match (op, cell) {
        (FilterOp::IsNull, cell) => cell.is_none(),
        (_, None) => false,
        (FilterOp::Eq(v), Some(c)) => compare_text(&c, v) == Ordering::Equal,
        (FilterOp::Neq(v), Some(c)) => compare_text(&c, v) != Ordering::Equal,
        (FilterOp::Gt(v), Some(c)) => compare_text(&c, v) == Ordering::Greater,
        (FilterOp::Gte(v), Some(c)) => compare_text(&c, v) != Ordering::Less,
        (FilterOp::Lt(v), Some(c)) => compare_text(&c, v) == Ordering::Less,
        (FilterOp::Lte(v), Some(c)) => compare_text(&c, v) != Ordering::Greater,
        (FilterOp::Like(p), Some(c)) => glob_match(p, &c),
        (FilterOp::ILike(p), Some(c)) => glob_match(&p.to_lowercase(), &c.to_lowercase()),
        (FilterOp::In(values), Some(c)) => values
            .iter()
            .any(|v| compare_text(&c, v) == Ordering::Equal),
    }
}

fn compare_rows(a: &Value, b: &Value, order: &[OrderBy]) -> Ordering {
    for key in order {
        let left = a.get(&key.column).and_then(cell_text);
        let right = b.get(&key.column).and_then(cell_text);
        // Nulls sort last ascending, as in PostgreSQL
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => compare_text(&l, &r),
        };
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl BackingStore for InMemoryStore {
    async fn fetch_page(&self, query: &QueryDescriptor, range: PageRange) -> AppResult<Page> {
        let seen_before = {
            let mut log = self.log();
            let seen = log
                .iter()
                .filter(|r| r.source == query.source_name())
                .count();
            log.push(RecordedRequest {
                source: query.source_name().to_string(),
                range,
                query: query.clone(),
            });
            seen
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.should_fail(query, seen_before) {
            return Err(AppError::StoreStatus {
                source_name: query.source_name().to_string(),
                status: 503,
                body: "injected failure".to_string(),
            });
        }

        let mut rows: Vec<Value> = self
            .source_rows(&query.source)?
            .into_iter()
            .filter(|row| {
                query
                    .filters
                    .iter()
                    .all(|f| matches(row, &f.column, &f.op))
            })
            .collect();
        if !query.order.is_empty() {
            rows.sort_by(|a, b| compare_rows(a, b, &query.order));
        }

        let total = query.count_exact.then_some(rows.len() as u64);
        let rows = rows
            .into_iter()
            .skip(range.offset)
            .take(range.limit)
            .collect();

        Ok(Page { rows, total })
    }
}
