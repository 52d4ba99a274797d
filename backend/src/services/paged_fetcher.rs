//! Exhaustive paging over the backing store
//!
//! The store caps every response at a fixed number of rows, so a read is
//! drained page by page until a short page arrives or the configured ceiling
//! is reached. Rows are typed at this boundary.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use shared::{Language, PageRange, QueryDescriptor};

use crate::config::StoreConfig;
use crate::error::{AppError, AppResult};
use crate::external::BackingStore;

/// Rows collected by one drain
#[derive(Debug, Clone)]
pub struct Drained<T> {
    pub rows: Vec<T>,
    /// The ceiling stopped the drain before the data ran out
    pub truncated: bool,
    pub total_count: Option<u64>,
    /// Round-trips performed
    pub pages: usize,
}

impl<T> Drained<T> {
    pub fn truncation_warning(&self, language: Language) -> Option<String> {
        self.truncated
            .then(|| truncation_warning(self.rows.len(), self.total_count, language))
    }
}

/// User-facing notice for a capped result
pub fn truncation_warning(shown: usize, total: Option<u64>, language: Language) -> String {
    match (language, total) {
        (Language::Spanish, Some(total)) => {
            format!("Mostrando los primeros {} de {} registros", shown, total)
        }
        (Language::Spanish, None) => {
            format!("Mostrando los primeros {} registros; puede haber más", shown)
        }
        (Language::English, Some(total)) => format!("Showing first {} of {} rows", shown, total),
        (Language::English, None) => format!("Showing first {} rows of possibly more", shown),
    }
}

/// Drains queries page by page
#[derive(Clone)]
pub struct PagedFetcher {
    store: Arc<dyn BackingStore>,
    page_size: usize,
    max_rows: usize,
}

impl PagedFetcher {
    pub fn new(store: Arc<dyn BackingStore>, page_size: usize, max_rows: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            max_rows: max_rows.max(1),
        }
    }

    pub fn from_config(store: Arc<dyn BackingStore>, config: &StoreConfig) -> Self {
        Self::new(store, config.page_size, config.max_rows)
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    /// Fetch every row of `query`, up to the ceiling.
    ///
    /// Pages are requested sequentially and concatenated in arrival order. Any
    /// failing page aborts the whole drain.
    pub async fn drain<T>(&self, query: &QueryDescriptor) -> AppResult<Drained<T>>
    where
        T: DeserializeOwned + Send,
    {
        let source = query.source_name();
        let mut rows: Vec<T> = Vec::new();
        let mut total_count = None;
        let mut pages = 0;
        let mut truncated = false;

        loop {
            let remaining = self.max_rows - rows.len();
            let limit = self.page_size.min(remaining);
            let range = PageRange::new(rows.len(), limit);

            let page = self.store.fetch_page(query, range).await?;
            pages += 1;
            if page.total.is_some() {
                total_count = page.total;
            }

            let received = page.rows.len().min(limit);
            for (index, raw) in page.rows.into_iter().take(limit).enumerate() {
                let row = serde_json::from_value(raw).map_err(|e| AppError::MalformedRow {
                    source_name: source.to_string(),
                    message: format!("row {}: {}", range.offset + index, e),
                })?;
                rows.push(row);
            }

            tracing::debug!(source, page = pages, received, "Drained page");

            if received < limit {
                break;
            }
            if rows.len() >= self.max_rows {
                truncated = match total_count {
                    Some(total) => total > rows.len() as u64,
                    None => true,
                };
                break;
            }
        }

        if truncated {
            tracing::warn!(
                source,
                rows = rows.len(),
                total = ?total_count,
                "Row ceiling reached, result truncated"
            );
        }

        Ok(Drained {
            rows,
            truncated,
            total_count,
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_warning_text() {
        assert_eq!(
            truncation_warning(50_000, None, Language::English),
            "Showing first 50000 rows of possibly more"
        );
        assert_eq!(
            truncation_warning(10, Some(25), Language::Spanish),
            "Mostrando los primeros 10 de 25 registros"
        );
    }

    #[test]
    fn test_drained_warning_only_when_truncated() {
        let drained: Drained<i32> = Drained {
            rows: vec![1, 2],
            truncated: false,
            total_count: Some(2),
            pages: 1,
        };
        assert!(drained.truncation_warning(Language::English).is_none());
    }
}
