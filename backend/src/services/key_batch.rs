//! Batched resolution of reference keys
//!
//! Reference data (people, installations, articles, categories, issuance
//! headers) lives in separate collections and is joined client-side. Keys are
//! deduplicated, split into `IN (...)` batches and looked up concurrently.
//! A failing batch only loses its own labels.

use std::collections::{BTreeSet, HashMap};

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use shared::{QueryDescriptor, ReferenceEntity};

use super::paged_fetcher::PagedFetcher;
use crate::config::StoreConfig;

/// Where a reference entity is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub collection: String,
    pub key_column: String,
    pub select: Option<String>,
}

impl Lookup {
    pub fn new(collection: impl Into<String>, key_column: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key_column: key_column.into(),
            select: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    fn query(&self, keys: &[String]) -> QueryDescriptor {
        let query = QueryDescriptor::table(&self.collection).in_list(&self.key_column, keys);
        match &self.select {
            Some(columns) => query.select(columns),
            None => query,
        }
    }
}

/// Resolves key sets into lookup maps
#[derive(Clone)]
pub struct KeyBatchResolver {
    fetcher: PagedFetcher,
    batch_size: usize,
    max_in_flight: usize,
}

impl KeyBatchResolver {
    pub fn new(fetcher: PagedFetcher, batch_size: usize, max_in_flight: usize) -> Self {
        Self {
            fetcher,
            batch_size: batch_size.max(1),
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn from_config(fetcher: PagedFetcher, config: &StoreConfig) -> Self {
        Self::new(fetcher, config.in_batch_size, config.max_concurrent_batches)
    }

    /// Look up every key, returning whatever could be resolved.
    ///
    /// The merge is keyed by [`ReferenceEntity::natural_key`]; when a key
    /// comes back more than once the row from the lowest batch wins.
    pub async fn resolve<R>(&self, lookup: &Lookup, keys: &BTreeSet<String>) -> HashMap<String, R>
    where
        R: ReferenceEntity + DeserializeOwned + Send,
    {
        if keys.is_empty() {
            return HashMap::new();
        }

        let keys: Vec<String> = keys.iter().cloned().collect();
        let batches: Vec<Vec<String>> = keys
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let batch_count = batches.len();

        let mut results: Vec<(usize, Vec<R>)> = stream::iter(batches.into_iter().enumerate())
            .map(|(index, batch)| {
                let query = lookup.query(&batch);
                let fetcher = &self.fetcher;
                async move {
                    match fetcher.drain::<R>(&query).await {
                        Ok(drained) => {
                            tracing::debug!(
                                collection = %lookup.collection,
                                batch = index,
                                keys = batch.len(),
                                rows = drained.rows.len(),
                                "Resolved batch"
                            );
                            (index, drained.rows)
                        }
                        Err(e) => {
                            tracing::warn!(
                                collection = %lookup.collection,
                                batch = index,
                                keys = batch.len(),
                                error = %e,
                                "Lookup batch failed, labels fall back"
                            );
                            (index, Vec::new())
                        }
                    }
                }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);

        let mut resolved = HashMap::with_capacity(keys.len());
        for row in results.into_iter().flat_map(|(_, rows)| rows) {
            resolved.entry(row.natural_key()).or_insert(row);
        }

        tracing::debug!(
            collection = %lookup.collection,
            batches = batch_count,
            requested = keys.len(),
            resolved = resolved.len(),
            "Key resolution finished"
        );

        resolved
    }
}

/// Collect a deduplicated key set
pub fn key_set<I, K>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = K>,
    K: ToString,
{
    keys.into_iter().map(|k| k.to_string()).collect()
}
