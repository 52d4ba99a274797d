//! Reference key resolution tests
//!
//! Tests for the batched key resolver including:
//! - No requests for an empty key set
//! - Batch partitioning and merge without duplicates
//! - Failed batches fall back instead of failing the query

use std::collections::BTreeSet;
use std::sync::Arc;

use almacen_backend::external::InMemoryStore;
use almacen_backend::services::{KeyBatchResolver, Lookup, PagedFetcher};
use proptest::prelude::*;
use serde_json::json;
use shared::Personal;

fn people(n: usize) -> InMemoryStore {
    let rows = (0..n)
        .map(|i| json!({ "identificacion": format!("{:04}", i), "nombre": format!("P{}", i) }))
        .collect();
    InMemoryStore::new().with_table("personal", rows)
}

fn keys(n: usize) -> BTreeSet<String> {
    (0..n).map(|i| format!("{:04}", i)).collect()
}

fn resolver(store: Arc<InMemoryStore>, batch_size: usize, in_flight: usize) -> KeyBatchResolver {
    KeyBatchResolver::new(PagedFetcher::new(store, 1000, 50_000), batch_size, in_flight)
}

fn lookup() -> Lookup {
    Lookup::new("personal", "identificacion")
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test an empty key set makes no requests
    #[tokio::test]
    async fn test_empty_key_set() {
        let store = Arc::new(people(10));
        let resolved = resolver(store.clone(), 200, 4)
            .resolve::<Personal>(&lookup(), &BTreeSet::new())
            .await;

        assert!(resolved.is_empty());
        assert_eq!(store.total_requests(), 0);
    }

    /// Test two batches merge into one map
    #[tokio::test]
    async fn test_two_batches_merge() {
        let store = Arc::new(people(350));
        let resolved = resolver(store.clone(), 200, 4)
            .resolve::<Personal>(&lookup(), &keys(350))
            .await;

        assert_eq!(resolved.len(), 350);
        assert_eq!(store.request_count("personal"), 2);
        assert_eq!(resolved["0349"].nombre, "P349");
    }

    /// Test the first row wins when the store repeats a key
    #[tokio::test]
    async fn test_first_row_wins() {
        let store = Arc::new(InMemoryStore::new().with_table(
            "personal",
            vec![
                json!({ "identificacion": "7", "nombre": "Primero" }),
                json!({ "identificacion": 7, "nombre": "Segundo" }),
            ],
        ));
        let resolved = resolver(store, 200, 4)
            .resolve::<Personal>(&lookup(), &BTreeSet::from(["7".to_string()]))
            .await;

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["7"].nombre, "Primero");
    }

    /// Test a failed batch contributes nothing while the others resolve
    #[tokio::test]
    async fn test_failed_batch_is_skipped() {
        // The last key lands in the second (50-key) batch
        let store = Arc::new(people(250).fail_on_key("personal", "0249"));
        let resolved = resolver(store.clone(), 200, 4)
            .resolve::<Personal>(&lookup(), &keys(250))
            .await;

        assert_eq!(resolved.len(), 200);
        assert!(resolved.contains_key("0000"));
        assert!(!resolved.contains_key("0249"));
        assert_eq!(store.request_count("personal"), 2);
    }

    /// Test keys missing from the store are simply absent
    #[tokio::test]
    async fn test_unknown_keys_absent() {
        let store = Arc::new(people(5));
        let resolved = resolver(store, 200, 4)
            .resolve::<Personal>(&lookup(), &keys(8))
            .await;
        assert_eq!(resolved.len(), 5);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Batch size and concurrency never change the merged result
    #[test]
    fn prop_resolution_independent_of_batching(
        n in 1usize..400,
        batch_size in 1usize..150,
        in_flight in 1usize..6,
    ) {
        let store = Arc::new(people(n));
        let resolved = tokio_test::block_on(
            resolver(store.clone(), batch_size, in_flight).resolve::<Personal>(&lookup(), &keys(n)),
        );

        prop_assert_eq!(resolved.len(), n);
        prop_assert_eq!(store.total_requests(), (n + batch_size - 1) / batch_size);
        for (key, person) in &resolved {
            prop_assert_eq!(key, &person.identificacion);
        }
    }
}
