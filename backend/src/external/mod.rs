//! Backing store integrations
//!
//! Everything above this layer talks to [`BackingStore`]; the REST client is
//! used in production and the in-memory store by the test suites.

pub mod memory;
pub mod store;

use async_trait::async_trait;
use shared::{PageRange, QueryDescriptor};

use crate::error::AppResult;

pub use memory::InMemoryStore;
pub use store::StoreClient;

/// One page of raw rows
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub rows: Vec<serde_json::Value>,
    /// Exact row count across all pages, when requested and reported
    pub total: Option<u64>,
}

/// A read-only tabular store that serves windowed pages
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetch the rows of `query` that fall inside `range`
    async fn fetch_page(&self, query: &QueryDescriptor, range: PageRange) -> AppResult<Page>;
}
