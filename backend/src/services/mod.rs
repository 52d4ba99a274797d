//! Query pipelines of the warehouse analytics server

pub mod item_history;
pub mod key_batch;
pub mod paged_fetcher;
pub mod projection;
pub mod salidas_summary;
pub mod view_state;

pub use item_history::ItemHistoryService;
pub use key_batch::{KeyBatchResolver, Lookup};
pub use paged_fetcher::{Drained, PagedFetcher};
pub use projection::ProjectionService;
pub use salidas_summary::SalidasSummaryService;
pub use view_state::{ViewController, ViewKind, ViewRegistry};
