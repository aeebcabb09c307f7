/// Per-incident sub-resource enrichment
///
/// - Bounded worker pool with index-aligned results and aggregated failures
/// - Note enrichment with cached author lookups

pub mod batch;
pub mod notes;

pub use batch::{BatchEnricher, BatchOutcome, ItemError, DEFAULT_PARALLELISM};
pub use notes::{NoteEnricher, UNKNOWN_AUTHOR};
