/// Incident attribution
///
/// Decides which incidents belong to a user's shift:
/// - Log-entry scan for windows up to 16 hours
/// - On-call window scan for longer windows

pub mod attributor;
pub mod strategy;

pub use attributor::IncidentAttributor;
pub use strategy::{
    log_entries_mention, on_call_covers, select_strategy, Attribution, AttributionStrategy,
    LogEntryStrategy, OnCallWindowStrategy, StrategyKind, LOG_ENTRY_SCAN_MAX_WINDOW_SECS,
};
