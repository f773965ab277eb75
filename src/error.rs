//! Error types for jobpulse

use thiserror::Error;

/// Errors surfaced to the render/UI layer.
///
/// Malformed records and missing numeric fields are handled inside the
/// normalizer and aggregation engine and never appear here; "no data for
/// this selection" is a result variant on the view type, not an error.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("dataset not loaded yet; aggregate tables are unavailable")]
    DatasetNotReady,

    #[error("invalid month key: {0:?} (expected YYYY-MM)")]
    InvalidMonthKey(String),

    #[error("month {key} is outside the configured window {start}..={end}")]
    MonthOutOfWindow {
        key: crate::types::MonthKey,
        start: crate::types::MonthKey,
        end: crate::types::MonthKey,
    },

    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: crate::types::MonthKey,
        end: crate::types::MonthKey,
    },

    #[error("invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
