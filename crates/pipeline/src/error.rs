//! Error types for data preparation.

use thiserror::Error;

/// Fatal preparation failures. There is no partial-success return: either
/// the whole input is prepared or the run aborts with one of these.
///
/// Row-level problems never surface here: bad identifiers drop the row,
/// invalid ratings and timestamps are repaired in place.
#[derive(Error, Debug)]
pub enum PrepError {
    /// Input cannot be processed at all (empty input, every row dropped)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A dataset-level value cannot be imputed (e.g. no positive timestamp)
    #[error("Data integrity: {0}")]
    DataIntegrity(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, PrepError>;
