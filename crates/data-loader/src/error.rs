//! Error types for the data-loader crate.

use thiserror::Error;

/// Errors that can occur while loading the ratings file.
///
/// Row-level problems (missing fields, unparseable numbers) are not errors:
/// those rows are skipped during parsing. Only file-level and schema-level
/// failures surface here.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open ratings file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading the file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// File contains no header line
    #[error("Ratings file is empty: {path}")]
    EmptyFile { path: String },

    /// A required column is absent from the header
    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { column: String, path: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
