//! Pipeline for validating, cleaning, and splitting rating data.
//!
//! This crate provides:
//! - Stage trait and implementations for record cleaning
//! - PrepPipeline for composing stages
//! - DataPreparer, the high-level prepare entry point
//! - Leave-last-out train/test splitting and time normalization
//!
//! ## Architecture
//! Preparation processes the record batch in stages:
//! 1. Rows without identifiers are dropped (never imputed)
//! 2. Invalid timestamps are rewritten to the minimum positive timestamp
//! 3. Out-of-range ratings are imputed from user/global means
//!
//! The cleaned batch becomes an indexed `RatingDataset`, which the split
//! partitions into train and test without ever re-cleaning.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{DataPreparer, PrepConfig, leave_last_out};
//!
//! let preparer = DataPreparer::new(PrepConfig::default());
//! let dataset = preparer.prepare(records)?;
//! let split = leave_last_out(&dataset);
//! ```

pub mod error;
pub mod prep_pipeline;
pub mod preparer;
pub mod split;
pub mod stages;
pub mod time;
pub mod traits;

// Re-export main types
pub use error::PrepError;
pub use prep_pipeline::PrepPipeline;
pub use preparer::{DataPreparer, PrepConfig};
pub use split::{Split, leave_last_out};
pub use time::normalize_time;
pub use traits::Stage;
