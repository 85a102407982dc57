//! Core trait for the preparation pipeline.
//!
//! This module defines the Stage trait that allows composable cleaning
//! steps to be applied to a record batch.

use crate::error::Result;
use data_loader::RatingRecord;

/// Core trait for record-cleaning stages.
///
/// All cleaning steps implement this trait so they can be chained in a
/// PrepPipeline.
///
/// ## Design Note
/// - `Send + Sync` allows stages to be used in concurrent contexts
/// - Stages take ownership of the Vec<RatingRecord> and return a new Vec,
///   so each step is a pure transformation over the batch
pub trait Stage: Send + Sync {
    /// Returns the name of this stage (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this stage to a batch of records.
    ///
    /// # Returns
    /// * `Ok(Vec<RatingRecord>)` - The transformed batch
    /// * `Err` - A fatal, dataset-level failure; the run aborts
    fn apply(&self, records: Vec<RatingRecord>) -> Result<Vec<RatingRecord>>;
}
