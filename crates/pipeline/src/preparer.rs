//! The DataPreparer: raw records in, trustworthy dataset out.
//!
//! Runs the cleaning stages in a fixed order and builds the indexed
//! dataset every downstream consumer trains or predicts against. Output is
//! deterministic for identical input and configuration: no randomness,
//! no wall-clock reads.

use crate::error::{PrepError, Result};
use crate::prep_pipeline::PrepPipeline;
use crate::stages::{DropMissingIds, ImputeRatings, RepairTimestamps};
use data_loader::{RatingDataset, RatingRecord};
use tracing::info;

/// Configuration for preparation: the valid rating scale.
#[derive(Debug, Clone, Copy)]
pub struct PrepConfig {
    pub min_rating: f64,
    pub max_rating: f64,
}

impl Default for PrepConfig {
    fn default() -> Self {
        // 0-5 product rating scale
        Self {
            min_rating: 0.0,
            max_rating: 5.0,
        }
    }
}

/// Validates, cleans, and indexes raw rating records.
pub struct DataPreparer {
    config: PrepConfig,
}

impl DataPreparer {
    pub fn new(config: PrepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PrepConfig {
        &self.config
    }

    /// Prepare raw records into a dataset satisfying the invariants:
    /// every record has both identifiers, a rating within the configured
    /// range, and a timestamp > 0.
    ///
    /// Fails with `Validation` when there is nothing to prepare and with
    /// `DataIntegrity` when timestamps cannot be repaired; there is no
    /// partial output.
    pub fn prepare(&self, records: Vec<RatingRecord>) -> Result<RatingDataset> {
        if records.is_empty() {
            return Err(PrepError::Validation(
                "no rating records to prepare".to_string(),
            ));
        }

        let pipeline = PrepPipeline::new()
            .add_stage(DropMissingIds)
            .add_stage(RepairTimestamps)
            .add_stage(ImputeRatings::new(
                self.config.min_rating,
                self.config.max_rating,
            ));

        let input_count = records.len();
        let cleaned = pipeline.apply(records)?;

        if cleaned.is_empty() {
            return Err(PrepError::Validation(
                "every record was dropped during cleaning".to_string(),
            ));
        }

        let dataset = RatingDataset::from_records(cleaned);
        let (users, products, ratings) = dataset.counts();
        info!(
            "Prepared dataset: {} of {} records kept ({} users, {} products)",
            ratings, input_count, users, products
        );

        Ok(dataset)
    }
}

impl Default for DataPreparer {
    fn default() -> Self {
        Self::new(PrepConfig::default())
    }
}
