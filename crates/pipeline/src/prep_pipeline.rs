//! The PrepPipeline chains cleaning stages.
//!
//! This module provides the PrepPipeline struct that runs multiple
//! stages in sequence using the builder pattern.

use crate::error::Result;
use crate::traits::Stage;
use data_loader::RatingRecord;
use tracing;

/// Chains cleaning stages into a processing pipeline.
///
/// ## Usage
/// ```ignore
/// let pipeline = PrepPipeline::new()
///     .add_stage(DropMissingIds)
///     .add_stage(RepairTimestamps)
///     .add_stage(ImputeRatings::new(0.0, 5.0));
///
/// let cleaned = pipeline.apply(records)?;
/// ```
pub struct PrepPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl PrepPipeline {
    /// Create a new empty PrepPipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a stage to the pipeline (builder pattern).
    pub fn add_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Apply all stages in sequence to the record batch.
    ///
    /// Each stage receives the previous stage's output; the first fatal
    /// error aborts the run.
    pub fn apply(&self, records: Vec<RatingRecord>) -> Result<Vec<RatingRecord>> {
        let mut current = records;
        for stage in &self.stages {
            tracing::debug!(
                "Applying stage: {} (input count: {})",
                stage.name(),
                current.len()
            );
            current = stage.apply(current)?;
            tracing::debug!(
                "Stage applied: {} (output count: {})",
                stage.name(),
                current.len()
            );
        }
        Ok(current)
    }
}

impl Default for PrepPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::DropMissingIds;

    #[test]
    fn test_empty_pipeline() {
        let pipeline = PrepPipeline::new();

        let records = vec![
            RatingRecord::new("u1", "p1", 4.0, 100),
            RatingRecord::new("u2", "p2", 3.0, 200),
        ];

        let out = pipeline.apply(records.clone()).unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn test_single_stage() {
        let pipeline = PrepPipeline::new().add_stage(DropMissingIds);

        let records = vec![
            RatingRecord::new("u1", "p1", 4.0, 100),
            RatingRecord::new("", "p2", 3.0, 200),
        ];

        let out = pipeline.apply(records).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].user_id, "u1");
    }
}
