//! Rewrites invalid timestamps to the dataset's minimum positive timestamp.
//!
//! A timestamp <= 0 cannot be trusted, but the record's rating still is;
//! rather than dropping the row, the timestamp is replaced with the earliest
//! positive timestamp seen in the batch. If the batch has no positive
//! timestamp at all there is nothing to impute from and the run aborts.

use crate::error::{PrepError, Result};
use crate::traits::Stage;
use data_loader::RatingRecord;

/// Replaces timestamps <= 0 with the minimum positive timestamp of the batch.
pub struct RepairTimestamps;

impl Stage for RepairTimestamps {
    fn name(&self) -> &str {
        "RepairTimestamps"
    }

    fn apply(&self, records: Vec<RatingRecord>) -> Result<Vec<RatingRecord>> {
        let min_positive = records
            .iter()
            .filter(|r| r.timestamp > 0)
            .map(|r| r.timestamp)
            .min()
            .ok_or_else(|| {
                PrepError::DataIntegrity(
                    "no record carries a positive timestamp; cannot repair".to_string(),
                )
            })?;

        let repaired: Vec<RatingRecord> = records
            .into_iter()
            .map(|mut r| {
                if r.timestamp <= 0 {
                    r.timestamp = min_positive;
                }
                r
            })
            .collect();

        Ok(repaired)
    }
}
