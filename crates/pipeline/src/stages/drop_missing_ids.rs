//! Drops records that cannot be attributed to a user and product.
//!
//! Identifiers are never imputed: a record with an empty user_id or
//! product_id carries no usable signal and is removed from the batch.

use crate::error::Result;
use crate::traits::Stage;
use data_loader::RatingRecord;

/// Removes records with a missing user_id or product_id.
pub struct DropMissingIds;

impl Stage for DropMissingIds {
    fn name(&self) -> &str {
        "DropMissingIds"
    }

    fn apply(&self, records: Vec<RatingRecord>) -> Result<Vec<RatingRecord>> {
        let kept: Vec<RatingRecord> = records
            .into_iter()
            .filter(|r| !r.user_id.is_empty() && !r.product_id.is_empty())
            .collect();

        Ok(kept)
    }
}
