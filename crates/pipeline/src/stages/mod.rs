//! Cleaning stages applied by the DataPreparer, in order:
//! identifier filtering, timestamp repair, rating imputation.

pub mod drop_missing_ids;
pub mod impute_ratings;
pub mod repair_timestamps;

pub use drop_missing_ids::DropMissingIds;
pub use impute_ratings::ImputeRatings;
pub use repair_timestamps::RepairTimestamps;
