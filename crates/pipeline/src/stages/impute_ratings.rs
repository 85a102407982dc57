//! Replaces out-of-range ratings with a per-user (or global) mean.
//!
//! ## Algorithm
//! Two passes over the batch:
//! 1. Aggregate sums and counts of *valid* ratings, globally and per user.
//!    Invalid values never enter a mean (no self-referential imputation).
//! 2. Rewrite each invalid rating to the user's mean of valid ratings, or
//!    the global mean of valid ratings when the user has none.
//!
//! A batch with zero valid ratings falls back to the midpoint of the
//! configured scale.

use crate::error::Result;
use crate::traits::Stage;
use data_loader::{RatingRecord, UserId};
use std::collections::HashMap;
use tracing::debug;

/// Imputes ratings outside the configured valid range.
pub struct ImputeRatings {
    min_rating: f64,
    max_rating: f64,
}

impl ImputeRatings {
    pub fn new(min_rating: f64, max_rating: f64) -> Self {
        Self {
            min_rating,
            max_rating,
        }
    }

    fn is_valid(&self, rating: f64) -> bool {
        rating >= self.min_rating && rating <= self.max_rating && rating.is_finite()
    }
}

impl Stage for ImputeRatings {
    fn name(&self) -> &str {
        "ImputeRatings"
    }

    fn apply(&self, records: Vec<RatingRecord>) -> Result<Vec<RatingRecord>> {
        // First pass: aggregate valid ratings only.
        let mut global_sum = 0.0;
        let mut global_count = 0usize;
        let mut user_sums: HashMap<&UserId, (f64, usize)> = HashMap::new();

        for record in &records {
            if self.is_valid(record.rating) {
                global_sum += record.rating;
                global_count += 1;
                let entry = user_sums.entry(&record.user_id).or_insert((0.0, 0));
                entry.0 += record.rating;
                entry.1 += 1;
            }
        }

        let global_mean = if global_count > 0 {
            global_sum / global_count as f64
        } else {
            (self.min_rating + self.max_rating) / 2.0
        };

        let user_means: HashMap<UserId, f64> = user_sums
            .into_iter()
            .map(|(user, (sum, count))| (user.clone(), sum / count as f64))
            .collect();

        // Second pass: rewrite invalid ratings.
        let mut imputed = 0usize;
        let records: Vec<RatingRecord> = records
            .into_iter()
            .map(|mut r| {
                if !self.is_valid(r.rating) {
                    r.rating = *user_means.get(&r.user_id).unwrap_or(&global_mean);
                    imputed += 1;
                }
                r
            })
            .collect();

        if imputed > 0 {
            debug!("Imputed {} invalid ratings", imputed);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> ImputeRatings {
        ImputeRatings::new(0.0, 5.0)
    }

    #[test]
    fn test_uses_user_mean_of_valid_ratings() {
        // User u1 has valid ratings [3, 5] and one invalid; expect 4.
        let records = vec![
            RatingRecord::new("u1", "p1", 3.0, 100),
            RatingRecord::new("u1", "p2", 5.0, 100),
            RatingRecord::new("u1", "p3", -1.0, 100),
        ];

        let out = stage().apply(records).unwrap();
        assert!((out[2].rating - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_falls_back_to_global_mean() {
        // u2 has no valid ratings; global mean of valid ratings is 2.0.
        let records = vec![
            RatingRecord::new("u1", "p1", 1.0, 100),
            RatingRecord::new("u1", "p2", 3.0, 100),
            RatingRecord::new("u2", "p3", 99.0, 100),
        ];

        let out = stage().apply(records).unwrap();
        assert!((out[2].rating - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_values_do_not_pollute_means() {
        // u1's invalid 99 must not contribute to u1's own mean.
        let records = vec![
            RatingRecord::new("u1", "p1", 2.0, 100),
            RatingRecord::new("u1", "p2", 99.0, 100),
            RatingRecord::new("u1", "p3", 4.0, 100),
        ];

        let out = stage().apply(records).unwrap();
        assert!((out[1].rating - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_invalid_uses_scale_midpoint() {
        let records = vec![
            RatingRecord::new("u1", "p1", -1.0, 100),
            RatingRecord::new("u2", "p2", 99.0, 100),
        ];

        let out = stage().apply(records).unwrap();
        assert!((out[0].rating - 2.5).abs() < 1e-12);
        assert!((out[1].rating - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_valid_ratings_untouched() {
        let records = vec![
            RatingRecord::new("u1", "p1", 0.0, 100),
            RatingRecord::new("u1", "p2", 5.0, 100),
        ];

        let out = stage().apply(records.clone()).unwrap();
        assert_eq!(out, records);
    }

    #[test]
    fn test_nan_is_invalid() {
        let records = vec![
            RatingRecord::new("u1", "p1", 4.0, 100),
            RatingRecord::new("u1", "p2", f64::NAN, 100),
        ];

        let out = stage().apply(records).unwrap();
        assert!((out[1].rating - 4.0).abs() < 1e-12);
    }
}
