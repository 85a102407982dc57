//! Popularity baseline: best-rated products over a recent window.
//!
//! ## Algorithm
//! 1. "Now" is the maximum timestamp in the dataset, never wall-clock time,
//!    so results are reproducible on frozen data
//! 2. Keep ratings within the configured window of days
//! 3. Aggregate per product: rating count and mean
//! 4. Drop products below the minimum rating count
//! 5. Rank by mean desc, count desc, product id asc

use data_loader::{ProductId, RatingDataset};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

const SECONDS_PER_DAY: i64 = 86_400;

/// Aggregated rating statistics for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStats {
    pub product_id: ProductId,
    pub avg_rating: f64,
    pub count: u32,
}

/// Ranks products by recent average rating.
pub struct PopularityRanker {
    window_days: i64,
    min_ratings: u32,
}

impl PopularityRanker {
    pub fn new() -> Self {
        Self {
            window_days: 365,
            min_ratings: 10,
        }
    }

    /// Configure the aggregation window in days (default: 365)
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    /// Configure the minimum rating count per product (default: 10)
    pub fn with_min_ratings(mut self, min: u32) -> Self {
        self.min_ratings = min;
        self
    }

    /// The top-n products of the window, best first.
    ///
    /// Deterministic for identical dataset and configuration: aggregation
    /// follows input order and the final ordering is total.
    #[instrument(skip(self, dataset))]
    pub fn top_n(&self, dataset: &RatingDataset, n: usize) -> Vec<ProductStats> {
        let now = match dataset.max_timestamp() {
            Some(ts) => ts,
            None => return Vec::new(),
        };
        let cutoff = now - self.window_days * SECONDS_PER_DAY;

        // (sum, count) per product, accumulated in input order.
        let mut agg: HashMap<&ProductId, (f64, u32)> = HashMap::new();
        for record in dataset.records() {
            if record.timestamp >= cutoff {
                let entry = agg.entry(&record.product_id).or_insert((0.0, 0));
                entry.0 += record.rating;
                entry.1 += 1;
            }
        }

        let mut stats: Vec<ProductStats> = agg
            .into_iter()
            .filter(|(_, (_, count))| *count >= self.min_ratings)
            .map(|(product, (sum, count))| ProductStats {
                product_id: product.clone(),
                avg_rating: sum / count as f64,
                count,
            })
            .collect();

        stats.sort_by(|a, b| {
            b.avg_rating
                .partial_cmp(&a.avg_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.count.cmp(&a.count))
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        stats.truncate(n);

        debug!("Ranked {} products within the window", stats.len());
        stats
    }
}

impl Default for PopularityRanker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RatingRecord;

    const DAY: i64 = SECONDS_PER_DAY;
    const NOW: i64 = 1_000_000_000;

    fn ranker() -> PopularityRanker {
        PopularityRanker::new().with_min_ratings(1)
    }

    #[test]
    fn test_window_excludes_old_ratings() {
        // One rating at "now", one 400 days earlier; a 365-day window
        // keeps only the former.
        let dataset = RatingDataset::from_records(vec![
            RatingRecord::new("u1", "fresh", 3.0, NOW),
            RatingRecord::new("u2", "stale", 5.0, NOW - 400 * DAY),
        ]);

        let top = ranker().with_window_days(365).top_n(&dataset, 10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "fresh");
    }

    #[test]
    fn test_min_ratings_filter() {
        let dataset = RatingDataset::from_records(vec![
            RatingRecord::new("u1", "popular", 4.0, NOW),
            RatingRecord::new("u2", "popular", 5.0, NOW),
            RatingRecord::new("u3", "niche", 5.0, NOW),
        ]);

        let top = ranker().with_min_ratings(2).top_n(&dataset, 10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].product_id, "popular");
        assert!((top[0].avg_rating - 4.5).abs() < 1e-12);
        assert_eq!(top[0].count, 2);
    }

    #[test]
    fn test_ordering_mean_then_count_then_id() {
        let dataset = RatingDataset::from_records(vec![
            // "a": mean 4.0 from one rating
            RatingRecord::new("u1", "a", 4.0, NOW),
            // "b": mean 4.0 from two ratings -> beats "a" on count
            RatingRecord::new("u2", "b", 4.0, NOW),
            RatingRecord::new("u3", "b", 4.0, NOW),
            // "c": mean 5.0 -> first
            RatingRecord::new("u4", "c", 5.0, NOW),
            // "aa": mean 4.0, one rating -> ties "a" fully, id breaks it
            RatingRecord::new("u5", "aa", 4.0, NOW),
        ]);

        let top = ranker().top_n(&dataset, 10);
        let ids: Vec<&str> = top.iter().map(|s| s.product_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a", "aa"]);
    }

    #[test]
    fn test_truncates_to_n() {
        let dataset = RatingDataset::from_records(vec![
            RatingRecord::new("u1", "a", 5.0, NOW),
            RatingRecord::new("u2", "b", 4.0, NOW),
            RatingRecord::new("u3", "c", 3.0, NOW),
        ]);

        let top = ranker().top_n(&dataset, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, "a");
        assert_eq!(top[1].product_id, "b");
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = RatingDataset::from_records(Vec::new());
        assert!(ranker().top_n(&dataset, 5).is_empty());
    }

    #[test]
    fn test_deterministic_across_runs() {
        let records = vec![
            RatingRecord::new("u1", "a", 4.0, NOW),
            RatingRecord::new("u2", "b", 4.0, NOW - DAY),
            RatingRecord::new("u3", "a", 3.0, NOW - 2 * DAY),
            RatingRecord::new("u4", "c", 5.0, NOW - 3 * DAY),
        ];
        let dataset = RatingDataset::from_records(records.clone());
        let again = RatingDataset::from_records(records);

        assert_eq!(
            ranker().top_n(&dataset, 10),
            ranker().top_n(&again, 10)
        );
    }
}
