//! Dataset-to-matrix preprocessing for the latent-factor model.
//!
//! Maps opaque string IDs onto dense indices (assignment order follows the
//! record order, so it is deterministic) and normalizes timestamps into
//! [0, 1] over the train set's time span.

use data_loader::{ProductId, RatingDataset, UserId};
use pipeline::normalize_time;
use std::collections::HashMap;

/// One train-set record in model coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Interaction {
    pub user: usize,
    pub item: usize,
    pub rating: f64,
    /// Normalized time in [0, 1].
    pub time: f64,
}

/// The model's view of a prepared train set.
#[derive(Debug)]
pub struct ModelInput {
    pub interactions: Vec<Interaction>,
    pub user_map: HashMap<UserId, usize>,
    pub item_map: HashMap<ProductId, usize>,
    /// Time span the normalization was computed over; prediction times are
    /// normalized against the same span.
    pub t_min: i64,
    pub t_max: i64,
}

/// Convert a prepared dataset into dense model input.
pub fn preprocess(dataset: &RatingDataset) -> ModelInput {
    let t_min = dataset.min_timestamp().unwrap_or(0);
    let t_max = dataset.max_timestamp().unwrap_or(0);

    let mut user_map: HashMap<UserId, usize> = HashMap::new();
    let mut item_map: HashMap<ProductId, usize> = HashMap::new();
    let mut interactions = Vec::with_capacity(dataset.len());

    for record in dataset.records() {
        let next_user = user_map.len();
        let user = *user_map
            .entry(record.user_id.clone())
            .or_insert(next_user);
        let next_item = item_map.len();
        let item = *item_map
            .entry(record.product_id.clone())
            .or_insert(next_item);

        interactions.push(Interaction {
            user,
            item,
            rating: record.rating,
            time: normalize_time(record.timestamp, t_min, t_max),
        });
    }

    ModelInput {
        interactions,
        user_map,
        item_map,
        t_min,
        t_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RatingRecord;

    fn dataset() -> RatingDataset {
        RatingDataset::from_records(vec![
            RatingRecord::new("u1", "p1", 5.0, 100),
            RatingRecord::new("u2", "p1", 4.0, 150),
            RatingRecord::new("u1", "p2", 3.0, 200),
        ])
    }

    #[test]
    fn test_indices_follow_first_appearance() {
        let input = preprocess(&dataset());

        assert_eq!(input.user_map["u1"], 0);
        assert_eq!(input.user_map["u2"], 1);
        assert_eq!(input.item_map["p1"], 0);
        assert_eq!(input.item_map["p2"], 1);
        assert_eq!(input.interactions.len(), 3);
        assert_eq!(input.interactions[1].user, 1);
        assert_eq!(input.interactions[2].item, 1);
    }

    #[test]
    fn test_time_normalization_spans_dataset() {
        let input = preprocess(&dataset());

        assert_eq!(input.t_min, 100);
        assert_eq!(input.t_max, 200);
        assert_eq!(input.interactions[0].time, 0.0);
        assert!((input.interactions[1].time - 0.5).abs() < 1e-12);
        assert_eq!(input.interactions[2].time, 1.0);
    }

    #[test]
    fn test_single_timestamp_normalizes_to_zero() {
        let dataset = RatingDataset::from_records(vec![
            RatingRecord::new("u1", "p1", 5.0, 100),
            RatingRecord::new("u2", "p1", 4.0, 100),
        ]);
        let input = preprocess(&dataset);

        assert!(input.interactions.iter().all(|i| i.time == 0.0));
    }

    #[test]
    fn test_deterministic_mapping() {
        let a = preprocess(&dataset());
        let b = preprocess(&dataset());
        assert_eq!(a.user_map, b.user_map);
        assert_eq!(a.item_map, b.item_map);
    }
}
