//! Leave-last-out train/test split.
//!
//! For each user with more than one record, the most recent record (by
//! timestamp) is held out as test data; everything else, including all
//! records of single-interaction users, goes to train. Train and test
//! together reproduce the source dataset exactly, as multisets.

use data_loader::{RatingDataset, RatingRecord};
use std::collections::HashSet;
use tracing::info;

/// A temporally consistent train/test partition.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: RatingDataset,
    pub test: RatingDataset,
}

/// Partition a dataset leave-last-out.
///
/// When a user's maximum timestamp is shared by several records, the one
/// occurring last in input order is held out, which keeps the split
/// deterministic. Both partitions preserve the source's input order.
pub fn leave_last_out(dataset: &RatingDataset) -> Split {
    let mut held_out: HashSet<usize> = HashSet::new();

    for user_id in dataset.users() {
        let positions = dataset.user_positions(user_id);
        if positions.len() < 2 {
            continue;
        }

        // Later position wins on equal timestamps.
        let mut best = positions[0];
        for &pos in &positions[1..] {
            if dataset.records()[pos].timestamp >= dataset.records()[best].timestamp {
                best = pos;
            }
        }
        held_out.insert(best);
    }

    let mut train: Vec<RatingRecord> = Vec::with_capacity(dataset.len() - held_out.len());
    let mut test: Vec<RatingRecord> = Vec::with_capacity(held_out.len());

    for (pos, record) in dataset.records().iter().enumerate() {
        if held_out.contains(&pos) {
            test.push(record.clone());
        } else {
            train.push(record.clone());
        }
    }

    info!(
        "Leave-last-out split: {} train, {} test records",
        train.len(),
        test.len()
    );

    Split {
        train: RatingDataset::from_records(train),
        test: RatingDataset::from_records(test),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(records: Vec<RatingRecord>) -> RatingDataset {
        RatingDataset::from_records(records)
    }

    #[test]
    fn test_holds_out_latest_record_per_user() {
        let source = dataset(vec![
            RatingRecord::new("u1", "p1", 5.0, 100),
            RatingRecord::new("u1", "p2", 3.0, 200),
            RatingRecord::new("u2", "p1", 4.0, 150),
        ]);

        let split = leave_last_out(&source);

        // u2 has a single rating: stays in train.
        assert_eq!(split.test.len(), 1);
        assert_eq!(split.test.records()[0], RatingRecord::new("u1", "p2", 3.0, 200));
        assert_eq!(split.train.len(), 2);
        assert!(split.train.contains_user("u2"));
    }

    #[test]
    fn test_union_reproduces_source() {
        let source = dataset(vec![
            RatingRecord::new("u1", "p1", 5.0, 100),
            RatingRecord::new("u1", "p2", 3.0, 200),
            RatingRecord::new("u2", "p1", 4.0, 150),
            RatingRecord::new("u2", "p3", 2.0, 160),
            RatingRecord::new("u3", "p2", 1.0, 90),
        ]);

        let split = leave_last_out(&source);
        assert_eq!(split.train.len() + split.test.len(), source.len());

        let mut combined: Vec<RatingRecord> = split
            .train
            .records()
            .iter()
            .chain(split.test.records().iter())
            .cloned()
            .collect();
        let mut expected: Vec<RatingRecord> = source.records().to_vec();

        let key = |r: &RatingRecord| {
            (
                r.user_id.clone(),
                r.product_id.clone(),
                r.timestamp,
                r.rating.to_bits(),
            )
        };
        combined.sort_by_key(key);
        expected.sort_by_key(key);
        assert_eq!(combined, expected);
    }

    #[test]
    fn test_tie_on_max_timestamp_takes_last_in_input_order() {
        let source = dataset(vec![
            RatingRecord::new("u1", "p1", 5.0, 300),
            RatingRecord::new("u1", "p2", 3.0, 300),
            RatingRecord::new("u1", "p3", 4.0, 100),
        ]);

        let split = leave_last_out(&source);
        assert_eq!(split.test.records()[0].product_id, "p2");
        assert_eq!(split.train.len(), 2);
    }

    #[test]
    fn test_single_rating_users_never_in_test() {
        let source = dataset(vec![
            RatingRecord::new("u1", "p1", 5.0, 100),
            RatingRecord::new("u2", "p2", 4.0, 200),
        ]);

        let split = leave_last_out(&source);
        assert!(split.test.is_empty());
        assert_eq!(split.train.len(), 2);
    }
}
