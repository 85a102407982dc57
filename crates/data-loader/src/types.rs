//! Core domain types for the ratings dataset.
//!
//! This module defines the fundamental data structures used throughout the
//! system:
//! - Type aliases for domain clarity (UserId, ProductId)
//! - RatingRecord, the immutable unit of input
//! - RatingDataset, the in-memory collection with derived indices
//! - UserProfile, a per-user view rebuilt from a dataset

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// =============================================================================
// Type Aliases
// =============================================================================
// IDs arrive as opaque strings from the ratings file; keeping them as aliases
// prevents mixing up user IDs with product IDs in signatures.

/// Unique identifier for a user.
pub type UserId = String;

/// Unique identifier for a product.
pub type ProductId = String;

// =============================================================================
// Rating Record
// =============================================================================

/// A single user-product rating.
///
/// `timestamp` is unix seconds; values <= 0 mean "invalid, to be repaired
/// during preparation". Records are immutable once constructed; cleaning
/// produces new records rather than patching these in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub rating: f64,
    pub timestamp: i64,
}

impl RatingRecord {
    pub fn new(
        user_id: impl Into<UserId>,
        product_id: impl Into<ProductId>,
        rating: f64,
        timestamp: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            product_id: product_id.into(),
            rating,
            timestamp,
        }
    }
}

/// A single scored recommendation, the output unit of every per-user
/// strategy: a product and its predicted rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub product_id: ProductId,
    pub predicted_rating: f64,
}

// =============================================================================
// RatingDataset - The Core In-Memory Collection
// =============================================================================

/// Ordered sequence of rating records plus derived indices.
///
/// Built once from a record list and immutable afterwards; every view derived
/// from it (profiles, similarity tables, model inputs) stays valid for the
/// dataset's lifetime. Indices hold positions into `records`, preserving the
/// original input order within each user and product.
#[derive(Debug, Clone)]
pub struct RatingDataset {
    records: Vec<RatingRecord>,

    /// Positions of each user's records, in input order.
    user_index: HashMap<UserId, Vec<usize>>,
    /// Positions of each product's records, in input order.
    product_index: HashMap<ProductId, Vec<usize>>,

    /// Smallest timestamp > 0 in the dataset, if any.
    min_timestamp: Option<i64>,
    /// Largest timestamp > 0 in the dataset, if any.
    max_timestamp: Option<i64>,
    /// Mean of all ratings (0.0 for an empty dataset).
    global_mean: f64,
}

impl RatingDataset {
    /// Build a dataset and its indices from a record list.
    pub fn from_records(records: Vec<RatingRecord>) -> Self {
        let mut user_index: HashMap<UserId, Vec<usize>> = HashMap::new();
        let mut product_index: HashMap<ProductId, Vec<usize>> = HashMap::new();
        let mut min_timestamp = None;
        let mut max_timestamp = None;
        let mut rating_sum = 0.0;

        for (pos, record) in records.iter().enumerate() {
            user_index
                .entry(record.user_id.clone())
                .or_default()
                .push(pos);
            product_index
                .entry(record.product_id.clone())
                .or_default()
                .push(pos);

            if record.timestamp > 0 {
                min_timestamp = Some(match min_timestamp {
                    Some(ts) if ts <= record.timestamp => ts,
                    _ => record.timestamp,
                });
                max_timestamp = Some(match max_timestamp {
                    Some(ts) if ts >= record.timestamp => ts,
                    _ => record.timestamp,
                });
            }
            rating_sum += record.rating;
        }

        let global_mean = if records.is_empty() {
            0.0
        } else {
            rating_sum / records.len() as f64
        };

        Self {
            records,
            user_index,
            product_index,
            min_timestamp,
            max_timestamp,
            global_mean,
        }
    }

    /// All records, in input order.
    pub fn records(&self) -> &[RatingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Positions of a user's records in input order; empty for unknown users.
    pub fn user_positions(&self, user_id: &str) -> &[usize] {
        self.user_index
            .get(user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Positions of a product's records in input order.
    pub fn product_positions(&self, product_id: &str) -> &[usize] {
        self.product_index
            .get(product_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// A user's records, in input order.
    pub fn user_records(&self, user_id: &str) -> Vec<&RatingRecord> {
        self.user_positions(user_id)
            .iter()
            .map(|&pos| &self.records[pos])
            .collect()
    }

    /// A product's records, in input order.
    pub fn product_records(&self, product_id: &str) -> Vec<&RatingRecord> {
        self.product_positions(product_id)
            .iter()
            .map(|&pos| &self.records[pos])
            .collect()
    }

    pub fn contains_user(&self, user_id: &str) -> bool {
        self.user_index.contains_key(user_id)
    }

    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.user_index.keys()
    }

    pub fn products(&self) -> impl Iterator<Item = &ProductId> {
        self.product_index.keys()
    }

    /// Smallest positive timestamp, if the dataset has one.
    pub fn min_timestamp(&self) -> Option<i64> {
        self.min_timestamp
    }

    /// Largest positive timestamp, if the dataset has one.
    pub fn max_timestamp(&self) -> Option<i64> {
        self.max_timestamp
    }

    /// Mean of all ratings; 0.0 for an empty dataset.
    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// Counts for logging/validation: (users, products, ratings).
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.user_index.len(),
            self.product_index.len(),
            self.records.len(),
        )
    }
}

// =============================================================================
// UserProfile - Derived Per-User View
// =============================================================================

/// Per-user summary rebuilt from a dataset: mean rating and the set of rated
/// products. Used for imputation checks and "exclude already rated" filtering.
/// Must be recomputed if built against a different dataset.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user_id: UserId,
    pub mean_rating: f64,
    pub rated: HashSet<ProductId>,
}

impl UserProfile {
    /// Build the profile for `user_id`, or None if the dataset has no records
    /// for that user.
    pub fn build(dataset: &RatingDataset, user_id: &str) -> Option<Self> {
        let records = dataset.user_records(user_id);
        if records.is_empty() {
            return None;
        }

        let sum: f64 = records.iter().map(|r| r.rating).sum();
        let rated: HashSet<ProductId> =
            records.iter().map(|r| r.product_id.clone()).collect();

        Some(Self {
            user_id: user_id.to_string(),
            mean_rating: sum / records.len() as f64,
            rated,
        })
    }

    pub fn has_rated(&self, product_id: &str) -> bool {
        self.rated.contains(product_id)
    }
}
