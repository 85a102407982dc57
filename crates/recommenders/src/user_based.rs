//! User-based collaborative filtering.
//!
//! "Users who rate like you rated this highly."
//!
//! ## Algorithm
//! 1. Build a mean-centered rating vector per user (adaptive normalization:
//!    each user's own mean is subtracted, so harsh and generous raters
//!    become comparable)
//! 2. Score every other user by cosine similarity over the co-rated products
//! 3. Keep the top-K positively similar users as neighbors
//! 4. Predict = target mean + similarity-weighted average of the neighbors'
//!    centered ratings
//!
//! With time decay enabled, each rating is additionally weighted by
//! `exp(-lambda * age)` relative to the most recent rating in the train set,
//! both when comparing users and when averaging neighbor ratings.

use crate::similarity::cosine_similarity;
use data_loader::{Prediction, ProductId, RatingDataset, UserId};
use rayon::prelude::*;
use std::collections::HashMap;
use std::f64::consts::LN_2;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Exponential down-weighting of old ratings.
#[derive(Debug, Clone, Copy)]
pub struct TimeDecay {
    /// Per-second decay constant.
    lambda: f64,
}

impl TimeDecay {
    /// Decay parameterized as a half-life: a rating `days` old weighs 0.5.
    pub fn with_half_life_days(days: f64) -> Self {
        Self {
            lambda: LN_2 / (days * 86_400.0),
        }
    }

    /// Weight of a rating `age_seconds` old; 1.0 at age zero.
    pub fn weight(&self, age_seconds: i64) -> f64 {
        (-self.lambda * age_seconds.max(0) as f64).exp()
    }
}

/// One user's mean-centered rating vector.
struct UserVector {
    mean: f64,
    /// product -> (centered rating, timestamp)
    entries: HashMap<ProductId, (f64, i64)>,
}

/// Similarity scores of one target user against the rest of the train set.
///
/// Built lazily per query and discarded afterwards; holds only positively
/// similar users, ordered by similarity descending then user id for a
/// stable tie-break. Never persisted; a new dataset means a new cache.
pub struct SimilarityCache {
    scores: Vec<(UserId, f64)>,
}

impl SimilarityCache {
    /// The K most similar users.
    pub fn top_k(&self, k: usize) -> &[(UserId, f64)] {
        &self.scores[..self.scores.len().min(k)]
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Nearest-neighbor rating prediction over a prepared train set.
pub struct SimilarityEngine {
    dataset: Arc<RatingDataset>,
    neighbor_count: usize,
    decay: Option<TimeDecay>,
    min_rating: f64,
    max_rating: f64,

    /// Mean-centered vectors, one per train-set user. Derived from the
    /// dataset at construction; valid for the dataset's lifetime.
    vectors: HashMap<UserId, UserVector>,
    /// Most recent timestamp in the train set; decay ages are measured
    /// against this, never wall-clock time.
    max_timestamp: i64,
}

impl SimilarityEngine {
    /// Build an engine over a prepared train set.
    pub fn new(dataset: Arc<RatingDataset>) -> Self {
        let mut vectors: HashMap<UserId, UserVector> = HashMap::new();

        for user_id in dataset.users() {
            // Deduplicate repeated ratings of the same product: the
            // last-occurring record wins, as in the profile map.
            let mut raw: HashMap<ProductId, (f64, i64)> = HashMap::new();
            for record in dataset.user_records(user_id) {
                raw.insert(record.product_id.clone(), (record.rating, record.timestamp));
            }

            let mean =
                raw.values().map(|(r, _)| *r).sum::<f64>() / raw.len() as f64;
            let entries = raw
                .into_iter()
                .map(|(product, (rating, ts))| (product, (rating - mean, ts)))
                .collect();

            vectors.insert(user_id.clone(), UserVector { mean, entries });
        }

        Self {
            dataset: Arc::clone(&dataset),
            neighbor_count: 5,
            decay: None,
            min_rating: 0.0,
            max_rating: 5.0,
            max_timestamp: dataset.max_timestamp().unwrap_or(0),
            vectors,
        }
    }

    /// Configure the neighbor count K (default: 5)
    pub fn with_neighbor_count(mut self, k: usize) -> Self {
        self.neighbor_count = k;
        self
    }

    /// Enable exponential time decay of rating influence
    pub fn with_decay(mut self, decay: TimeDecay) -> Self {
        self.decay = Some(decay);
        self
    }

    /// Configure the rating scale used to clamp ranked predictions
    /// (default: 0-5)
    pub fn with_rating_range(mut self, min: f64, max: f64) -> Self {
        self.min_rating = min;
        self.max_rating = max;
        self
    }

    fn weight(&self, timestamp: i64) -> f64 {
        match &self.decay {
            Some(decay) => decay.weight(self.max_timestamp - timestamp),
            None => 1.0,
        }
    }

    /// A user's centered vector with decay weights applied.
    fn weighted_vector(&self, user_id: &str) -> Option<HashMap<ProductId, f64>> {
        let vector = self.vectors.get(user_id)?;
        Some(
            vector
                .entries
                .iter()
                .map(|(product, &(centered, ts))| {
                    (product.clone(), centered * self.weight(ts))
                })
                .collect(),
        )
    }

    /// Similarity between two users; 0.0 when either is unknown or they
    /// share no co-rated products.
    pub fn user_similarity(&self, a: &str, b: &str) -> f64 {
        match (self.weighted_vector(a), self.weighted_vector(b)) {
            (Some(va), Some(vb)) => cosine_similarity(&va, &vb),
            _ => 0.0,
        }
    }

    /// Compute the per-query similarity cache for a target user.
    ///
    /// Scores every other train-set user in parallel; candidate order is
    /// fixed up front and the final sort is total, so the result is
    /// deterministic.
    pub fn similarities(&self, user_id: &str) -> SimilarityCache {
        let target = match self.weighted_vector(user_id) {
            Some(v) => v,
            None => return SimilarityCache { scores: Vec::new() },
        };

        let mut candidates: Vec<&UserId> = self
            .vectors
            .keys()
            .filter(|other| other.as_str() != user_id)
            .collect();
        candidates.sort_unstable();

        let mut scores: Vec<(UserId, f64)> = candidates
            .par_iter()
            .filter_map(|other| {
                let vector = self.weighted_vector(other.as_str())?;
                let sim = cosine_similarity(&target, &vector);
                (sim > 0.0).then(|| ((*other).clone(), sim))
            })
            .collect();

        scores.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        SimilarityCache { scores }
    }

    /// Predict a single user-product rating.
    ///
    /// Cold-start ladder: an unseen user gets the train set's global mean;
    /// a user whose neighbors never rated the product gets the user's own
    /// mean.
    pub fn predict(&self, user_id: &str, product_id: &str) -> f64 {
        let vector = match self.vectors.get(user_id) {
            Some(v) => v,
            None => return self.dataset.global_mean(),
        };

        let cache = self.similarities(user_id);
        let mut score = 0.0;
        let mut sim_sum = 0.0;

        for (neighbor, sim) in cache.top_k(self.neighbor_count) {
            let neighbor_vector = &self.vectors[neighbor];
            if let Some(&(centered, ts)) = neighbor_vector.entries.get(product_id) {
                let weight = self.weight(ts);
                score += sim * centered * weight;
                sim_sum += sim.abs() * weight;
            }
        }

        if sim_sum > 0.0 {
            vector.mean + score / sim_sum
        } else {
            vector.mean
        }
    }

    /// Rank the products the user has not rated, best first.
    ///
    /// Ties are broken by product id ascending; predictions are clamped to
    /// the configured rating scale. Returns an empty list when the user has
    /// no positively similar neighbors.
    #[instrument(skip(self))]
    pub fn top_n(&self, user_id: &str, n: usize) -> Vec<Prediction> {
        let vector = match self.vectors.get(user_id) {
            Some(v) => v,
            None => {
                warn!("User {} not in train set, no ranking possible", user_id);
                return Vec::new();
            }
        };

        let cache = self.similarities(user_id);
        if cache.is_empty() {
            warn!("User {} has no similar users in the train set", user_id);
            return Vec::new();
        }

        let mut scores: HashMap<&ProductId, f64> = HashMap::new();
        let mut sim_sums: HashMap<&ProductId, f64> = HashMap::new();

        for (neighbor, sim) in cache.top_k(self.neighbor_count) {
            let neighbor_vector = &self.vectors[neighbor];
            for (product, &(centered, ts)) in &neighbor_vector.entries {
                if vector.entries.contains_key(product) {
                    continue;
                }
                let weight = self.weight(ts);
                *scores.entry(product).or_insert(0.0) += sim * centered * weight;
                *sim_sums.entry(product).or_insert(0.0) += sim.abs() * weight;
            }
        }

        let mut predictions: Vec<Prediction> = scores
            .into_iter()
            .filter(|(product, _)| sim_sums[*product] > 0.0)
            .map(|(product, score)| Prediction {
                product_id: product.clone(),
                predicted_rating: (vector.mean + score / sim_sums[product])
                    .clamp(self.min_rating, self.max_rating),
            })
            .collect();

        predictions.sort_by(|a, b| {
            b.predicted_rating
                .partial_cmp(&a.predicted_rating)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        predictions.truncate(n);

        debug!("Ranked {} candidate products", predictions.len());
        predictions
    }
}
