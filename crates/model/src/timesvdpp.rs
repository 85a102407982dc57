//! Temporal latent-factor model, TimeSVD++ style.
//!
//! Predicts `r̂(u,i,t) = μ + b_u + α_u·dev_u(t) + b_i + q_i · (p_u + Σy/√N_u)`:
//! global mean, static user/item biases, a user bias drifting linearly with
//! the deviation of the (normalized) rating time from the user's mean rating
//! time, and a latent dot product enriched with implicit "has rated"
//! feedback factors.
//!
//! Training is plain SGD: per epoch, visit the train records in a freshly
//! shuffled order and nudge every touched parameter along the prediction
//! error, L2-regularized. All randomness (initialization, shuffling) comes
//! from one seeded generator, so identical config and input reproduce the
//! exact training trajectory.
//!
//! Only `TimeSvdPpTrainer::train` can produce a `TimeSvdPp`, so an
//! untrained model cannot be asked to predict.

use crate::error::{ModelError, Result};
use crate::preprocess::{Interaction, ModelInput, preprocess};
use data_loader::{Prediction, ProductId, RatingDataset, UserId};
use pipeline::normalize_time;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use tracing::info;

/// Magnitude of the uniform latent-factor initialization.
const INIT_SCALE: f64 = 0.01;
/// Per-sample prediction errors are clipped to this magnitude before any
/// parameter update.
const ERROR_CLIP: f64 = 5.0;

/// Hyperparameters for training.
#[derive(Debug, Clone, Copy)]
pub struct ModelConfig {
    /// Latent dimensionality k.
    pub factors: usize,
    /// Hard cap on training epochs; training always terminates here even
    /// without convergence.
    pub epochs: usize,
    pub learning_rate: f64,
    pub regularization: f64,
    /// Stop early when the epoch-over-epoch train RMSE decrease falls
    /// below this.
    pub convergence_threshold: f64,
    /// Seed for initialization and epoch shuffling.
    pub seed: u64,
    /// Rating scale used to clamp ranked predictions.
    pub min_rating: f64,
    pub max_rating: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            factors: 10,
            epochs: 50,
            learning_rate: 0.01,
            regularization: 0.05,
            convergence_threshold: 1e-4,
            seed: 42,
            min_rating: 0.0,
            max_rating: 5.0,
        }
    }
}

/// Builds trained models from prepared train sets.
pub struct TimeSvdPpTrainer {
    config: ModelConfig,
}

impl TimeSvdPpTrainer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Train on a prepared train set.
    pub fn train(&self, train: &RatingDataset) -> Result<TimeSvdPp> {
        self.train_with_holdout(train, None)
    }

    /// Train, additionally reporting holdout RMSE per epoch when a test
    /// set is supplied. The holdout never influences the learned
    /// parameters or the stopping decision.
    pub fn train_with_holdout(
        &self,
        train: &RatingDataset,
        holdout: Option<&RatingDataset>,
    ) -> Result<TimeSvdPp> {
        if train.is_empty() {
            return Err(ModelError::EmptyTrainSet);
        }

        let input = preprocess(train);
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut model = TimeSvdPp::init(&self.config, &input, &mut rng);

        let lr = self.config.learning_rate;
        let reg = self.config.regularization;
        let mut order: Vec<usize> = (0..input.interactions.len()).collect();
        let mut prev_rmse: Option<f64> = None;

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);

            for &idx in &order {
                let Interaction {
                    user: u,
                    item: i,
                    rating,
                    time: t,
                } = input.interactions[idx];

                let dev = t - model.user_mean_time[u];
                let sum_y = model.implicit_sum(u);
                let pred = model.mu
                    + model.bu[u]
                    + model.alpha_u[u] * dev
                    + model.bi[i]
                    + dot_with_implicit(&model.q[i], &model.p[u], &sum_y);

                let err = rating - pred;
                if !err.is_finite() {
                    return Err(ModelError::Diverged { epoch: epoch + 1 });
                }
                let err = err.clamp(-ERROR_CLIP, ERROR_CLIP);

                // Every right-hand side reads the parameters as they were
                // before this sample's updates.
                let bu = model.bu[u];
                model.bu[u] = bu + lr * (err - reg * bu);
                let bi = model.bi[i];
                model.bi[i] = bi + lr * (err - reg * bi);
                let alpha = model.alpha_u[u];
                model.alpha_u[u] = alpha + lr * (err * dev - reg * alpha);
                for f in 0..model.factors {
                    let pf = model.p[u][f];
                    let qf = model.q[i][f];
                    model.p[u][f] = pf + lr * (err * qf - reg * pf);
                    model.q[i][f] = qf + lr * (err * (pf + sum_y[f]) - reg * qf);
                }

                let norm = model.sqrt_n_u[u];
                let shrink = 1.0 - lr * reg;
                for item_pos in 0..model.user_items[u].len() {
                    let j = model.user_items[u][item_pos];
                    for f in 0..model.factors {
                        let grad = err * model.q[i][f] / norm;
                        model.y[j][f] = (model.y[j][f] + lr * grad) * shrink;
                    }
                }
            }

            let train_rmse = model.rmse_indexed(&input.interactions);
            match holdout {
                Some(test) if !test.is_empty() => {
                    let test_rmse = model.evaluate(test);
                    info!(
                        "Epoch {}: train RMSE {:.4}, test RMSE {:.4}",
                        epoch + 1,
                        train_rmse,
                        test_rmse
                    );
                }
                _ => info!("Epoch {}: train RMSE {:.4}", epoch + 1, train_rmse),
            }
            model.epochs_trained = epoch + 1;

            if let Some(prev) = prev_rmse {
                if prev - train_rmse < self.config.convergence_threshold {
                    info!(
                        "Converged after {} epochs (RMSE delta {:.6})",
                        epoch + 1,
                        prev - train_rmse
                    );
                    break;
                }
            }
            prev_rmse = Some(train_rmse);
        }

        Ok(model)
    }
}

/// A trained temporal latent-factor model. Immutable after training; safe
/// to share for concurrent read-only prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSvdPp {
    factors: usize,
    seed: u64,
    min_rating: f64,
    max_rating: f64,

    /// Global mean rating of the train set.
    mu: f64,
    /// Static per-user bias.
    bu: Vec<f64>,
    /// Static per-item bias.
    bi: Vec<f64>,
    /// Per-user bias drift over normalized time.
    alpha_u: Vec<f64>,
    /// User latent factors, one row per user.
    p: Vec<Vec<f64>>,
    /// Item latent factors, one row per item.
    q: Vec<Vec<f64>>,
    /// Implicit-feedback factors, one row per item.
    y: Vec<Vec<f64>>,

    /// Items each user rated in train (implicit feedback + rated-filter).
    user_items: Vec<Vec<usize>>,
    /// `sqrt(|N(u)|)` normalization per user.
    sqrt_n_u: Vec<f64>,
    /// Mean normalized rating time per user.
    user_mean_time: Vec<f64>,

    user_map: HashMap<UserId, usize>,
    item_map: HashMap<ProductId, usize>,
    t_min: i64,
    t_max: i64,

    /// Epochs actually run before the cap or convergence ended training.
    epochs_trained: usize,
}

impl TimeSvdPp {
    /// Zero biases, small random factors, and the per-user aggregates the
    /// update rules need.
    fn init(config: &ModelConfig, input: &ModelInput, rng: &mut StdRng) -> Self {
        let n_users = input.user_map.len();
        let n_items = input.item_map.len();
        let n = input.interactions.len() as f64;

        let mu = input.interactions.iter().map(|i| i.rating).sum::<f64>() / n;

        let mut user_items: Vec<Vec<usize>> = vec![Vec::new(); n_users];
        let mut time_sums = vec![0.0; n_users];
        for inter in &input.interactions {
            user_items[inter.user].push(inter.item);
            time_sums[inter.user] += inter.time;
        }
        let sqrt_n_u: Vec<f64> = user_items
            .iter()
            .map(|items| {
                if items.is_empty() {
                    1.0
                } else {
                    (items.len() as f64).sqrt()
                }
            })
            .collect();
        let user_mean_time: Vec<f64> = user_items
            .iter()
            .zip(&time_sums)
            .map(|(items, sum)| {
                if items.is_empty() {
                    0.0
                } else {
                    sum / items.len() as f64
                }
            })
            .collect();

        let mut factor_rows = |rows: usize| -> Vec<Vec<f64>> {
            (0..rows)
                .map(|_| {
                    (0..config.factors)
                        .map(|_| rng.random_range(-INIT_SCALE..INIT_SCALE))
                        .collect()
                })
                .collect()
        };
        let p = factor_rows(n_users);
        let q = factor_rows(n_items);
        let y = factor_rows(n_items);

        Self {
            factors: config.factors,
            seed: config.seed,
            min_rating: config.min_rating,
            max_rating: config.max_rating,
            mu,
            bu: vec![0.0; n_users],
            bi: vec![0.0; n_items],
            alpha_u: vec![0.0; n_users],
            p,
            q,
            y,
            user_items,
            sqrt_n_u,
            user_mean_time,
            user_map: input.user_map.clone(),
            item_map: input.item_map.clone(),
            t_min: input.t_min,
            t_max: input.t_max,
            epochs_trained: 0,
        }
    }

    /// Normalized implicit-feedback vector `Σ y_j / sqrt(|N(u)|)`.
    fn implicit_sum(&self, user: usize) -> Vec<f64> {
        let mut sum = vec![0.0; self.factors];
        let items = &self.user_items[user];
        if items.is_empty() {
            return sum;
        }
        for &j in items {
            for f in 0..self.factors {
                sum[f] += self.y[j][f];
            }
        }
        let norm = self.sqrt_n_u[user];
        for v in &mut sum {
            *v /= norm;
        }
        sum
    }

    /// Prediction in model coordinates, with the cold-start ladder:
    /// unknown user and item -> μ, one unknown side -> μ plus the known
    /// side's bias.
    fn predict_indexed(&self, user: Option<usize>, item: Option<usize>, t: f64) -> f64 {
        match (user, item) {
            (None, None) => self.mu,
            (None, Some(i)) => self.mu + self.bi[i],
            (Some(u), None) => self.mu + self.bu[u],
            (Some(u), Some(i)) => {
                let dev = t - self.user_mean_time[u];
                let sum_y = self.implicit_sum(u);
                self.mu
                    + self.bu[u]
                    + self.alpha_u[u] * dev
                    + self.bi[i]
                    + dot_with_implicit(&self.q[i], &self.p[u], &sum_y)
            }
        }
    }

    /// Predict the rating of `user_id` for `product_id` at `timestamp`
    /// (unix seconds; normalized against the train set's time span).
    pub fn predict(&self, user_id: &str, product_id: &str, timestamp: i64) -> f64 {
        let t = normalize_time(timestamp, self.t_min, self.t_max);
        self.predict_indexed(
            self.user_map.get(user_id).copied(),
            self.item_map.get(product_id).copied(),
            t,
        )
    }

    /// Rank every item known to the model for a user, best first.
    ///
    /// Ties break by product id ascending; predictions are clamped to the
    /// configured rating scale. Unknown users degrade to item-bias
    /// ordering via the cold-start ladder.
    pub fn recommend(
        &self,
        user_id: &str,
        timestamp: i64,
        exclude_rated: bool,
        n: usize,
    ) -> Vec<Prediction> {
        let t = normalize_time(timestamp, self.t_min, self.t_max);
        let user = self.user_map.get(user_id).copied();

        let rated: HashSet<usize> = match (exclude_rated, user) {
            (true, Some(u)) => self.user_items[u].iter().copied().collect(),
            _ => HashSet::new(),
        };

        let mut predictions: Vec<Prediction> = self
            .item_map
            .iter()
            .filter(|(_, item)| !rated.contains(item))
            .map(|(product, &item)| Prediction {
                product_id: product.clone(),
                predicted_rating: self
                    .predict_indexed(user, Some(item), t)
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
        predictions
    }

    /// RMSE over a dataset of raw records.
    pub fn evaluate(&self, dataset: &RatingDataset) -> f64 {
        if dataset.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = dataset
            .records()
            .iter()
            .map(|r| {
                let err = r.rating - self.predict(&r.user_id, &r.product_id, r.timestamp);
                err * err
            })
            .sum();
        (sum_sq / dataset.len() as f64).sqrt()
    }

    /// RMSE over already-indexed interactions (training-internal).
    fn rmse_indexed(&self, interactions: &[Interaction]) -> f64 {
        let sum_sq: f64 = interactions
            .iter()
            .map(|inter| {
                let err = inter.rating
                    - self.predict_indexed(Some(inter.user), Some(inter.item), inter.time);
                err * err
            })
            .sum();
        (sum_sq / interactions.len() as f64).sqrt()
    }

    pub fn global_mean(&self) -> f64 {
        self.mu
    }

    pub fn factors(&self) -> usize {
        self.factors
    }

    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    pub fn n_users(&self) -> usize {
        self.user_map.len()
    }

    pub fn n_items(&self) -> usize {
        self.item_map.len()
    }

    pub fn knows_user(&self, user_id: &str) -> bool {
        self.user_map.contains_key(user_id)
    }

    // -------------------------------------------------------------------
    // Persistence: all parameter tensors plus dimensionality and seed.
    // The storage medium is the caller's concern.
    // -------------------------------------------------------------------

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

fn dot_with_implicit(q: &[f64], p: &[f64], sum_y: &[f64]) -> f64 {
    q.iter()
        .zip(p.iter().zip(sum_y))
        .map(|(qf, (pf, yf))| qf * (pf + yf))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::RatingRecord;

    /// Four users with a shared, strong item signal: "good" is always 5.0,
    /// "bad" is always 1.0, "mid" varies.
    fn patterned_dataset() -> RatingDataset {
        let mut records = Vec::new();
        for (idx, user) in ["u1", "u2", "u3", "u4"].iter().enumerate() {
            let base = 1_000 + idx as i64 * 100;
            records.push(RatingRecord::new(*user, "good", 5.0, base));
            records.push(RatingRecord::new(*user, "bad", 1.0, base + 10));
            records.push(RatingRecord::new(
                *user,
                "mid",
                2.0 + idx as f64 / 2.0,
                base + 20,
            ));
        }
        RatingDataset::from_records(records)
    }

    fn quick_config() -> ModelConfig {
        ModelConfig {
            epochs: 30,
            convergence_threshold: 0.0,
            ..ModelConfig::default()
        }
    }

    #[test]
    fn test_empty_train_set_is_fatal() {
        let trainer = TimeSvdPpTrainer::new(ModelConfig::default());
        let result = trainer.train(&RatingDataset::from_records(Vec::new()));
        assert!(matches!(result, Err(ModelError::EmptyTrainSet)));
    }

    #[test]
    fn test_training_respects_epoch_cap() {
        let config = ModelConfig {
            epochs: 1,
            ..ModelConfig::default()
        };
        let model = TimeSvdPpTrainer::new(config)
            .train(&patterned_dataset())
            .unwrap();
        assert_eq!(model.epochs_trained(), 1);
    }

    #[test]
    fn test_early_stop_on_convergence() {
        // An infinite threshold converges at the first possible check,
        // which needs two epochs of RMSE.
        let config = ModelConfig {
            epochs: 50,
            convergence_threshold: f64::INFINITY,
            ..ModelConfig::default()
        };
        let model = TimeSvdPpTrainer::new(config)
            .train(&patterned_dataset())
            .unwrap();
        assert_eq!(model.epochs_trained(), 2);
    }

    #[test]
    fn test_learns_item_quality() {
        let model = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();

        let now = 2_000;
        assert!(model.predict("u1", "good", now) > model.predict("u1", "bad", now));
        // The item bias alone carries the signal for an unseen user.
        assert!(model.predict("ghost", "good", now) > model.predict("ghost", "bad", now));
    }

    #[test]
    fn test_cold_start_ladder() {
        let model = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();

        // Unknown user and unknown item: exactly the global mean.
        assert_eq!(
            model.predict("ghost", "unknown-product", 2_000),
            model.global_mean()
        );
        // One known side still contributes its bias.
        assert_ne!(
            model.predict("ghost", "good", 2_000),
            model.global_mean()
        );
        assert_ne!(
            model.predict("u1", "unknown-product", 2_000),
            model.global_mean()
        );
    }

    #[test]
    fn test_same_seed_reproduces_training() {
        let a = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();
        let b = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();

        for (user, product) in [("u1", "good"), ("u2", "mid"), ("u3", "bad")] {
            assert_eq!(a.predict(user, product, 1_500), b.predict(user, product, 1_500));
        }
    }

    #[test]
    fn test_different_seed_changes_factors() {
        let a = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();
        let b = TimeSvdPpTrainer::new(ModelConfig {
            seed: 7,
            ..quick_config()
        })
        .train(&patterned_dataset())
        .unwrap();

        let same = [("u1", "good"), ("u2", "mid"), ("u3", "bad")]
            .iter()
            .all(|(u, p)| a.predict(u, p, 1_500) == b.predict(u, p, 1_500));
        assert!(!same);
    }

    #[test]
    fn test_recommend_excludes_rated() {
        let model = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();

        let with_rated = model.recommend("u1", 2_000, false, 10);
        assert_eq!(with_rated.len(), 3);

        // u1 rated everything in this dataset.
        let without_rated = model.recommend("u1", 2_000, true, 10);
        assert!(without_rated.is_empty());
    }

    #[test]
    fn test_recommend_ranks_and_clamps() {
        let model = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();

        let ranked = model.recommend("u1", 2_000, false, 10);
        for window in ranked.windows(2) {
            assert!(window[0].predicted_rating >= window[1].predicted_rating);
        }
        for prediction in &ranked {
            assert!(prediction.predicted_rating >= 0.0);
            assert!(prediction.predicted_rating <= 5.0);
        }
        assert_eq!(ranked[0].product_id, "good");

        let truncated = model.recommend("u1", 2_000, false, 1);
        assert_eq!(truncated.len(), 1);
    }

    #[test]
    fn test_persistence_round_trip() {
        let model = TimeSvdPpTrainer::new(quick_config())
            .train(&patterned_dataset())
            .unwrap();

        let mut buffer = Vec::new();
        model.to_writer(&mut buffer).unwrap();
        let restored = TimeSvdPp::from_reader(buffer.as_slice()).unwrap();

        assert_eq!(restored.factors(), model.factors());
        assert_eq!(restored.n_users(), model.n_users());
        assert_eq!(restored.n_items(), model.n_items());
        for (user, product) in [("u1", "good"), ("u4", "mid"), ("ghost", "bad")] {
            assert_eq!(
                model.predict(user, product, 1_500),
                restored.predict(user, product, 1_500)
            );
        }
    }

    #[test]
    fn test_runaway_learning_rate_is_diverged_not_panic() {
        let config = ModelConfig {
            learning_rate: 1e12,
            epochs: 50,
            convergence_threshold: 0.0,
            ..ModelConfig::default()
        };
        let result = TimeSvdPpTrainer::new(config).train(&patterned_dataset());
        assert!(matches!(result, Err(ModelError::Diverged { .. })));
    }

    #[test]
    fn test_evaluate_rmse_is_finite_and_small_on_train() {
        let dataset = patterned_dataset();
        let model = TimeSvdPpTrainer::new(quick_config()).train(&dataset).unwrap();

        let rmse = model.evaluate(&dataset);
        assert!(rmse.is_finite());
        // The item signal is strong; training must beat predicting the mean.
        let mean = dataset.global_mean();
        let baseline = (dataset
            .records()
            .iter()
            .map(|r| (r.rating - mean).powi(2))
            .sum::<f64>()
            / dataset.len() as f64)
            .sqrt();
        assert!(rmse < baseline);
    }
}
