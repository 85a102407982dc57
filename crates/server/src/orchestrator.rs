//! # Recommendation Orchestrator
//!
//! This module gives the four strategies one invocation contract:
//! 1. Parse/receive a strategy and its parameters
//! 2. Hand the prepared dataset (or trained model) to the strategy
//! 3. Optionally drop products the user has already rated
//! 4. Return the top-N (product, score) list
//!
//! The core strategies are synchronous and CPU-bound; the orchestrator
//! exposes an async facade and pushes the work onto the blocking pool, the
//! way a request handler would consume it.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use data_loader::{ProductId, RatingDataset, UserId, UserProfile};
use model::TimeSvdPp;
use recommenders::{PopularityRanker, SimilarityEngine, TimeDecay};

/// The recognized recommendation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    UserBased,
    UserBasedWithTime,
    ModelBased,
    TopNProducts,
}

#[derive(Error, Debug)]
#[error("Unknown strategy '{0}'; expected one of user_based, user_based_with_time, model_based, top_n_products")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_based" => Ok(Self::UserBased),
            "user_based_with_time" => Ok(Self::UserBasedWithTime),
            "model_based" => Ok(Self::ModelBased),
            "top_n_products" => Ok(Self::TopNProducts),
            other => Err(ParseStrategyError(other.to_string())),
        }
    }
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserBased => "user_based",
            Self::UserBasedWithTime => "user_based_with_time",
            Self::ModelBased => "model_based",
            Self::TopNProducts => "top_n_products",
        }
    }
}

/// Parameters of one recommendation request.
#[derive(Debug, Clone)]
pub struct RecommendRequest {
    pub strategy: Strategy,
    /// Target user; ignored by the popularity strategy.
    pub user_id: Option<UserId>,
    /// Result size N.
    pub n: usize,
    /// Neighbor count K for the user-based strategies.
    pub k: usize,
    /// Decay half-life for `user_based_with_time`.
    pub half_life_days: f64,
    /// Aggregation window for `top_n_products`.
    pub window_days: i64,
    /// Minimum rating count for `top_n_products`.
    pub min_ratings: u32,
    /// Prediction time for `model_based`; defaults to the dataset's most
    /// recent timestamp.
    pub timestamp: Option<i64>,
    /// Drop products the user has already rated.
    pub exclude_rated: bool,
}

impl RecommendRequest {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            user_id: None,
            n: 5,
            k: 5,
            half_life_days: 365.0,
            window_days: 365,
            min_ratings: 10,
            timestamp: None,
            exclude_rated: true,
        }
    }

    pub fn for_user(strategy: Strategy, user_id: impl Into<UserId>) -> Self {
        let mut request = Self::new(strategy);
        request.user_id = Some(user_id.into());
        request
    }
}

/// Final recommendation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub product_id: ProductId,
    pub score: f64,
}

/// Coordinates dataset, strategies, and the optional trained model.
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    dataset: Arc<RatingDataset>,
    model: Option<Arc<TimeSvdPp>>,
}

impl RecommendationOrchestrator {
    /// Create an orchestrator over a prepared dataset.
    pub fn new(dataset: Arc<RatingDataset>) -> Self {
        Self {
            dataset,
            model: None,
        }
    }

    /// Attach a trained latent-factor model for the `model_based` strategy.
    pub fn with_model(mut self, model: Arc<TimeSvdPp>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn dataset(&self) -> &Arc<RatingDataset> {
        &self.dataset
    }

    /// Main entry point: run a request to completion on the blocking pool.
    pub async fn recommend(&self, request: RecommendRequest) -> Result<Vec<Recommendation>> {
        let start_time = Instant::now();
        let orchestrator = self.clone();
        let strategy = request.strategy;

        let recommendations =
            tokio::task::spawn_blocking(move || orchestrator.recommend_blocking(&request))
                .await
                .context("Recommendation task panicked")??;

        info!(
            "Strategy {} produced {} recommendations in {:.2?}",
            strategy.as_str(),
            recommendations.len(),
            start_time.elapsed()
        );
        Ok(recommendations)
    }

    /// Synchronous strategy dispatch; also usable directly from
    /// non-async callers.
    pub fn recommend_blocking(&self, request: &RecommendRequest) -> Result<Vec<Recommendation>> {
        let recommendations = match request.strategy {
            Strategy::UserBased => {
                let user_id = self.required_user(request)?;
                let engine = SimilarityEngine::new(Arc::clone(&self.dataset))
                    .with_neighbor_count(request.k);
                self.rank_for_user(engine.top_n(user_id, request.n), request)
            }
            Strategy::UserBasedWithTime => {
                let user_id = self.required_user(request)?;
                let engine = SimilarityEngine::new(Arc::clone(&self.dataset))
                    .with_neighbor_count(request.k)
                    .with_decay(TimeDecay::with_half_life_days(request.half_life_days));
                self.rank_for_user(engine.top_n(user_id, request.n), request)
            }
            Strategy::ModelBased => {
                let user_id = self.required_user(request)?;
                let model = self
                    .model
                    .as_ref()
                    .ok_or_else(|| anyhow!("No trained model loaded"))?;
                let timestamp = request
                    .timestamp
                    .or_else(|| self.dataset.max_timestamp())
                    .unwrap_or(0);

                // The already-rated filter below works from the full
                // dataset profile, so the model ranks everything.
                let ranked = model.recommend(user_id, timestamp, false, usize::MAX);
                self.rank_for_user(ranked, request)
            }
            Strategy::TopNProducts => {
                let ranker = PopularityRanker::new()
                    .with_window_days(request.window_days)
                    .with_min_ratings(request.min_ratings);
                ranker
                    .top_n(&self.dataset, request.n)
                    .into_iter()
                    .map(|stats| Recommendation {
                        product_id: stats.product_id,
                        score: stats.avg_rating,
                    })
                    .collect()
            }
        };

        Ok(recommendations)
    }

    /// Validate that a per-user strategy got a known user.
    fn required_user<'a>(&self, request: &'a RecommendRequest) -> Result<&'a str> {
        let user_id = request
            .user_id
            .as_deref()
            .ok_or_else(|| anyhow!("Strategy {} requires a user_id", request.strategy.as_str()))?;
        if !self.dataset.contains_user(user_id) {
            return Err(anyhow!("User {} not found", user_id));
        }
        Ok(user_id)
    }

    /// Apply the already-rated filter and final truncation to a ranked list.
    fn rank_for_user(
        &self,
        ranked: Vec<data_loader::Prediction>,
        request: &RecommendRequest,
    ) -> Vec<Recommendation> {
        let profile = request
            .user_id
            .as_deref()
            .filter(|_| request.exclude_rated)
            .and_then(|user_id| UserProfile::build(&self.dataset, user_id));

        ranked
            .into_iter()
            .filter(|prediction| match &profile {
                Some(profile) => !profile.has_rated(&prediction.product_id),
                None => true,
            })
            .take(request.n)
            .map(|prediction| Recommendation {
                product_id: prediction.product_id,
                score: prediction.predicted_rating,
            })
            .collect()
    }
}
