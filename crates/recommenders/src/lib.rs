//! # Recommenders Crate
//!
//! This crate implements the neighborhood and baseline recommendation
//! strategies over a prepared train set.
//!
//! ## Components
//!
//! ### SimilarityEngine (user-based CF)
//! Nearest-neighbor prediction from mean-centered rating vectors:
//! - "Users who rate like you rated this highly"
//! - Optional exponential time decay of old ratings
//! - Per-query similarity cache, top-K neighbor selection
//!
//! ### PopularityRanker (baseline)
//! Best-rated products over a recent window:
//! - Window anchored on the dataset's own max timestamp
//! - Minimum-rating-count quality filter
//!
//! ## Example Usage
//!
//! ```ignore
//! use recommenders::{PopularityRanker, SimilarityEngine, TimeDecay};
//! use std::sync::Arc;
//!
//! let engine = SimilarityEngine::new(Arc::new(train))
//!     .with_neighbor_count(5)
//!     .with_decay(TimeDecay::with_half_life_days(365.0));
//!
//! let ranked = engine.top_n("671", 5);
//! let popular = PopularityRanker::new().top_n(&dataset, 5);
//! ```
//!
//! Both strategies are pure functions of the dataset they were built over:
//! no wall-clock reads, no randomness, no interior mutation.

// Public modules
pub mod popularity;
pub mod similarity;
pub mod user_based;

// Re-export commonly used types
pub use data_loader::Prediction;
pub use popularity::{PopularityRanker, ProductStats};
pub use similarity::cosine_similarity;
pub use user_based::{SimilarityCache, SimilarityEngine, TimeDecay};
