//! Server crate: the recommendation orchestrator and its request types.

pub mod orchestrator;

pub use orchestrator::{
    ParseStrategyError, Recommendation, RecommendationOrchestrator, RecommendRequest, Strategy,
};
