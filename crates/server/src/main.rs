//! Simple test harness for the recommendation orchestrator.
//!
//! Loads the ratings file, prepares and splits it, trains a small model,
//! and runs every strategy for a sample user.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use data_loader::parser::load_ratings;
use model::{ModelConfig, TimeSvdPpTrainer};
use pipeline::{DataPreparer, leave_last_out};
use server::{RecommendRequest, RecommendationOrchestrator, Strategy};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info,server=debug,recommenders=debug,pipeline=debug")
        .init();

    info!("Starting recommendation engine test harness");

    let path = Path::new("data/ratings.csv");
    info!("Loading ratings from {}", path.display());
    let records = load_ratings(path).context("Failed to load ratings file")?;

    let dataset = DataPreparer::default()
        .prepare(records)
        .context("Failed to prepare dataset")?;
    let (users, products, ratings) = dataset.counts();
    info!(
        "Prepared {} ratings ({} users, {} products)",
        ratings, users, products
    );

    let split = leave_last_out(&dataset);
    info!(
        "Split into {} train / {} test records",
        split.train.len(),
        split.test.len()
    );

    info!("Training latent-factor model...");
    let trainer = TimeSvdPpTrainer::new(ModelConfig {
        epochs: 20,
        ..ModelConfig::default()
    });
    let trained = trainer.train_with_holdout(&split.train, Some(&split.test))?;
    info!(
        "Model trained: {} epochs, test RMSE {:.4}",
        trained.epochs_trained(),
        trained.evaluate(&split.test)
    );

    let orchestrator =
        RecommendationOrchestrator::new(Arc::new(dataset)).with_model(Arc::new(trained));

    // Pick some user with ratings as the demo target.
    let user_id = orchestrator
        .dataset()
        .users()
        .min()
        .cloned()
        .ok_or_else(|| anyhow!("Dataset has no users"))?;

    for strategy in [
        Strategy::UserBased,
        Strategy::UserBasedWithTime,
        Strategy::ModelBased,
        Strategy::TopNProducts,
    ] {
        let request = RecommendRequest::for_user(strategy, user_id.clone());
        let recommendations = orchestrator.recommend(request).await?;

        info!(
            "{} for user {}: {} results",
            strategy.as_str(),
            user_id,
            recommendations.len()
        );
        for (rank, rec) in recommendations.iter().enumerate() {
            info!("  {}. {} (score {:.2})", rank + 1, rec.product_id, rec.score);
        }
    }

    Ok(())
}
