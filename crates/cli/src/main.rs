use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::parser::load_ratings;
use model::{ModelConfig, TimeSvdPp, TimeSvdPpTrainer};
use pipeline::{DataPreparer, PrepConfig, leave_last_out};
use server::{RecommendRequest, Recommendation, RecommendationOrchestrator, Strategy};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// prod-recs - Product recommendation engine
#[derive(Parser)]
#[command(name = "prod-recs")]
#[command(about = "Product recommendations from user ratings", long_about = None)]
struct Cli {
    /// Path to the ratings CSV file
    #[arg(short, long, default_value = "data/ratings.csv")]
    data: PathBuf,

    /// Print results as JSON instead of formatted text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User-based collaborative filtering recommendations
    UserRec {
        /// User ID to get recommendations for
        #[arg(long)]
        user_id: String,

        /// Number of top similar users to consider
        #[arg(long, default_value = "5")]
        k: usize,

        /// Number of top products to return
        #[arg(long, default_value = "5")]
        n: usize,

        /// Strategy: user_based or user_based_with_time
        #[arg(long, default_value = "user_based")]
        rec_type: String,

        /// Decay half-life in days (user_based_with_time only)
        #[arg(long, default_value = "365")]
        half_life_days: f64,
    },

    /// Best-rated products over a recent window
    TopProducts {
        /// Number of past days to consider
        #[arg(long, default_value = "365")]
        days: i64,

        /// Minimum number of ratings a product must have
        #[arg(long, default_value = "10")]
        min_ratings: u32,

        /// Number of top products to return
        #[arg(long, default_value = "5")]
        n: usize,
    },

    /// Train the latent-factor model and save it
    Train {
        /// Where to write the trained model
        #[arg(long, default_value = "models/timesvdpp.json")]
        out_path: PathBuf,

        /// Latent dimensionality
        #[arg(long, default_value = "10")]
        factors: usize,

        /// Epoch cap
        #[arg(long, default_value = "50")]
        epochs: usize,

        /// SGD learning rate
        #[arg(long, default_value = "0.01")]
        learning_rate: f64,

        /// L2 regularization strength
        #[arg(long, default_value = "0.05")]
        regularization: f64,

        /// Early-stop threshold on epoch-over-epoch RMSE decrease
        #[arg(long, default_value = "0.0001")]
        convergence_threshold: f64,

        /// Random seed for initialization and shuffling
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Model-based recommendations from a trained model
    ModelRec {
        /// Path to the trained model
        #[arg(long, default_value = "models/timesvdpp.json")]
        model_path: PathBuf,

        /// User ID to get recommendations for
        #[arg(long)]
        user_id: String,

        /// Prediction timestamp (unix seconds); defaults to the dataset's
        /// most recent rating
        #[arg(long)]
        time: Option<i64>,

        /// Keep products the user has already rated
        #[arg(long)]
        include_rated: bool,

        /// Number of top products to return
        #[arg(long, default_value = "5")]
        n: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Load and prepare the dataset (every command needs it)
    let start = Instant::now();
    let records = load_ratings(&cli.data)
        .with_context(|| format!("Failed to load ratings from {}", cli.data.display()))?;
    let dataset = DataPreparer::new(PrepConfig::default())
        .prepare(records)
        .context("Failed to prepare dataset")?;
    let (users, products, ratings) = dataset.counts();
    eprintln!(
        "{} Prepared {} ratings ({} users, {} products) in {:?}",
        "✓".green(),
        ratings,
        users,
        products,
        start.elapsed()
    );

    let dataset = Arc::new(dataset);

    match cli.command {
        Commands::UserRec {
            user_id,
            k,
            n,
            rec_type,
            half_life_days,
        } => handle_user_rec(dataset, cli.json, user_id, k, n, &rec_type, half_life_days).await?,
        Commands::TopProducts { days, min_ratings, n } => {
            handle_top_products(dataset, cli.json, days, min_ratings, n).await?
        }
        Commands::Train {
            out_path,
            factors,
            epochs,
            learning_rate,
            regularization,
            convergence_threshold,
            seed,
        } => handle_train(
            dataset,
            out_path,
            ModelConfig {
                factors,
                epochs,
                learning_rate,
                regularization,
                convergence_threshold,
                seed,
                ..ModelConfig::default()
            },
        )?,
        Commands::ModelRec {
            model_path,
            user_id,
            time,
            include_rated,
            n,
        } => handle_model_rec(dataset, cli.json, model_path, user_id, time, include_rated, n).await?,
    }

    Ok(())
}

/// Handle the 'user-rec' command
async fn handle_user_rec(
    dataset: Arc<data_loader::RatingDataset>,
    json: bool,
    user_id: String,
    k: usize,
    n: usize,
    rec_type: &str,
    half_life_days: f64,
) -> Result<()> {
    let strategy: Strategy = rec_type.parse()?;
    anyhow::ensure!(
        matches!(strategy, Strategy::UserBased | Strategy::UserBasedWithTime),
        "user-rec accepts user_based or user_based_with_time, got {}",
        strategy.as_str()
    );

    let orchestrator = RecommendationOrchestrator::new(dataset);
    let mut request = RecommendRequest::for_user(strategy, user_id);
    request.k = k;
    request.n = n;
    request.half_life_days = half_life_days;

    let recommendations = orchestrator.recommend(request).await?;
    print_recommendations(&recommendations, json)
}

/// Handle the 'top-products' command
async fn handle_top_products(
    dataset: Arc<data_loader::RatingDataset>,
    json: bool,
    days: i64,
    min_ratings: u32,
    n: usize,
) -> Result<()> {
    let orchestrator = RecommendationOrchestrator::new(dataset);
    let mut request = RecommendRequest::new(Strategy::TopNProducts);
    request.window_days = days;
    request.min_ratings = min_ratings;
    request.n = n;

    let recommendations = orchestrator.recommend(request).await?;
    print_recommendations(&recommendations, json)
}

/// Handle the 'train' command
fn handle_train(
    dataset: Arc<data_loader::RatingDataset>,
    out_path: PathBuf,
    config: ModelConfig,
) -> Result<()> {
    let split = leave_last_out(&dataset);
    println!(
        "Training on {} records, holding out {}",
        split.train.len().to_string().cyan(),
        split.test.len().to_string().cyan()
    );

    let start = Instant::now();
    let model = TimeSvdPpTrainer::new(config)
        .train_with_holdout(&split.train, Some(&split.test))
        .context("Training failed")?;
    println!(
        "{} Trained {} epochs in {:?} (test RMSE {:.4})",
        "✓".green(),
        model.epochs_trained(),
        start.elapsed(),
        model.evaluate(&split.test)
    );

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(&out_path)
        .with_context(|| format!("Failed to create {}", out_path.display()))?;
    model.to_writer(BufWriter::new(file))?;
    println!("{} Model saved to {}", "✓".green(), out_path.display());

    Ok(())
}

/// Handle the 'model-rec' command
async fn handle_model_rec(
    dataset: Arc<data_loader::RatingDataset>,
    json: bool,
    model_path: PathBuf,
    user_id: String,
    time: Option<i64>,
    include_rated: bool,
    n: usize,
) -> Result<()> {
    let file = File::open(&model_path)
        .with_context(|| format!("Failed to open model {}", model_path.display()))?;
    let model = TimeSvdPp::from_reader(BufReader::new(file))?;

    let orchestrator = RecommendationOrchestrator::new(dataset).with_model(Arc::new(model));
    let mut request = RecommendRequest::for_user(Strategy::ModelBased, user_id);
    request.timestamp = time;
    request.exclude_rated = !include_rated;
    request.n = n;

    let recommendations = orchestrator.recommend(request).await?;
    print_recommendations(&recommendations, json)
}

/// Helper to print a ranked product list
fn print_recommendations(recommendations: &[Recommendation], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(recommendations)?);
        return Ok(());
    }

    println!("{}", "Recommended products:".bold().blue());
    if recommendations.is_empty() {
        println!("  (none)");
    }
    for (rank, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} - score {:.2}",
            (rank + 1).to_string().green(),
            rec.product_id,
            rec.score
        );
    }
    Ok(())
}
