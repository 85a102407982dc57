//! # Model Crate
//!
//! Temporal latent-factor recommendation model (TimeSVD++ style).
//!
//! ## Main Components
//!
//! - **preprocess**: dense index mapping + time normalization of a train set
//! - **timesvdpp**: the trainer, the trained model, and its persistence
//! - **error**: training/persistence error types
//!
//! ## Example Usage
//!
//! ```ignore
//! use model::{ModelConfig, TimeSvdPpTrainer};
//!
//! let trainer = TimeSvdPpTrainer::new(ModelConfig::default());
//! let model = trainer.train_with_holdout(&split.train, Some(&split.test))?;
//!
//! let score = model.predict("671", "126", 1_476_640_644);
//! let top = model.recommend("671", 1_476_640_644, true, 5);
//! ```
//!
//! A model only exists in trained form: `TimeSvdPpTrainer::train` is the
//! sole constructor of `TimeSvdPp`, and a trained model is immutable, so
//! sharing it across readers is safe. Retraining produces a fresh value to
//! be published in place of the old one.

pub mod error;
pub mod preprocess;
pub mod timesvdpp;

// Re-export commonly used types
pub use error::{ModelError, Result};
pub use preprocess::{Interaction, ModelInput, preprocess};
pub use timesvdpp::{ModelConfig, TimeSvdPp, TimeSvdPpTrainer};
