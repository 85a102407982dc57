//! # Data Loader Crate
//!
//! Loading and indexing of user-product rating data.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (RatingRecord, RatingDataset, UserProfile)
//! - **parser**: Parse the ratings CSV into typed records
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{RatingDataset, parser};
//! use std::path::Path;
//!
//! let records = parser::load_ratings(Path::new("data/ratings.csv"))?;
//! let dataset = RatingDataset::from_records(records);
//!
//! let (users, products, ratings) = dataset.counts();
//! println!("{} users, {} products, {} ratings", users, products, ratings);
//! ```
//!
//! The loader is the only place in the system that touches the filesystem for
//! input data; everything downstream consumes `Vec<RatingRecord>` or a
//! `RatingDataset`.

// Public modules
pub mod error;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result};
pub use types::{Prediction, ProductId, RatingDataset, RatingRecord, UserId, UserProfile};
