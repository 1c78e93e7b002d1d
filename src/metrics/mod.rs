//! Summary statistics over cell embeddings and per-cell measurements.
//!
//! - **Similarity** (`similarity`): pairwise Euclidean distances and the average pairwise
//!   similarity of a set of embeddings
//! - **Bootstrap** (`bootstrap`): percentile bootstrap confidence intervals for the mean

pub mod bootstrap;
pub mod similarity;
pub mod utils;

pub use bootstrap::{BootstrapConfig, BootstrapResult, bootstrap_confidence_interval};
pub use similarity::{average_pairwise_euclidean_similarity, pairwise_euclidean_distances};
