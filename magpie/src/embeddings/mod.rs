pub mod api;
pub mod provider;

pub use provider::{centroid, EmbeddingProvider};
