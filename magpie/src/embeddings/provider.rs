use crate::config::EmbeddingsConfig;
use crate::error::{MagpieError, Result};

use super::api::{default_base_url, ApiConfig, EmbeddingApiClient};

/// Thin wrapper over the remote embedding API, pinned to the configured
/// model and dimension count.
pub struct EmbeddingProvider {
    client: EmbeddingApiClient,
    dimensions: usize,
}

impl EmbeddingProvider {
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let (provider, model) = crate::config::parse_llm_provider_model(&config.model);

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(provider).to_string());

        let client = EmbeddingApiClient::new(ApiConfig {
            base_url,
            api_key: config.api_key.clone(),
            model: model.to_string(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })?;

        Ok(Self {
            client,
            dimensions: config.dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self.client.embed(&refs).await?;

        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(MagpieError::Embedding(format!(
                    "Model returned {} dimensions, expected {}",
                    vector.len(),
                    self.dimensions
                )));
            }
        }

        Ok(vectors)
    }

    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let vectors = self.embed(&[query.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| MagpieError::Embedding("No embedding generated".to_string()))
    }
}

/// Component-wise arithmetic mean of the given vectors. Errors on an
/// empty input or mismatched dimensions.
pub fn centroid(vectors: &[Vec<f32>]) -> Result<Vec<f32>> {
    let first = vectors
        .first()
        .ok_or_else(|| MagpieError::Embedding("Cannot average zero vectors".to_string()))?;

    let dims = first.len();
    let mut sums = vec![0.0_f32; dims];

    for vector in vectors {
        if vector.len() != dims {
            return Err(MagpieError::Embedding(format!(
                "Mismatched dimensions: {} vs {}",
                vector.len(),
                dims
            )));
        }
        for (sum, value) in sums.iter_mut().zip(vector.iter()) {
            *sum += value;
        }
    }

    let count = vectors.len() as f32;
    for sum in &mut sums {
        *sum /= count;
    }

    Ok(sums)
}
