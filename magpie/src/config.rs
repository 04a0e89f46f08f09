use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub processing: ProcessingConfig,
    pub retrieval: RetrievalConfig,
    pub sources: SourcesConfig,
    pub llm: Option<LlmConfig>,
    pub notify: Option<NotifyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Target chunk size in estimated tokens.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in estimated tokens.
    pub chunk_overlap: usize,
    /// Seconds between background sweeps for documents whose embed pass
    /// never completed. 0 disables the sweeper.
    pub embed_sweep_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum cosine similarity for a section to count as a match.
    pub similarity_threshold: f32,
    /// Maximum documents returned by similarity search.
    pub similarity_limit: u32,
    /// Maximum documents matched by the document-text pattern predicate.
    pub pattern_document_limit: u32,
    /// Maximum sections matched by the section pattern predicate.
    pub pattern_section_limit: u32,
    /// Maximum sources handed to the answer synthesizer.
    pub answer_source_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Page size cap when listing Google Drive documents per import.
    pub google_page_size: u32,
    pub google_base_url: Option<String>,
    pub google_token_url: Option<String>,
    pub notion_base_url: Option<String>,
    pub notion_version: String,
    pub gmail_base_url: Option<String>,
    pub timeout_secs: u64,
}

/// LLM configuration for chat/completion models
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Webhook receiving `{email, results}` after each import batch.
    pub webhook_url: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("MAGPIE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("MAGPIE_PORT", 3000),
                api_keys: env::var("MAGPIE_API_KEYS")
                    .map(|keys| keys.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:magpie.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "text-embedding-3-small".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 1536),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 2),
            },
            processing: ProcessingConfig {
                chunk_size: parse_env_or("CHUNK_SIZE", 200),
                chunk_overlap: parse_env_or("CHUNK_OVERLAP", 50),
                embed_sweep_interval_secs: parse_env_or("EMBED_SWEEP_INTERVAL", 60),
            },
            retrieval: RetrievalConfig {
                similarity_threshold: parse_env_or("SIMILARITY_THRESHOLD", 0.3),
                similarity_limit: parse_env_or("SIMILARITY_LIMIT", 5),
                pattern_document_limit: parse_env_or("PATTERN_DOCUMENT_LIMIT", 5),
                pattern_section_limit: parse_env_or("PATTERN_SECTION_LIMIT", 10),
                answer_source_limit: parse_env_or("ANSWER_SOURCE_LIMIT", 3),
            },
            sources: SourcesConfig {
                google_page_size: parse_env_or("GOOGLE_PAGE_SIZE", 5),
                google_base_url: env::var("GOOGLE_BASE_URL").ok(),
                google_token_url: env::var("GOOGLE_TOKEN_URL").ok(),
                notion_base_url: env::var("NOTION_BASE_URL").ok(),
                notion_version: env::var("NOTION_VERSION")
                    .unwrap_or_else(|_| "2022-06-28".to_string()),
                gmail_base_url: env::var("GMAIL_BASE_URL").ok(),
                timeout_secs: parse_env_or("SOURCE_TIMEOUT", 30),
            },
            llm: env::var("LLM_MODEL").ok().map(|model| LlmConfig {
                model,
                api_key: env::var("LLM_API_KEY").ok(),
                base_url: env::var("LLM_BASE_URL").ok(),
                timeout_secs: parse_env_or("LLM_TIMEOUT", 60),
                max_retries: parse_env_or("LLM_MAX_RETRIES", 3),
            }),
            notify: env::var("NOTIFY_WEBHOOK_URL").ok().map(|webhook_url| NotifyConfig {
                webhook_url,
                timeout_secs: parse_env_or("NOTIFY_TIMEOUT", 10),
            }),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known LLM providers that use OpenAI-compatible APIs
pub const KNOWN_LLM_PROVIDERS: &[&str] = &["openai", "openrouter", "ollama", "lmstudio"];

/// Parse an LLM model name into (provider, model) tuple.
pub fn parse_llm_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_LLM_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Bare model names default to openai
    ("openai", model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_retrieval_defaults() {
        std::env::remove_var("SIMILARITY_THRESHOLD");
        std::env::remove_var("SIMILARITY_LIMIT");

        let config = Config::default();
        assert_eq!(config.retrieval.similarity_threshold, 0.3);
        assert_eq!(config.retrieval.similarity_limit, 5);
        assert_eq!(config.retrieval.pattern_document_limit, 5);
        assert_eq!(config.retrieval.pattern_section_limit, 10);
        assert_eq!(config.retrieval.answer_source_limit, 3);
    }

    #[test]
    #[serial]
    fn test_processing_defaults() {
        std::env::remove_var("CHUNK_SIZE");
        std::env::remove_var("CHUNK_OVERLAP");

        let config = Config::default();
        assert_eq!(config.processing.chunk_size, 200);
        assert_eq!(config.processing.chunk_overlap, 50);
    }

    #[test]
    #[serial]
    fn test_sweep_interval_zero_disables_sweeper() {
        std::env::set_var("EMBED_SWEEP_INTERVAL", "0");
        let config = Config::default();
        std::env::remove_var("EMBED_SWEEP_INTERVAL");

        assert_eq!(config.processing.embed_sweep_interval_secs, 0);
    }

    #[test]
    #[serial]
    fn test_llm_config_optional() {
        std::env::remove_var("LLM_MODEL");

        let config = Config::default();
        assert!(config.llm.is_none());

        std::env::set_var("LLM_MODEL", "openai/gpt-4o-mini");
        let config = Config::default();
        let llm = config.llm.unwrap();
        assert_eq!(llm.model, "openai/gpt-4o-mini");
        assert_eq!(llm.max_retries, 3);
        std::env::remove_var("LLM_MODEL");
    }

    #[test]
    fn test_parse_llm_provider_model() {
        assert_eq!(
            parse_llm_provider_model("openrouter/meta/llama-3"),
            ("openrouter", "meta/llama-3")
        );
        assert_eq!(parse_llm_provider_model("ollama/llama3"), ("ollama", "llama3"));
        assert_eq!(parse_llm_provider_model("gpt-4o-mini"), ("openai", "gpt-4o-mini"));
    }

    #[test]
    #[serial]
    fn test_parse_env_or_invalid_falls_back() {
        std::env::set_var("__TEST_MAGPIE_PORT", "not-a-port");
        let result: u16 = parse_env_or("__TEST_MAGPIE_PORT", 3000);
        assert_eq!(result, 3000);
        std::env::remove_var("__TEST_MAGPIE_PORT");
    }

    #[test]
    #[serial]
    fn test_notify_config_optional() {
        std::env::remove_var("NOTIFY_WEBHOOK_URL");
        let config = Config::default();
        assert!(config.notify.is_none());
    }
}
