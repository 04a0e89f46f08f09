use crate::llm::{prompts, CompletionOptions, LlmProvider};

/// Maximum tags kept per document, matching what the prompt asks for.
const TAG_LIMIT: usize = 3;

/// LLM-backed topical tagging. Tagging is decoration, not a gate: any
/// failure, including a missing LLM configuration, yields no tags.
pub struct TaggingService {
    llm: LlmProvider,
}

impl TaggingService {
    pub fn new(llm: LlmProvider) -> Self {
        Self { llm }
    }

    pub async fn generate_tags(&self, title: &str, content: &str) -> Vec<String> {
        if !self.llm.is_available() {
            return Vec::new();
        }

        let prompt = prompts::tagging_prompt(title, content);
        let options = CompletionOptions {
            temperature: Some(0.3),
            max_tokens: Some(50),
        };

        match self.llm.complete(&prompt, Some(&options)).await {
            Ok(response) => parse_tags(&response),
            Err(error) => {
                tracing::warn!(error = %error, "Tag generation failed, skipping tags");
                Vec::new()
            }
        }
    }
}

/// Split a comma-separated tag response, trimming and dropping empties.
fn parse_tags(response: &str) -> Vec<String> {
    response
        .split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .take(TAG_LIMIT)
        .collect()
}
