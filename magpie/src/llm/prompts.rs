//! Prompt templates for LLM-powered features.
//!
//! Templates use `format!()` interpolation so a missing variable is a
//! compile-time error.

/// How much of a document the tagger sees. Tags describe the opening of
/// a document well enough, and this keeps prompts cheap.
pub const TAG_CONTENT_WINDOW: usize = 1000;

/// Generate a prompt asking for exactly three topical tags for a document.
///
/// Only the first [`TAG_CONTENT_WINDOW`] characters of content are
/// included, cut on a character boundary.
pub fn tagging_prompt(title: &str, content: &str) -> String {
    let window: String = content.chars().take(TAG_CONTENT_WINDOW).collect();

    format!(
        r#"Generate exactly 3 short topical tags for the following document.
Tags should be lowercase, one to three words each, and describe the document's subject matter.

Title: {title}

Content:
{window}

Respond with exactly 3 tags separated by commas, nothing else. Example:
project planning, quarterly goals, engineering"#
    )
}

/// System prompt for grounded question answering.
pub fn answer_system_prompt() -> &'static str {
    "You are a personal knowledge assistant. Answer the user's question using only \
the provided source excerpts. If the sources do not contain the answer, say so \
plainly instead of guessing. Keep answers concise and cite nothing the sources \
do not support."
}

/// Build the user prompt for answering a question over retrieved excerpts.
/// Sources are numbered in retrieval order.
pub fn answer_prompt(question: &str, sources: &[(String, String)]) -> String {
    let mut rendered = String::new();
    for (i, (title, excerpt)) in sources.iter().enumerate() {
        rendered.push_str(&format!("[{}] {}\n{}\n\n", i + 1, title, excerpt));
    }

    format!(
        r#"Source excerpts:

{rendered}Question: {question}

Answer the question using the source excerpts above."#
    )
}
